use crate::app_dirs::AppDirs;
use crate::challenge::MatchSummary;
use chrono::{DateTime, Local};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

/// How a match ended, as recorded in the history log
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum_macros::Display)]
pub enum MatchOutcome {
    #[strum(serialize = "victory")]
    Victory,
    #[strum(serialize = "eliminated")]
    Eliminated,
}

/// Append-only CSV log of finished matches, one row per match.
/// Writes are best-effort; a failed append never disturbs the game.
#[derive(Debug, Clone)]
pub struct HistoryLog {
    path: PathBuf,
}

impl HistoryLog {
    pub fn new() -> Option<Self> {
        AppDirs::history_path().map(|path| Self { path })
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn append(
        &self,
        at: DateTime<Local>,
        outcome: MatchOutcome,
        summary: &MatchSummary,
    ) -> csv::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(csv::Error::from)?;
        }

        // If the log doesn't exist yet, we need to emit a header
        let needs_header = !self.path.exists();

        let file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)
            .map_err(csv::Error::from)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        if needs_header {
            writer.write_record([
                "date",
                "outcome",
                "elapsed_secs",
                "errors",
                "draws",
                "final_odds",
            ])?;
        }

        writer.write_record([
            at.format("%Y-%m-%d %H:%M:%S").to_string(),
            outcome.to_string(),
            format!("{:.2}", summary.elapsed_ms as f64 / 1000.0),
            summary.total_errors.to_string(),
            summary.total_draws.to_string(),
            summary.final_odds.to_string(),
        ])?;
        writer.flush()?;
        Ok(())
    }
}
