use directories::ProjectDirs;
use std::path::PathBuf;

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    fn state_dir() -> Option<PathBuf> {
        if let Ok(home) = std::env::var("HOME") {
            Some(
                PathBuf::from(home)
                    .join(".local")
                    .join("state")
                    .join("tecla"),
            )
        } else {
            ProjectDirs::from("", "", "tecla")
                .map(|proj_dirs| proj_dirs.data_local_dir().to_path_buf())
        }
    }

    /// Audio position and volume store
    pub fn store_path() -> Option<PathBuf> {
        Self::state_dir().map(|dir| dir.join("audio_state.json"))
    }

    /// Finished-match CSV log
    pub fn history_path() -> Option<PathBuf> {
        Self::state_dir().map(|dir| dir.join("matches.csv"))
    }

    pub fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "tecla")
            .map(|proj_dirs| proj_dirs.config_dir().join("config.json"))
    }
}
