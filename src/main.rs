pub mod ambient;
pub mod app_dirs;
pub mod challenge;
pub mod clock;
pub mod config;
pub mod history;
pub mod media;
pub mod roulette;
pub mod runtime;
pub mod store;
pub mod timer;
pub mod ui;
pub mod volume;

use crate::{
    ambient::AmbientAudio,
    challenge::{Challenge, Cue, Effect, MatchSummary, Phase, SHAKE_MS},
    clock::{Clock, SystemClock},
    config::{Config, ConfigStore, FileConfigStore},
    history::{HistoryLog, MatchOutcome},
    media::{CueOutcome, MediaPlayer, SilentPlayer},
    roulette::MAX_DENOMINATOR,
    runtime::{CrosstermEventSource, FixedTicker, GameEvent, Runner},
    store::{FileStore, KeyValueStore},
    volume::VolumePrefs,
};
use chrono::Local;
use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{DisableBracketedPaste, EnableBracketedPaste, KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    error::Error,
    io::{self, stdin},
    time::Duration,
};
use time_humanize::{Accuracy, HumanTime, Tense};

const TICK_RATE_MS: u64 = 100;
const DEFAULT_REFERENCE: &str = "the quick brown fox jumps over the lazy dog";
/// Pretend length of the looping ambient track
const AMBIENT_TRACK_SECS: f64 = 184.0;
/// How long the roulette outcome cue holds the screen
const CUE_MS: u64 = 2_500;
const VOLUME_STEP: f64 = 0.05;

/// terminal typing survival game
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Type the reference text perfectly. Three consecutive errors send you to the elimination roulette, and the odds get worse every time you walk away from it."
)]
pub struct Cli {
    /// reference text the match is typed against
    #[clap(short = 't', long)]
    text: Option<String>,

    /// starting survival odds denominator (1-5)
    #[clap(short = 'o', long)]
    odds: Option<u32>,

    /// skip the ambient track entirely
    #[clap(long)]
    no_ambient: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Menu,
    Match,
}

/// Roulette outcome cue currently holding the screen
#[derive(Debug, Clone, Copy)]
pub struct ActiveCue {
    pub cue: Cue,
    pub ends_at: u64,
}

pub struct App {
    pub screen: Screen,
    pub challenge: Option<Challenge>,
    pub typed: String,
    pub now_ms: u64,
    pub shake_until: u64,
    pub notice: Option<String>,
    pub last_summary: Option<(MatchOutcome, MatchSummary)>,
    pub cue: Option<ActiveCue>,
    pub ambient: AmbientAudio,
    pub ambient_player: SilentPlayer,
    pub hover_player: SilentPlayer,
    pub select_player: SilentPlayer,
    pub volumes: VolumePrefs,
    pub store: Box<dyn KeyValueStore>,
    pub history: Option<HistoryLog>,
    pub resume_note: Option<String>,
    pub reference_text: String,
    pub starting_odds: u32,
    pub ambient_enabled: bool,
}

impl App {
    pub fn new(
        cli: &Cli,
        config: Config,
        store: Box<dyn KeyValueStore>,
        history: Option<HistoryLog>,
        now_ms: u64,
    ) -> Self {
        let volumes = VolumePrefs::load(&*store);
        let mut ambient_player = SilentPlayer::new(Some(AMBIENT_TRACK_SECS));
        let mut hover_player = SilentPlayer::new(Some(1.0));
        let mut select_player = SilentPlayer::new(Some(1.0));
        volumes.apply(
            &mut ambient_player,
            &mut [
                (&mut hover_player) as &mut dyn MediaPlayer,
                &mut select_player,
            ],
        );

        let reference_text = cli
            .text
            .clone()
            .or_else(|| config.reference_text.clone())
            .filter(|text| !text.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_REFERENCE.to_string());
        let starting_odds = cli
            .odds
            .unwrap_or(config.starting_odds)
            .clamp(1, MAX_DENOMINATOR);
        let ambient_enabled = !cli.no_ambient && config.ambient_autoplay;

        let resume_note = ambient::load_snapshot(&*store).map(|snap| {
            let gap = Duration::from_millis(now_ms.saturating_sub(snap.captured_at_ms));
            let offset =
                ambient::resume_offset(Some(snap), now_ms, Some(AMBIENT_TRACK_SECS));
            format!(
                "resuming {:.0}s into the track, last heard {}",
                offset,
                HumanTime::from(gap).to_text_en(Accuracy::Rough, Tense::Past)
            )
        });

        let mut app = Self {
            screen: Screen::Menu,
            challenge: None,
            typed: String::new(),
            now_ms,
            shake_until: 0,
            notice: None,
            last_summary: None,
            cue: None,
            ambient: AmbientAudio::new(),
            ambient_player,
            hover_player,
            select_player,
            volumes,
            store,
            history,
            resume_note,
            reference_text,
            starting_odds,
            ambient_enabled,
        };
        if app.ambient_enabled {
            app.ambient
                .begin(&mut app.ambient_player, &*app.store, now_ms);
        }
        app
    }

    pub fn on_tick(&mut self, now_ms: u64) {
        self.now_ms = now_ms;
        self.ambient_player.advance_to(now_ms);
        self.hover_player.advance_to(now_ms);
        self.select_player.advance_to(now_ms);

        if self.screen == Screen::Menu && self.ambient_enabled {
            self.ambient
                .on_tick(&self.ambient_player, &*self.store, now_ms);
        }

        if let Some(active) = self.cue {
            if now_ms >= active.ends_at {
                self.cue = None;
                let effects = match &mut self.challenge {
                    Some(challenge) => challenge.cue_resolved(now_ms, CueOutcome::Completed),
                    None => Vec::new(),
                };
                self.apply_effects(effects);
            }
        }

        let effects = match &mut self.challenge {
            Some(challenge) => challenge.tick(now_ms),
            None => Vec::new(),
        };
        self.apply_effects(effects);
    }

    /// Returns true when the app should quit
    pub fn on_key(&mut self, key: KeyEvent) -> bool {
        // Any interaction satisfies a blocked ambient resume
        if self.ambient.awaiting_gesture() {
            self.ambient_player.unblock();
            self.ambient
                .on_gesture(&mut self.ambient_player, &*self.store, self.now_ms);
        }

        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return true;
        }

        match self.screen {
            Screen::Menu => match key.code {
                KeyCode::Esc => return true,
                KeyCode::Enter => {
                    self.play_select();
                    self.start_match();
                }
                KeyCode::Up => self.adjust_ambient(VOLUME_STEP),
                KeyCode::Down => self.adjust_ambient(-VOLUME_STEP),
                KeyCode::Right => self.adjust_feedback(VOLUME_STEP),
                KeyCode::Left => self.adjust_feedback(-VOLUME_STEP),
                _ => {}
            },
            Screen::Match => {
                let over = self
                    .challenge
                    .as_ref()
                    .map(|challenge| challenge.is_over())
                    .unwrap_or(true);
                match key.code {
                    KeyCode::Esc => return true,
                    KeyCode::Enter if over => {
                        self.play_select();
                        self.back_to_menu();
                    }
                    KeyCode::Backspace => self.backspace(),
                    KeyCode::Char(c) => self.push_char(c),
                    _ => {}
                }
            }
        }
        false
    }

    pub fn on_paste(&mut self) {
        let effects = match &mut self.challenge {
            Some(challenge) => challenge.on_paste(),
            None => Vec::new(),
        };
        self.apply_effects(effects);
    }

    pub fn start_match(&mut self) {
        if self.ambient_enabled {
            self.ambient
                .suspend(&mut self.ambient_player, &*self.store, self.now_ms);
        }
        self.typed.clear();
        self.notice = None;
        self.shake_until = 0;
        self.cue = None;
        let mut challenge = Challenge::new(&self.reference_text, self.starting_odds);
        let effects = challenge.start(self.now_ms);
        self.challenge = Some(challenge);
        self.screen = Screen::Match;
        self.apply_effects(effects);
    }

    pub fn back_to_menu(&mut self) {
        self.challenge = None;
        self.typed.clear();
        self.notice = None;
        self.cue = None;
        self.screen = Screen::Menu;
        if self.ambient_enabled {
            self.ambient
                .begin(&mut self.ambient_player, &*self.store, self.now_ms);
        }
    }

    fn push_char(&mut self, c: char) {
        let effects = match &mut self.challenge {
            Some(challenge) if challenge.phase() == Phase::Active => {
                self.typed.push(c);
                challenge.on_input(self.now_ms, &self.typed)
            }
            _ => Vec::new(),
        };
        self.apply_effects(effects);
    }

    fn backspace(&mut self) {
        let effects = match &mut self.challenge {
            Some(challenge) if challenge.phase() == Phase::Active && !self.typed.is_empty() => {
                self.typed.pop();
                challenge.on_input(self.now_ms, &self.typed)
            }
            _ => Vec::new(),
        };
        self.apply_effects(effects);
    }

    fn adjust_ambient(&mut self, delta: f64) {
        let value = (self.volumes.ambient() + delta).clamp(0.0, 1.0);
        self.volumes
            .set_ambient(value, &mut self.ambient_player, &*self.store);
        self.play_hover();
    }

    fn adjust_feedback(&mut self, delta: f64) {
        let value = (self.volumes.feedback() + delta).clamp(0.0, 1.0);
        self.volumes.set_feedback(
            value,
            &mut [
                (&mut self.hover_player) as &mut dyn MediaPlayer,
                &mut self.select_player,
            ],
            &*self.store,
        );
        self.play_hover();
    }

    fn play_hover(&mut self) {
        self.hover_player.seek_to(0.0);
        let _ = self.hover_player.play();
    }

    fn play_select(&mut self) {
        self.select_player.seek_to(0.0);
        let _ = self.select_player.play();
    }

    fn apply_effects(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Shake => self.shake_until = self.now_ms + SHAKE_MS,
                Effect::InputCleared => self.typed.clear(),
                Effect::PasteRejected => {
                    self.notice = Some("pasting is rejected, type it out key by key".to_string())
                }
                Effect::CueRequested(cue) => {
                    self.cue = Some(ActiveCue {
                        cue,
                        ends_at: self.now_ms + CUE_MS,
                    });
                }
                Effect::CueFallback(cue) => {
                    self.notice = Some(
                        match cue {
                            Cue::Survival => "the roulette spares you",
                            Cue::Elimination => "the roulette claims you",
                        }
                        .to_string(),
                    )
                }
                Effect::Survived { odds } => {
                    self.notice = Some(format!("survived, odds are now 1/{odds}"))
                }
                Effect::Victory(summary) => self.record(MatchOutcome::Victory, summary),
                Effect::Eliminated(summary) => self.record(MatchOutcome::Eliminated, summary),
                Effect::CountdownStep(_) | Effect::MatchStarted | Effect::Progress(_) => {}
            }
        }
    }

    fn record(&mut self, outcome: MatchOutcome, summary: MatchSummary) {
        self.last_summary = Some((outcome, summary));
        if let Some(log) = &self.history {
            let _ = log.append(Local::now(), outcome, &summary);
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let config = FileConfigStore::new().load();
    let store: Box<dyn KeyValueStore> = Box::new(FileStore::new());
    let clock = SystemClock;

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(&cli, config, store, HistoryLog::new(), clock.now_ms());
    let result = run_app(&mut terminal, &mut app, &clock);

    // Final best-effort snapshot so the track resumes where it left off
    if app.ambient_enabled {
        ambient::snapshot(&app.ambient_player, &*app.store, clock.now_ms());
    }

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        DisableBracketedPaste,
        LeaveAlternateScreen
    )?;
    terminal.show_cursor()?;

    result
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    clock: &dyn Clock,
) -> Result<(), Box<dyn Error>> {
    let runner = Runner::new(
        CrosstermEventSource::new(),
        FixedTicker::new(Duration::from_millis(TICK_RATE_MS)),
    );

    terminal.draw(|f| ui::draw(app, f))?;

    loop {
        match runner.step() {
            GameEvent::Tick => {
                app.on_tick(clock.now_ms());
                terminal.draw(|f| ui::draw(app, f))?;
            }
            GameEvent::Resize => {
                terminal.draw(|f| ui::draw(app, f))?;
            }
            GameEvent::Key(key) => {
                app.now_ms = clock.now_ms();
                if app.on_key(key) {
                    break;
                }
                terminal.draw(|f| ui::draw(app, f))?;
            }
            GameEvent::Paste(_) => {
                app.now_ms = clock.now_ms();
                app.on_paste();
                terminal.draw(|f| ui::draw(app, f))?;
            }
        }
    }

    Ok(())
}
