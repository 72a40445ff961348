use crate::media::CueOutcome;
use crate::roulette::{DrawOutcome, DrawSource, RandomDraws, Roulette};
use crate::timer::MatchTimer;
use unicode_normalization::UnicodeNormalization;

pub const COUNTDOWN_START: u8 = 3;
pub const COUNTDOWN_STEP_MS: u64 = 1_000;
/// Input stays frozen this long after an error
pub const FREEZE_MS: u64 = 1_000;
/// Gap between the timer pausing and the roulette draw firing
pub const PRE_DRAW_DELAY_MS: u64 = 1_000;
/// Duration of the error shake cue, owned by the front-end
pub const SHAKE_MS: u64 = 500;
/// Consecutive errors that trigger a roulette draw
pub const MAX_CONSECUTIVE_ERRORS: u32 = 3;

/// Where a match currently stands. Deadlines live in the variants, so the
/// machine suspends as data and a plain `tick` drives every transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Countdown { remaining: u8, next_step_at: u64 },
    Active,
    /// Input ignored after an error; thaws at `until`
    Frozen { until: u64 },
    /// Third strike: timer paused, draw fires at `at`
    DrawPending { at: u64 },
    /// Draw taken; waiting for its outcome cue to finish or fail
    Presenting { outcome: DrawOutcome },
    Victorious,
    Eliminated,
}

/// Roulette outcome cue the front-end should present
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cue {
    Survival,
    Elimination,
}

/// Final numbers of a finished match
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MatchSummary {
    pub elapsed_ms: u64,
    pub total_errors: u32,
    pub total_draws: u32,
    pub final_odds: u32,
}

/// Side effects the front-end must carry out. The machine never touches the
/// terminal or any player itself.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Effect {
    CountdownStep(u8),
    MatchStarted,
    Progress(u8),
    /// Transient visual shake after an error
    Shake,
    /// Bulk input rejected; a notification, not an error
    PasteRejected,
    InputCleared,
    /// Start the outcome media; report back via `cue_resolved`
    CueRequested(Cue),
    /// The cue could not play; present the outcome textually instead
    CueFallback(Cue),
    Survived { odds: u32 },
    Victory(MatchSummary),
    Eliminated(MatchSummary),
}

/// The typing challenge state machine.
///
/// Timestamp-fed: every entry point takes `now_ms` and the caller supplies
/// ticks, so the whole match can be driven headlessly. Input arrives as the
/// complete live buffer, validated against the normalized reference.
#[derive(Debug)]
pub struct Challenge {
    reference: String,
    reference_len: usize,
    phase: Phase,
    consecutive_errors: u32,
    total_errors: u32,
    progress_pct: u8,
    roulette: Roulette,
    timer: MatchTimer,
    draws: Box<dyn DrawSource>,
}

impl Challenge {
    pub fn new(reference: &str, starting_odds: u32) -> Self {
        Self::with_draw_source(reference, starting_odds, Box::new(RandomDraws))
    }

    pub fn with_draw_source(
        reference: &str,
        starting_odds: u32,
        draws: Box<dyn DrawSource>,
    ) -> Self {
        let reference = normalize(reference);
        let reference_len = reference.chars().count();
        Self {
            reference,
            reference_len,
            phase: Phase::Idle,
            consecutive_errors: 0,
            total_errors: 0,
            progress_pct: 0,
            roulette: Roulette::new(starting_odds),
            timer: MatchTimer::new(),
            draws,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The normalized text the player must reproduce
    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn progress_pct(&self) -> u8 {
        self.progress_pct
    }

    pub fn consecutive_errors(&self) -> u32 {
        self.consecutive_errors
    }

    pub fn total_errors(&self) -> u32 {
        self.total_errors
    }

    pub fn total_draws(&self) -> u32 {
        self.roulette.total_draws()
    }

    /// Current survival odds divisor (`1/N`)
    pub fn odds(&self) -> u32 {
        self.roulette.denominator()
    }

    pub fn elapsed_ms(&self, now_ms: u64) -> u64 {
        self.timer.elapsed_ms(now_ms)
    }

    pub fn is_over(&self) -> bool {
        matches!(self.phase, Phase::Victorious | Phase::Eliminated)
    }

    /// Begin the pre-match countdown
    pub fn start(&mut self, now_ms: u64) -> Vec<Effect> {
        if self.phase != Phase::Idle {
            return Vec::new();
        }
        self.consecutive_errors = 0;
        self.total_errors = 0;
        self.progress_pct = 0;
        self.phase = Phase::Countdown {
            remaining: COUNTDOWN_START,
            next_step_at: now_ms + COUNTDOWN_STEP_MS,
        };
        vec![Effect::CountdownStep(COUNTDOWN_START)]
    }

    /// Advance any due deadline. Call at the loop's tick rate; each call
    /// performs at most one transition.
    pub fn tick(&mut self, now_ms: u64) -> Vec<Effect> {
        match self.phase {
            Phase::Countdown {
                remaining,
                next_step_at,
            } if now_ms >= next_step_at => {
                if remaining > 1 {
                    self.phase = Phase::Countdown {
                        remaining: remaining - 1,
                        next_step_at: next_step_at + COUNTDOWN_STEP_MS,
                    };
                    vec![Effect::CountdownStep(remaining - 1)]
                } else {
                    self.phase = Phase::Active;
                    self.timer.start(now_ms);
                    vec![Effect::MatchStarted]
                }
            }
            Phase::Frozen { until } if now_ms >= until => {
                if self.consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
                    self.timer.pause(now_ms);
                    self.phase = Phase::DrawPending {
                        at: until + PRE_DRAW_DELAY_MS,
                    };
                    Vec::new()
                } else {
                    self.phase = Phase::Active;
                    vec![Effect::InputCleared]
                }
            }
            Phase::DrawPending { at } if now_ms >= at => {
                let outcome = self.roulette.draw(self.draws.as_mut());
                // Counter updates land at draw time; the transition back to
                // Active (or to Eliminated) waits for the cue to resolve.
                if matches!(outcome, DrawOutcome::Survived { .. }) {
                    self.consecutive_errors = 0;
                }
                self.phase = Phase::Presenting { outcome };
                let cue = match outcome {
                    DrawOutcome::Survived { .. } => Cue::Survival,
                    DrawOutcome::Eliminated => Cue::Elimination,
                };
                vec![Effect::CueRequested(cue)]
            }
            _ => Vec::new(),
        }
    }

    /// Validate the complete live input buffer. Ignored outside `Active`;
    /// the still-registered input source may fire during frozen windows.
    pub fn on_input(&mut self, now_ms: u64, raw: &str) -> Vec<Effect> {
        if self.phase != Phase::Active {
            return Vec::new();
        }
        let typed = normalize(raw);
        let typed_len = typed.chars().count();
        if typed_len > self.reference_len {
            return self.register_error(now_ms);
        }
        if typed
            .chars()
            .zip(self.reference.chars())
            .any(|(typed_c, reference_c)| typed_c != reference_c)
        {
            return self.register_error(now_ms);
        }
        if typed_len == self.reference_len {
            self.timer.pause(now_ms);
            self.progress_pct = 100;
            self.phase = Phase::Victorious;
            return vec![Effect::Victory(self.summary(now_ms))];
        }
        self.progress_pct = progress_pct(typed_len, self.reference_len);
        vec![Effect::Progress(self.progress_pct)]
    }

    /// Bulk input is refused outright to force sequential keystrokes.
    /// A notification, never an error-count increment.
    pub fn on_paste(&mut self) -> Vec<Effect> {
        if self.phase == Phase::Active {
            vec![Effect::PasteRejected]
        } else {
            Vec::new()
        }
    }

    /// Deliver the outcome-cue resolution. A failed cue falls back to a
    /// textual presentation and applies the identical transitions.
    pub fn cue_resolved(&mut self, now_ms: u64, result: CueOutcome) -> Vec<Effect> {
        let Phase::Presenting { outcome } = self.phase else {
            return Vec::new();
        };
        let mut effects = Vec::new();
        if result == CueOutcome::Failed {
            effects.push(Effect::CueFallback(match outcome {
                DrawOutcome::Survived { .. } => Cue::Survival,
                DrawOutcome::Eliminated => Cue::Elimination,
            }));
        }
        match outcome {
            DrawOutcome::Survived { odds } => {
                self.timer.resume(now_ms);
                self.phase = Phase::Active;
                effects.push(Effect::Survived { odds });
                effects.push(Effect::InputCleared);
            }
            DrawOutcome::Eliminated => {
                self.phase = Phase::Eliminated;
                effects.push(Effect::Eliminated(self.summary(now_ms)));
            }
        }
        effects
    }

    fn register_error(&mut self, now_ms: u64) -> Vec<Effect> {
        self.total_errors += 1;
        self.consecutive_errors += 1;
        self.phase = Phase::Frozen {
            until: now_ms + FREEZE_MS,
        };
        vec![Effect::Shake]
    }

    fn summary(&self, now_ms: u64) -> MatchSummary {
        MatchSummary {
            elapsed_ms: self.timer.elapsed_ms(now_ms),
            total_errors: self.total_errors,
            total_draws: self.roulette.total_draws(),
            final_odds: self.roulette.denominator(),
        }
    }
}

/// Canonical form used for both the reference and the live input: carriage
/// returns and invisible marks stripped, then NFC-composed.
pub fn normalize(text: &str) -> String {
    text.chars()
        .filter(|c| *c != '\r' && !is_invisible(*c))
        .nfc()
        .collect()
}

fn is_invisible(c: char) -> bool {
    matches!(
        c,
        '\u{200B}'..='\u{200F}' | '\u{202A}'..='\u{202E}' | '\u{2060}'..='\u{2064}' | '\u{FEFF}'
    )
}

fn progress_pct(matched: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    ((100.0 * matched as f64 / total as f64).round()) as u8
}
