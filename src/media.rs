use std::error::Error;
use std::fmt;

/// Playback refused by the host (the autoplay-block case). The caller defers
/// to a user gesture rather than treating this as fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackBlocked;

impl fmt::Display for PlaybackBlocked {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "playback blocked until user gesture")
    }
}

impl Error for PlaybackBlocked {}

/// How an outcome cue finished. Exactly one of these is delivered per cue;
/// a failed cue is presented textually but drives the same transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CueOutcome {
    Completed,
    Failed,
}

/// Opaque playback handle. Positions and durations are in seconds.
pub trait MediaPlayer {
    fn position_secs(&self) -> f64;
    fn seek_to(&mut self, secs: f64);
    /// None while the media's metadata is unknown
    fn duration_secs(&self) -> Option<f64>;
    fn play(&mut self) -> Result<(), PlaybackBlocked>;
    fn pause(&mut self);
    fn is_playing(&self) -> bool;
    fn volume(&self) -> f64;
    fn set_volume(&mut self, volume: f64);
}

/// Clock-fed stand-in for a real audio backend: position advances with the
/// timestamps it is fed and wraps at the duration (the ambient track loops).
/// Doubles as the test player, the same dual role the runtime's
/// `TestEventSource` plays.
#[derive(Debug, Clone)]
pub struct SilentPlayer {
    duration: Option<f64>,
    position: f64,
    playing: bool,
    volume: f64,
    blocked: bool,
    last_advance_ms: Option<u64>,
}

impl SilentPlayer {
    pub fn new(duration: Option<f64>) -> Self {
        Self {
            duration,
            position: 0.0,
            playing: false,
            volume: 1.0,
            blocked: false,
            last_advance_ms: None,
        }
    }

    /// Player whose first `play()` is refused, like an autoplay policy.
    /// `unblock` models the host accepting a user gesture.
    pub fn blocked_until_gesture(duration: Option<f64>) -> Self {
        Self {
            blocked: true,
            ..Self::new(duration)
        }
    }

    pub fn unblock(&mut self) {
        self.blocked = false;
    }

    /// Advance the simulated position to `now_ms`
    pub fn advance_to(&mut self, now_ms: u64) {
        let last = self.last_advance_ms.replace(now_ms);
        if !self.playing {
            return;
        }
        if let Some(last) = last {
            self.position += now_ms.saturating_sub(last) as f64 / 1000.0;
            if let Some(d) = self.duration {
                if d > 0.0 {
                    self.position %= d;
                }
            }
        }
    }
}

impl MediaPlayer for SilentPlayer {
    fn position_secs(&self) -> f64 {
        self.position
    }

    fn seek_to(&mut self, secs: f64) {
        self.position = secs.max(0.0);
    }

    fn duration_secs(&self) -> Option<f64> {
        self.duration
    }

    fn play(&mut self) -> Result<(), PlaybackBlocked> {
        if self.blocked {
            return Err(PlaybackBlocked);
        }
        self.playing = true;
        Ok(())
    }

    fn pause(&mut self) {
        self.playing = false;
    }

    fn is_playing(&self) -> bool {
        self.playing
    }

    fn volume(&self) -> f64 {
        self.volume
    }

    fn set_volume(&mut self, volume: f64) {
        self.volume = volume.clamp(0.0, 1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_advances_only_while_playing() {
        let mut player = SilentPlayer::new(Some(60.0));
        player.advance_to(0);
        player.advance_to(1_000);
        assert_eq!(player.position_secs(), 0.0);

        player.play().unwrap();
        player.advance_to(3_500);
        assert!((player.position_secs() - 2.5).abs() < 1e-9);

        player.pause();
        player.advance_to(10_000);
        assert!((player.position_secs() - 2.5).abs() < 1e-9);
    }

    #[test]
    fn position_wraps_at_duration() {
        let mut player = SilentPlayer::new(Some(10.0));
        player.play().unwrap();
        player.advance_to(0);
        player.advance_to(25_000);
        assert!((player.position_secs() - 5.0).abs() < 1e-9);
    }

    #[test]
    fn unknown_duration_accumulates_unbounded() {
        let mut player = SilentPlayer::new(None);
        player.play().unwrap();
        player.advance_to(0);
        player.advance_to(3_600_000);
        assert!((player.position_secs() - 3_600.0).abs() < 1e-9);
    }

    #[test]
    fn blocked_player_refuses_until_unblocked() {
        let mut player = SilentPlayer::blocked_until_gesture(Some(60.0));
        assert_eq!(player.play(), Err(PlaybackBlocked));
        assert!(!player.is_playing());

        player.unblock();
        assert!(player.play().is_ok());
        assert!(player.is_playing());
    }

    #[test]
    fn volume_is_clamped() {
        let mut player = SilentPlayer::new(None);
        player.set_volume(1.7);
        assert_eq!(player.volume(), 1.0);
        player.set_volume(-0.3);
        assert_eq!(player.volume(), 0.0);
    }
}
