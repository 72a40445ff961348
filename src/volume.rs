use crate::media::MediaPlayer;
use crate::store::{KeyValueStore, AMBIENT_VOL_KEY, FEEDBACK_VOL_KEY};

pub const DEFAULT_AMBIENT_VOLUME: f64 = 0.5;
pub const DEFAULT_FEEDBACK_VOLUME: f64 = 0.9;

/// Two independent volume domains: the ambient track, and the UI-feedback
/// cues (which all share one level). Loaded once at startup, applied live,
/// and persisted fire-and-forget on every change.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VolumePrefs {
    ambient: f64,
    feedback: f64,
}

impl VolumePrefs {
    pub fn load(store: &dyn KeyValueStore) -> Self {
        Self {
            ambient: read_volume(store, AMBIENT_VOL_KEY, DEFAULT_AMBIENT_VOLUME),
            feedback: read_volume(store, FEEDBACK_VOL_KEY, DEFAULT_FEEDBACK_VOLUME),
        }
    }

    pub fn ambient(&self) -> f64 {
        self.ambient
    }

    pub fn feedback(&self) -> f64 {
        self.feedback
    }

    /// Push the loaded levels onto the live players
    pub fn apply(&self, ambient: &mut dyn MediaPlayer, feedback: &mut [&mut dyn MediaPlayer]) {
        ambient.set_volume(self.ambient);
        for player in feedback.iter_mut() {
            player.set_volume(self.feedback);
        }
    }

    pub fn set_ambient(
        &mut self,
        value: f64,
        player: &mut dyn MediaPlayer,
        store: &dyn KeyValueStore,
    ) {
        self.ambient = value.clamp(0.0, 1.0);
        player.set_volume(self.ambient);
        let _ = store.set(AMBIENT_VOL_KEY, &self.ambient.to_string());
    }

    pub fn set_feedback(
        &mut self,
        value: f64,
        players: &mut [&mut dyn MediaPlayer],
        store: &dyn KeyValueStore,
    ) {
        self.feedback = value.clamp(0.0, 1.0);
        for player in players.iter_mut() {
            player.set_volume(self.feedback);
        }
        let _ = store.set(FEEDBACK_VOL_KEY, &self.feedback.to_string());
    }
}

fn read_volume(store: &dyn KeyValueStore, key: &str, default: f64) -> f64 {
    store
        .get(key)
        .and_then(|raw| raw.parse::<f64>().ok())
        .filter(|v| (0.0..=1.0).contains(v))
        .unwrap_or(default)
}
