use crate::media::MediaPlayer;
use crate::store::{KeyValueStore, AMBIENT_POS_AT_KEY, AMBIENT_POS_KEY};

/// Cadence of position snapshots while the track plays
pub const SNAPSHOT_INTERVAL_MS: u64 = 300;

/// Keep seeks strictly below a known duration
const SEEK_GUARD_SECS: f64 = 0.001;

/// Last persisted playback offset and when it was captured
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PositionSnapshot {
    pub offset_secs: f64,
    pub captured_at_ms: u64,
}

pub fn load_snapshot(store: &dyn KeyValueStore) -> Option<PositionSnapshot> {
    let offset_secs = store.get(AMBIENT_POS_KEY)?.parse::<f64>().ok()?;
    let captured_at_ms = store.get(AMBIENT_POS_AT_KEY)?.parse::<u64>().ok()?;
    if !offset_secs.is_finite() || offset_secs < 0.0 {
        return None;
    }
    Some(PositionSnapshot {
        offset_secs,
        captured_at_ms,
    })
}

/// Where the track would be now if it had kept playing since the snapshot.
/// With a known duration the result wraps into `[0, duration)`; without one
/// the sum is left unclamped.
pub fn resume_offset(
    snapshot: Option<PositionSnapshot>,
    now_ms: u64,
    duration_secs: Option<f64>,
) -> f64 {
    let Some(snapshot) = snapshot else {
        return 0.0;
    };
    let elapsed_secs = now_ms.saturating_sub(snapshot.captured_at_ms) as f64 / 1000.0;
    let position = snapshot.offset_secs + elapsed_secs;
    match duration_secs {
        Some(d) if d > 0.0 => position % d,
        _ => position,
    }
}

/// Whether a deferred resume attempt is armed
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum GestureArm {
    Idle,
    Armed,
    Spent,
}

/// Cross-session continuity for the ambient track: resumes at the computed
/// offset, snapshots the position on a fixed cadence, and defers a blocked
/// resume until the first user gesture (one attempt, then disarmed).
///
/// Store writes are best-effort throughout; a failed write never interrupts
/// playback.
#[derive(Debug)]
pub struct AmbientAudio {
    last_snapshot_at: Option<u64>,
    gesture: GestureArm,
}

impl AmbientAudio {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            last_snapshot_at: None,
            gesture: GestureArm::Idle,
        }
    }

    /// Resume playback at the offset implied by the stored snapshot.
    /// A refusal (autoplay block) arms the gesture deferral instead of
    /// surfacing an error.
    pub fn begin(&mut self, player: &mut dyn MediaPlayer, store: &dyn KeyValueStore, now_ms: u64) {
        if player.is_playing() && player.position_secs() > 0.0 {
            return;
        }
        self.seek_to_resume_point(player, store, now_ms);
        if player.play().is_err() {
            self.gesture = GestureArm::Armed;
        }
    }

    /// First user interaction after a blocked resume: try exactly once more,
    /// then disarm permanently whatever the result.
    pub fn on_gesture(
        &mut self,
        player: &mut dyn MediaPlayer,
        store: &dyn KeyValueStore,
        now_ms: u64,
    ) {
        if self.gesture != GestureArm::Armed {
            return;
        }
        self.gesture = GestureArm::Spent;
        self.seek_to_resume_point(player, store, now_ms);
        let _ = player.play();
    }

    pub fn awaiting_gesture(&self) -> bool {
        self.gesture == GestureArm::Armed
    }

    /// Drive the snapshot cadence; call on every loop tick
    pub fn on_tick(&mut self, player: &dyn MediaPlayer, store: &dyn KeyValueStore, now_ms: u64) {
        if !player.is_playing() {
            return;
        }
        let due = match self.last_snapshot_at {
            None => true,
            Some(last) => now_ms.saturating_sub(last) >= SNAPSHOT_INTERVAL_MS,
        };
        if due {
            snapshot(player, store, now_ms);
            self.last_snapshot_at = Some(now_ms);
        }
    }

    /// Pause for the duration of a match, leaving a fresh snapshot behind
    pub fn suspend(&mut self, player: &mut dyn MediaPlayer, store: &dyn KeyValueStore, now_ms: u64) {
        if player.is_playing() {
            snapshot(player, store, now_ms);
            self.last_snapshot_at = Some(now_ms);
        }
        player.pause();
    }

    fn seek_to_resume_point(
        &self,
        player: &mut dyn MediaPlayer,
        store: &dyn KeyValueStore,
        now_ms: u64,
    ) {
        let duration = player.duration_secs();
        let mut target = resume_offset(load_snapshot(store), now_ms, duration);
        if let Some(d) = duration {
            if d > 0.0 {
                target = target.min(d - SEEK_GUARD_SECS).max(0.0);
            }
        }
        player.seek_to(target);
    }
}

/// One best-effort position snapshot; also used for the final write on exit
pub fn snapshot(player: &dyn MediaPlayer, store: &dyn KeyValueStore, now_ms: u64) {
    let _ = store.set(AMBIENT_POS_KEY, &player.position_secs().to_string());
    let _ = store.set(AMBIENT_POS_AT_KEY, &now_ms.to_string());
}
