/// Match clock with seamless pause/resume.
///
/// Elapsed time is always derived as `now − origin`, never accumulated by
/// repeated addition. Pausing freezes the derived value; resuming shifts the
/// origin forward by the frozen elapsed duration so the display continues
/// where it stopped.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MatchTimer {
    origin_ms: Option<u64>,
    frozen_elapsed_ms: u64,
    paused: bool,
}

impl MatchTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self, now_ms: u64) {
        self.origin_ms = Some(now_ms);
        self.frozen_elapsed_ms = 0;
        self.paused = false;
    }

    pub fn has_started(&self) -> bool {
        self.origin_ms.is_some()
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn elapsed_ms(&self, now_ms: u64) -> u64 {
        match self.origin_ms {
            None => 0,
            Some(_) if self.paused => self.frozen_elapsed_ms,
            Some(origin) => now_ms.saturating_sub(origin),
        }
    }

    pub fn pause(&mut self, now_ms: u64) {
        if let Some(origin) = self.origin_ms {
            if !self.paused {
                self.frozen_elapsed_ms = now_ms.saturating_sub(origin);
                self.paused = true;
            }
        }
    }

    pub fn resume(&mut self, now_ms: u64) {
        if self.origin_ms.is_some() && self.paused {
            self.origin_ms = Some(now_ms.saturating_sub(self.frozen_elapsed_ms));
            self.paused = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unstarted_timer_reads_zero() {
        let timer = MatchTimer::new();
        assert!(!timer.has_started());
        assert_eq!(timer.elapsed_ms(99_999), 0);
    }

    #[test]
    fn elapsed_is_derived_from_origin() {
        let mut timer = MatchTimer::new();
        timer.start(1_000);
        assert_eq!(timer.elapsed_ms(1_000), 0);
        assert_eq!(timer.elapsed_ms(4_250), 3_250);
    }

    #[test]
    fn pause_freezes_elapsed() {
        let mut timer = MatchTimer::new();
        timer.start(0);
        timer.pause(5_000);
        assert!(timer.is_paused());
        assert_eq!(timer.elapsed_ms(5_000), 5_000);
        assert_eq!(timer.elapsed_ms(60_000), 5_000);
    }

    #[test]
    fn resume_continues_without_jump() {
        let mut timer = MatchTimer::new();
        timer.start(0);
        timer.pause(5_000);
        timer.resume(12_000);
        // Continues from the pre-pause value, not from zero and not from 12s
        assert_eq!(timer.elapsed_ms(12_000), 5_000);
        assert_eq!(timer.elapsed_ms(13_500), 6_500);
    }

    #[test]
    fn double_pause_and_double_resume_are_noops() {
        let mut timer = MatchTimer::new();
        timer.start(0);
        timer.pause(2_000);
        timer.pause(9_000);
        assert_eq!(timer.elapsed_ms(9_000), 2_000);

        timer.resume(10_000);
        timer.resume(20_000);
        assert_eq!(timer.elapsed_ms(11_000), 3_000);
    }

    #[test]
    fn pause_before_start_is_ignored() {
        let mut timer = MatchTimer::new();
        timer.pause(1_000);
        assert!(!timer.is_paused());
        timer.resume(2_000);
        assert_eq!(timer.elapsed_ms(2_000), 0);
    }
}
