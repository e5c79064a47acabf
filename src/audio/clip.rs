//! Clip hysteresis: debounces raw clip events into a stable clipping state.
//!
//! A single loud sample latches `Clipping`; the state only returns to `Clear`
//! once `clip_lag` has passed with no further loud samples. The release is
//! time-driven, so it is polled between frames as well as on them.

use std::time::{Duration, Instant};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ClipState {
    Clear,
    Clipping,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ClipTransition {
    /// `Clear -> Clipping`.
    Entered,
    /// `Clipping -> Clipping`: the lag window moved forward.
    Refreshed,
    /// `Clipping -> Clear`.
    Cleared,
}

#[derive(Debug, Clone)]
pub struct ClipDetector {
    lag: Duration,
    state: ClipState,
    last_clip: Option<Instant>,
}

impl ClipDetector {
    pub fn new(lag: Duration) -> Self {
        Self {
            lag,
            state: ClipState::Clear,
            last_clip: None,
        }
    }

    /// Record a qualifying sample seen at `at`.
    pub fn note_clip(&mut self, at: Instant) -> ClipTransition {
        self.last_clip = Some(match self.last_clip {
            Some(previous) if previous > at => previous,
            _ => at,
        });
        match self.state {
            ClipState::Clear => {
                self.state = ClipState::Clipping;
                ClipTransition::Entered
            }
            ClipState::Clipping => ClipTransition::Refreshed,
        }
    }

    /// Release the latch once the lag window has fully elapsed.
    pub fn poll(&mut self, now: Instant) -> Option<ClipTransition> {
        if self.state == ClipState::Clipping && !self.within_lag(now) {
            self.state = ClipState::Clear;
            return Some(ClipTransition::Cleared);
        }
        None
    }

    /// Pure query: does not advance the state machine.
    pub fn is_clipping(&self, now: Instant) -> bool {
        self.state == ClipState::Clipping && self.within_lag(now)
    }

    pub fn state(&self) -> ClipState {
        self.state
    }

    pub fn last_clip(&self) -> Option<Instant> {
        self.last_clip
    }

    fn within_lag(&self, now: Instant) -> bool {
        match self.last_clip {
            Some(last) => now.saturating_duration_since(last) <= self.lag,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LAG: Duration = Duration::from_millis(3_500);

    #[test]
    fn starts_clear() {
        let detector = ClipDetector::new(LAG);
        assert_eq!(detector.state(), ClipState::Clear);
        assert!(!detector.is_clipping(Instant::now()));
        assert!(detector.last_clip().is_none());
    }

    #[test]
    fn first_clip_enters_and_later_clips_refresh() {
        let mut detector = ClipDetector::new(LAG);
        let t0 = Instant::now();
        assert_eq!(detector.note_clip(t0), ClipTransition::Entered);
        assert_eq!(
            detector.note_clip(t0 + Duration::from_millis(100)),
            ClipTransition::Refreshed
        );
        assert_eq!(detector.last_clip(), Some(t0 + Duration::from_millis(100)));
    }

    #[test]
    fn holds_through_lag_window_then_clears() {
        let mut detector = ClipDetector::new(LAG);
        let t0 = Instant::now();
        detector.note_clip(t0);
        assert_eq!(detector.poll(t0 + Duration::from_millis(3_000)), None);
        assert!(detector.is_clipping(t0 + Duration::from_millis(3_000)));
        // The window is inclusive: exactly `lag` later still counts as clipping.
        assert!(detector.is_clipping(t0 + LAG));
        assert_eq!(
            detector.poll(t0 + Duration::from_millis(3_600)),
            Some(ClipTransition::Cleared)
        );
        assert_eq!(detector.state(), ClipState::Clear);
        assert_eq!(detector.poll(t0 + Duration::from_millis(4_000)), None);
    }

    #[test]
    fn refresh_extends_window() {
        let mut detector = ClipDetector::new(LAG);
        let t0 = Instant::now();
        detector.note_clip(t0);
        detector.note_clip(t0 + Duration::from_millis(2_000));
        assert_eq!(detector.poll(t0 + Duration::from_millis(5_000)), None);
        assert!(detector.is_clipping(t0 + Duration::from_millis(5_000)));
        assert_eq!(
            detector.poll(t0 + Duration::from_millis(5_600)),
            Some(ClipTransition::Cleared)
        );
    }

    #[test]
    fn query_is_false_after_window_even_before_poll() {
        let mut detector = ClipDetector::new(LAG);
        let t0 = Instant::now();
        detector.note_clip(t0);
        assert!(!detector.is_clipping(t0 + Duration::from_millis(3_600)));
        assert_eq!(detector.state(), ClipState::Clipping);
    }

    #[test]
    fn zero_lag_clears_on_next_instant() {
        let mut detector = ClipDetector::new(Duration::ZERO);
        let t0 = Instant::now();
        detector.note_clip(t0);
        assert!(detector.is_clipping(t0));
        assert_eq!(
            detector.poll(t0 + Duration::from_millis(1)),
            Some(ClipTransition::Cleared)
        );
    }

    #[test]
    fn out_of_order_clip_never_moves_window_backwards() {
        let mut detector = ClipDetector::new(LAG);
        let t0 = Instant::now();
        detector.note_clip(t0 + Duration::from_millis(500));
        detector.note_clip(t0);
        assert_eq!(detector.last_clip(), Some(t0 + Duration::from_millis(500)));
    }
}
