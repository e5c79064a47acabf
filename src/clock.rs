//! Monotonic time source shared by the frame processor, the poll tick and the
//! settle-delay timer.

use crate::lock_or_recover;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Anything that can tell the meter what time it is.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// The real monotonic clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    base: Instant,
    offset: Arc<Mutex<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset: Arc::new(Mutex::new(Duration::ZERO)),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut offset = lock_or_recover(&self.offset, "manual_clock");
        *offset = offset.saturating_add(by);
    }

    /// Jump to `at` past the origin. Moving backwards is ignored so the clock stays monotonic.
    pub fn set_elapsed(&self, at: Duration) {
        let mut offset = lock_or_recover(&self.offset, "manual_clock");
        if at > *offset {
            *offset = at;
        }
    }

    pub fn elapsed(&self) -> Duration {
        *lock_or_recover(&self.offset, "manual_clock")
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + self.elapsed()
    }
}
