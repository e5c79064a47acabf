//! Outward events and the one-shot "blown out" trigger.

use crate::error::MeterError;
use std::time::{Duration, Instant};

/// Receiver for meter events. Called on the meter worker thread.
///
/// `on_loud`/`on_quiet` repeat on every frame and poll tick, so they must be
/// cheap. `on_sustained_loud_input` runs at most once per lifecycle.
pub trait MeterEvents: Send + Sync + 'static {
    fn on_sustained_loud_input(&self);

    fn on_loud(&self) {}

    fn on_quiet(&self) {}

    /// The stream ended underneath a running session.
    fn on_stream_lost(&self, _err: &MeterError) {}
}

/// Delayed action that fires at most once, and is never re-armed.
#[derive(Debug, Clone)]
pub struct OneShotTrigger {
    delay: Duration,
    deadline: Option<Instant>,
    fired: bool,
}

impl OneShotTrigger {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
            fired: false,
        }
    }

    /// Schedule the action `delay` after `at`. Returns false when it was
    /// already scheduled or already fired; an existing deadline is not moved.
    pub fn arm(&mut self, at: Instant) -> bool {
        if self.fired || self.deadline.is_some() {
            return false;
        }
        self.deadline = Some(at + self.delay);
        true
    }

    /// Returns true exactly once, on the first call at or past the deadline.
    pub fn take_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if !self.fired && now >= deadline => {
                self.fired = true;
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn has_fired(&self) -> bool {
        self.fired
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }
}
