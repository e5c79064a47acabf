//! Bridges detector callbacks on the meter thread to the main loop.

use blowout::audio::MeterEvents;
use blowout::MeterError;
use crossbeam_channel::Sender;
use serde::Serialize;
use std::sync::atomic::{AtomicU8, Ordering};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub(crate) enum UiEvent {
    Started { device: String },
    Loud,
    Quiet,
    SustainedLoudInput,
    StreamLost { reason: String },
}

impl UiEvent {
    pub(crate) fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

const LEVEL_UNKNOWN: u8 = 0;
const LEVEL_QUIET: u8 = 1;
const LEVEL_LOUD: u8 = 2;

/// Forwards loud/quiet only when the level changes.
pub(crate) struct ChannelEvents {
    tx: Sender<UiEvent>,
    level: AtomicU8,
}

impl ChannelEvents {
    pub(crate) fn new(tx: Sender<UiEvent>) -> Self {
        Self {
            tx,
            level: AtomicU8::new(LEVEL_UNKNOWN),
        }
    }

    fn level_changed(&self, level: u8, event: UiEvent) {
        if self.level.swap(level, Ordering::Relaxed) != level {
            let _ = self.tx.send(event);
        }
    }
}

impl MeterEvents for ChannelEvents {
    fn on_sustained_loud_input(&self) {
        let _ = self.tx.send(UiEvent::SustainedLoudInput);
    }

    fn on_loud(&self) {
        self.level_changed(LEVEL_LOUD, UiEvent::Loud);
    }

    fn on_quiet(&self) {
        self.level_changed(LEVEL_QUIET, UiEvent::Quiet);
    }

    fn on_stream_lost(&self, err: &MeterError) {
        let reason = match err {
            MeterError::StreamLost(reason) => reason.clone(),
            other => other.to_string(),
        };
        let _ = self.tx.send(UiEvent::StreamLost { reason });
    }
}
