//! Command-line parsing, meter tuning, and validation helpers.

mod defaults;
#[cfg(test)]
mod tests;
mod validation;

use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use defaults::{
    DEFAULT_AVERAGING, DEFAULT_CHANNEL_CAPACITY, DEFAULT_CLIP_LAG_MS, DEFAULT_CLIP_LEVEL,
    DEFAULT_DECAY_REFERENCE_MS, DEFAULT_FRAME_SIZE, DEFAULT_METER_WIDTH,
    DEFAULT_SETTLE_DELAY_MS, DEFAULT_TICK_MS, MAX_CHANNEL_CAPACITY, MAX_FRAME_SIZE,
    MAX_METER_WIDTH, MAX_TICK_MS, MAX_TIMEOUT_MS, MIN_CHANNEL_CAPACITY, MIN_TICK_MS,
};

/// CLI options for the `blowout` binary.
#[derive(Debug, Parser, Clone)]
#[command(about = "Blowout microphone candle meter", author, version)]
pub struct AppConfig {
    /// Preferred audio input device name
    #[arg(long)]
    pub input_device: Option<String>,

    /// Print detected audio input devices and exit
    #[arg(long = "list-input-devices", default_value_t = false)]
    pub list_input_devices: bool,

    /// Sample amplitude that counts as blowing (0, 1]
    #[arg(long = "clip-level", default_value_t = DEFAULT_CLIP_LEVEL)]
    pub clip_level: f32,

    /// Volume decay multiplier per frame [0, 1)
    #[arg(long, default_value_t = DEFAULT_AVERAGING)]
    pub averaging: f32,

    /// Quiet time after the last loud sample before the candle relights (milliseconds)
    #[arg(long = "clip-lag-ms", default_value_t = DEFAULT_CLIP_LAG_MS)]
    pub clip_lag_ms: u64,

    /// Samples per processing frame
    #[arg(long = "frame-size", default_value_t = DEFAULT_FRAME_SIZE)]
    pub frame_size: usize,

    /// Delay between the first blow and the blown-out event (milliseconds)
    #[arg(long = "settle-delay-ms", default_value_t = DEFAULT_SETTLE_DELAY_MS)]
    pub settle_delay_ms: u64,

    /// Poll tick period used to re-check the quiet transition (milliseconds)
    #[arg(long = "tick-ms", default_value_t = DEFAULT_TICK_MS)]
    pub tick_ms: u64,

    /// How the displayed volume decays between frames
    #[arg(long, value_enum, default_value_t = DecayKind::PerFrame)]
    pub decay: DecayKind,

    /// Frame interval the averaging factor is tuned for (wall-clock decay only)
    #[arg(long = "decay-reference-ms", default_value_t = DEFAULT_DECAY_REFERENCE_MS)]
    pub decay_reference_ms: u64,

    /// Frames buffered between the audio callback and the meter worker
    #[arg(long = "channel-capacity", default_value_t = DEFAULT_CHANNEL_CAPACITY)]
    pub channel_capacity: usize,

    /// Emit one JSON object per event instead of drawing the meter
    #[arg(long = "json-events", default_value_t = false)]
    pub json_events: bool,

    /// Meter bar width in characters
    #[arg(long = "meter-width", default_value_t = DEFAULT_METER_WIDTH)]
    pub meter_width: usize,

    /// Enable file logging (debug)
    #[arg(long = "logs", env = "BLOWOUT_LOGS", default_value_t = false)]
    pub logs: bool,

    /// Disable all file logging (overrides --logs and log env vars)
    #[arg(long = "no-logs", env = "BLOWOUT_NO_LOGS", default_value_t = false)]
    pub no_logs: bool,

    /// Enable session metric logs
    #[arg(long)]
    pub log_timings: bool,
}

impl AppConfig {
    pub fn logging_enabled(&self) -> bool {
        (self.logs || self.log_timings) && !self.no_logs
    }

    /// Build the meter tuning from the parsed flags.
    pub fn meter_config(&self) -> MeterConfig {
        let decay = match self.decay {
            DecayKind::PerFrame => DecayMode::PerFrame,
            DecayKind::WallClock => DecayMode::WallClock {
                reference_ms: self.decay_reference_ms,
            },
        };
        MeterConfig {
            clip_level: self.clip_level,
            averaging: self.averaging,
            clip_lag_ms: self.clip_lag_ms,
            frame_size: self.frame_size,
            settle_delay_ms: self.settle_delay_ms,
            tick_ms: self.tick_ms,
            decay,
            channel_capacity: self.channel_capacity,
        }
    }
}

/// CLI selector for [`DecayMode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DecayKind {
    PerFrame,
    WallClock,
}

/// How `averaging` is applied when a frame is quieter than the current volume.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum DecayMode {
    /// Multiply by `averaging` once per frame, whatever the frame cadence.
    #[default]
    PerFrame,
    /// Multiply by `averaging` once per `reference_ms` of elapsed time.
    WallClock { reference_ms: u64 },
}

/// Tunables for one metering lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeterConfig {
    pub clip_level: f32,
    pub averaging: f32,
    pub clip_lag_ms: u64,
    pub frame_size: usize,
    pub settle_delay_ms: u64,
    pub tick_ms: u64,
    pub decay: DecayMode,
    pub channel_capacity: usize,
}

impl Default for MeterConfig {
    fn default() -> Self {
        Self {
            clip_level: DEFAULT_CLIP_LEVEL,
            averaging: DEFAULT_AVERAGING,
            clip_lag_ms: DEFAULT_CLIP_LAG_MS,
            frame_size: DEFAULT_FRAME_SIZE,
            settle_delay_ms: DEFAULT_SETTLE_DELAY_MS,
            tick_ms: DEFAULT_TICK_MS,
            decay: DecayMode::PerFrame,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl MeterConfig {
    pub fn clip_lag(&self) -> Duration {
        Duration::from_millis(self.clip_lag_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}
