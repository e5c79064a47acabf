use super::defaults::{
    FORBIDDEN_DEVICE_CHARS, MAX_CHANNEL_CAPACITY, MAX_FRAME_SIZE, MAX_METER_WIDTH,
    MAX_TICK_MS, MAX_TIMEOUT_MS, MIN_CHANNEL_CAPACITY, MIN_TICK_MS,
};
use super::{AppConfig, DecayMode, MeterConfig};
use crate::error::MeterError;
use anyhow::{bail, Context, Result};

impl AppConfig {
    /// Check CLI values and normalize the device name.
    pub fn validate(&mut self) -> Result<()> {
        if let Some(device) = self.input_device.take() {
            let trimmed = device.trim();
            if trimmed.is_empty() {
                bail!("--input-device cannot be empty");
            }
            if trimmed.chars().any(|c| FORBIDDEN_DEVICE_CHARS.contains(&c)) {
                bail!("--input-device contains unsupported control characters");
            }
            self.input_device = Some(trimmed.to_string());
        }
        if self.meter_width == 0 || self.meter_width > MAX_METER_WIDTH {
            bail!(
                "--meter-width must be between 1 and {MAX_METER_WIDTH}, got {}",
                self.meter_width
            );
        }
        if self.decay_reference_ms == 0 || self.decay_reference_ms > MAX_TIMEOUT_MS {
            bail!(
                "--decay-reference-ms must be between 1 and {MAX_TIMEOUT_MS} ms, got {}",
                self.decay_reference_ms
            );
        }
        self.meter_config()
            .validate()
            .context("invalid meter settings")?;
        Ok(())
    }
}

impl MeterConfig {
    /// Reject tuning the meter cannot run with.
    pub fn validate(&self) -> Result<(), MeterError> {
        let invalid = |msg: String| -> Result<(), MeterError> {
            Err(MeterError::InvalidConfig(msg))
        };

        if !(self.clip_level > 0.0 && self.clip_level <= 1.0) {
            return invalid(format!(
                "clip_level must be in (0, 1], got {}",
                self.clip_level
            ));
        }
        if !(self.averaging >= 0.0 && self.averaging < 1.0) {
            return invalid(format!(
                "averaging must be in [0, 1), got {}",
                self.averaging
            ));
        }
        if self.frame_size == 0 || self.frame_size > MAX_FRAME_SIZE {
            return invalid(format!(
                "frame_size must be between 1 and {MAX_FRAME_SIZE}, got {}",
                self.frame_size
            ));
        }
        if self.clip_lag_ms > MAX_TIMEOUT_MS {
            return invalid(format!(
                "clip_lag_ms must be at most {MAX_TIMEOUT_MS}, got {}",
                self.clip_lag_ms
            ));
        }
        if self.settle_delay_ms > MAX_TIMEOUT_MS {
            return invalid(format!(
                "settle_delay_ms must be at most {MAX_TIMEOUT_MS}, got {}",
                self.settle_delay_ms
            ));
        }
        if !(MIN_TICK_MS..=MAX_TICK_MS).contains(&self.tick_ms) {
            return invalid(format!(
                "tick_ms must be between {MIN_TICK_MS} and {MAX_TICK_MS}, got {}",
                self.tick_ms
            ));
        }
        if !(MIN_CHANNEL_CAPACITY..=MAX_CHANNEL_CAPACITY).contains(&self.channel_capacity) {
            return invalid(format!(
                "channel_capacity must be between {MIN_CHANNEL_CAPACITY} and {MAX_CHANNEL_CAPACITY}, got {}",
                self.channel_capacity
            ));
        }
        if let DecayMode::WallClock { reference_ms } = self.decay {
            if reference_ms == 0 || reference_ms > MAX_TIMEOUT_MS {
                return invalid(format!(
                    "decay reference_ms must be between 1 and {MAX_TIMEOUT_MS}, got {reference_ms}"
                ));
            }
        }
        Ok(())
    }
}
