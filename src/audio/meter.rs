//! Frame processor: RMS volume with instant attack and exponential decay,
//! plus raw clip detection per sample.

use crate::config::{DecayMode, MeterConfig};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// What one frame did to the meter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameReport {
    pub rms: f32,
    pub volume: f32,
    /// Samples at or above the clip level.
    pub clip_samples: usize,
    /// Set when at least one sample clipped; every sample in a frame shares the frame's timestamp.
    pub clipped_at: Option<Instant>,
}

#[derive(Debug, Clone)]
pub struct FrameProcessor {
    clip_level: f32,
    averaging: f32,
    decay: DecayMode,
    volume: f32,
    last_frame_at: Option<Instant>,
}

impl FrameProcessor {
    pub fn new(config: &MeterConfig) -> Self {
        Self {
            clip_level: config.clip_level,
            averaging: config.averaging,
            decay: config.decay,
            volume: 0.0,
            last_frame_at: None,
        }
    }

    /// Fold one frame into the meter. The frame's own length is used for the
    /// RMS so short or oversized callbacks are measured correctly.
    pub fn process(&mut self, samples: &[f32], now: Instant) -> FrameReport {
        let mut sum_squares = 0.0f32;
        let mut clip_samples = 0usize;
        for &sample in samples {
            if sample.abs() >= self.clip_level {
                clip_samples += 1;
            }
            sum_squares += sample * sample;
        }
        let rms = if samples.is_empty() {
            0.0
        } else {
            (sum_squares / samples.len() as f32).sqrt()
        };

        // f32::max drops a NaN rms, so a corrupt frame decays instead of poisoning the meter.
        let decayed = self.volume * self.decay_factor(now);
        self.volume = rms.max(decayed).max(0.0);
        self.last_frame_at = Some(now);

        FrameReport {
            rms,
            volume: self.volume,
            clip_samples,
            clipped_at: (clip_samples > 0).then_some(now),
        }
    }

    fn decay_factor(&self, now: Instant) -> f32 {
        match self.decay {
            DecayMode::PerFrame => self.averaging,
            DecayMode::WallClock { reference_ms } => {
                let Some(previous) = self.last_frame_at else {
                    return self.averaging;
                };
                let elapsed = now.saturating_duration_since(previous).as_secs_f32();
                let reference = reference_ms.max(1) as f32 / 1000.0;
                self.averaging.powf(elapsed / reference)
            }
        }
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }
}

/// Lock-free snapshot of the meter for rendering collaborators.
///
/// Only the meter worker writes; any thread may read.
#[derive(Clone, Debug)]
pub struct LiveMeter {
    volume_bits: Arc<AtomicU32>,
    clipping: Arc<AtomicBool>,
    running: Arc<AtomicBool>,
}

impl LiveMeter {
    pub fn new() -> Self {
        Self {
            volume_bits: Arc::new(AtomicU32::new(0.0f32.to_bits())),
            clipping: Arc::new(AtomicBool::new(false)),
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    pub(crate) fn publish(&self, volume: f32, clipping: bool) {
        self.volume_bits.store(volume.to_bits(), Ordering::Relaxed);
        self.clipping.store(clipping, Ordering::Relaxed);
    }

    pub(crate) fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::Release);
    }

    pub(crate) fn reset(&self) {
        self.publish(0.0, false);
        self.set_running(false);
    }

    pub fn volume(&self) -> f32 {
        f32::from_bits(self.volume_bits.load(Ordering::Relaxed))
    }

    pub fn is_clipping(&self) -> bool {
        self.clipping.load(Ordering::Relaxed)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

impl Default for LiveMeter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn processor() -> FrameProcessor {
        FrameProcessor::new(&MeterConfig::default())
    }

    #[test]
    fn rms_rises_instantly() {
        let mut meter = processor();
        let report = meter.process(&[0.5; 512], Instant::now());
        assert!((report.rms - 0.5).abs() < 1e-6);
        assert!((report.volume - 0.5).abs() < 1e-6);
        assert_eq!(report.clip_samples, 0);
        assert!(report.clipped_at.is_none());
    }

    #[test]
    fn silence_decays_by_averaging_per_frame() {
        let mut meter = processor();
        let now = Instant::now();
        meter.process(&[0.5; 512], now);
        let report = meter.process(&[0.0; 512], now);
        assert!((report.volume - 0.5 * 0.99).abs() < 1e-6);
        let report = meter.process(&[0.0; 512], now);
        assert!((report.volume - 0.5 * 0.99 * 0.99).abs() < 1e-6);
    }

    #[test]
    fn empty_frame_is_pure_decay() {
        let mut meter = processor();
        let now = Instant::now();
        meter.process(&[0.4; 64], now);
        let report = meter.process(&[], now);
        assert_eq!(report.rms, 0.0);
        assert!((report.volume - 0.4 * 0.99).abs() < 1e-6);
        assert!(report.clipped_at.is_none());
    }

    #[test]
    fn short_frame_uses_actual_length() {
        let mut meter = processor();
        let report = meter.process(&[1.0, -1.0, 0.0, 0.0], Instant::now());
        assert!((report.rms - (0.5f32).sqrt()).abs() < 1e-6);
        assert_eq!(report.clip_samples, 2);
    }

    #[test]
    fn clip_level_is_inclusive_and_symmetric() {
        let mut meter = processor();
        let now = Instant::now();
        let report = meter.process(&[0.0, -0.6, 0.59], now);
        assert_eq!(report.clip_samples, 1);
        assert_eq!(report.clipped_at, Some(now));
    }

    #[test]
    fn nan_sample_does_not_poison_volume() {
        let mut meter = processor();
        let now = Instant::now();
        meter.process(&[0.5; 8], now);
        let report = meter.process(&[f32::NAN; 8], now);
        assert!(report.volume.is_finite());
        assert!(report.volume >= 0.0);
    }

    #[test]
    fn wall_clock_decay_follows_elapsed_time() {
        let cfg = MeterConfig {
            averaging: 0.5,
            decay: DecayMode::WallClock { reference_ms: 10 },
            ..MeterConfig::default()
        };
        let mut meter = FrameProcessor::new(&cfg);
        let start = Instant::now();
        meter.process(&[0.8; 16], start);
        // Two reference intervals of silence halve the volume twice in one frame.
        let report = meter.process(&[0.0; 16], start + Duration::from_millis(20));
        assert!((report.volume - 0.2).abs() < 1e-5, "got {}", report.volume);
    }

    #[test]
    fn live_meter_defaults_to_silent_and_stopped() {
        let meter = LiveMeter::new();
        assert_eq!(meter.volume(), 0.0);
        assert!(!meter.is_clipping());
        assert!(!meter.is_running());
    }

    #[test]
    fn live_meter_clones_share_snapshot() {
        let meter = LiveMeter::new();
        let reader = meter.clone();
        meter.publish(0.25, true);
        meter.set_running(true);
        assert_eq!(reader.volume(), 0.25);
        assert!(reader.is_clipping());
        assert!(reader.is_running());
        meter.reset();
        assert_eq!(reader.volume(), 0.0);
        assert!(!reader.is_running());
    }
}
