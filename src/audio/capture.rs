//! The meter state record: frame processor, clip hysteresis and the one-shot
//! trigger, updated only through `on_frame` and `on_tick`.

use super::clip::{ClipDetector, ClipTransition};
use super::meter::{FrameProcessor, FrameReport};
use super::trigger::{MeterEvents, OneShotTrigger};
use crate::config::MeterConfig;
use std::time::{Duration, Instant};

/// Counters collected during one lifecycle for observability.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionMetrics {
    pub frames_processed: usize,
    pub frames_dropped: usize,
    /// Number of `Clear -> Clipping` transitions.
    pub clip_entries: usize,
    pub clip_samples: usize,
    pub peak_volume: f32,
    pub fired: bool,
}

impl SessionMetrics {
    pub fn log_line(&self) -> String {
        format!(
            "meter_metrics|frames={}|dropped={}|clip_events={}|clip_samples={}|peak_volume={:.3}|fired={}",
            self.frames_processed,
            self.frames_dropped,
            self.clip_entries,
            self.clip_samples,
            self.peak_volume,
            self.fired
        )
    }
}

/// Single-writer state for one metering lifecycle.
#[derive(Debug, Clone)]
pub struct MeterCore {
    processor: FrameProcessor,
    detector: ClipDetector,
    trigger: OneShotTrigger,
    metrics: SessionMetrics,
}

impl MeterCore {
    pub fn new(config: &MeterConfig) -> Self {
        Self {
            processor: FrameProcessor::new(config),
            detector: ClipDetector::new(config.clip_lag()),
            trigger: OneShotTrigger::new(config.settle_delay()),
            metrics: SessionMetrics::default(),
        }
    }

    /// Process one audio frame observed at `now`, then evaluate level state.
    pub fn on_frame(
        &mut self,
        samples: &[f32],
        now: Instant,
        events: &dyn MeterEvents,
    ) -> FrameReport {
        let report = self.processor.process(samples, now);
        self.metrics.frames_processed += 1;
        self.metrics.peak_volume = self.metrics.peak_volume.max(report.volume);

        if let Some(at) = report.clipped_at {
            self.metrics.clip_samples += report.clip_samples;
            if self.detector.note_clip(at) == ClipTransition::Entered {
                self.metrics.clip_entries += 1;
                if self.trigger.arm(at) {
                    tracing::info!(volume = report.volume, "sustained input trigger armed");
                }
                tracing::debug!(volume = report.volume, "clip state entered");
            }
        }

        self.evaluate(now, events);
        report
    }

    /// Poll tick between frames: releases the latch and fires the trigger on time.
    pub fn on_tick(&mut self, now: Instant, events: &dyn MeterEvents) -> bool {
        self.evaluate(now, events)
    }

    fn evaluate(&mut self, now: Instant, events: &dyn MeterEvents) -> bool {
        if let Some(ClipTransition::Cleared) = self.detector.poll(now) {
            tracing::debug!("clip state cleared");
        }
        if self.trigger.take_due(now) {
            self.metrics.fired = true;
            tracing::info!(
                frames = self.metrics.frames_processed,
                "sustained loud input detected"
            );
            events.on_sustained_loud_input();
        }
        let clipping = self.detector.is_clipping(now);
        if clipping {
            events.on_loud();
        } else {
            events.on_quiet();
        }
        clipping
    }

    pub fn volume(&self) -> f32 {
        self.processor.volume()
    }

    pub fn is_clipping(&self, now: Instant) -> bool {
        self.detector.is_clipping(now)
    }

    pub fn has_fired(&self) -> bool {
        self.trigger.has_fired()
    }

    pub fn trigger_pending(&self) -> bool {
        self.trigger.is_pending()
    }

    pub fn metrics(&self) -> &SessionMetrics {
        &self.metrics
    }

    pub fn into_metrics(self) -> SessionMetrics {
        self.metrics
    }
}

/// Result of replaying recorded PCM through the meter.
#[derive(Debug, Clone, PartialEq)]
pub struct OfflineReport {
    /// Offset into the recording at which the one-shot fired.
    pub fired_at: Option<Duration>,
    /// `(start, end)` offsets of each clipping span; an open span ends at the recording's end.
    pub clip_spans: Vec<(Duration, Duration)>,
    pub final_volume: f32,
    pub metrics: SessionMetrics,
}

/// Run the meter against recorded mono PCM without a device.
///
/// Frames are timestamped from `sample_rate` as the hardware would deliver
/// them, and a poll tick runs every `config.tick_ms` in between, so the
/// result matches a live session fed the same audio.
pub fn offline_meter_from_pcm(
    samples: &[f32],
    sample_rate: u32,
    config: &MeterConfig,
) -> OfflineReport {
    let origin = Instant::now();
    let sample_rate = f64::from(sample_rate.max(1));
    let frame_size = config.frame_size.max(1);
    let tick = config.tick_interval().max(Duration::from_millis(1));
    let total = Duration::from_secs_f64(samples.len() as f64 / sample_rate);

    let mut core = MeterCore::new(config);
    let mut timeline = Timeline::default();
    let mut next_tick = Duration::ZERO;

    for (index, frame) in samples.chunks(frame_size).enumerate() {
        // A frame is delivered once its last sample has been captured.
        let end_sample = index * frame_size + frame.len();
        let offset = Duration::from_secs_f64(end_sample as f64 / sample_rate);
        while next_tick < offset {
            let clipping = core.on_tick(origin + next_tick, &SilentEvents);
            timeline.observe(&core, next_tick, clipping);
            next_tick += tick;
        }
        core.on_frame(frame, origin + offset, &SilentEvents);
        let clipping = core.is_clipping(origin + offset);
        timeline.observe(&core, offset, clipping);
    }
    while next_tick <= total {
        let clipping = core.on_tick(origin + next_tick, &SilentEvents);
        timeline.observe(&core, next_tick, clipping);
        next_tick += tick;
    }

    if let Some(start) = timeline.span_start.take() {
        timeline.clip_spans.push((start, total));
    }

    OfflineReport {
        fired_at: timeline.fired_at,
        clip_spans: timeline.clip_spans,
        final_volume: core.volume(),
        metrics: core.into_metrics(),
    }
}

struct SilentEvents;

impl MeterEvents for SilentEvents {
    fn on_sustained_loud_input(&self) {}
}

#[derive(Default)]
struct Timeline {
    fired_at: Option<Duration>,
    clip_spans: Vec<(Duration, Duration)>,
    span_start: Option<Duration>,
}

impl Timeline {
    fn observe(&mut self, core: &MeterCore, offset: Duration, clipping: bool) {
        if self.fired_at.is_none() && core.has_fired() {
            self.fired_at = Some(offset);
        }
        match (self.span_start, clipping) {
            (None, true) => self.span_start = Some(offset),
            (Some(start), false) => {
                self.clip_spans.push((start, offset));
                self.span_start = None;
            }
            _ => {}
        }
    }
}
