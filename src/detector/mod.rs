//! Lifecycle manager: owns one metering session's stream, worker and timers,
//! and tears them down in a fixed order.
//!
//! A session runs a single worker thread that is the only writer of the
//! [`MeterCore`]. It waits on three inputs at once:
//!
//! - control: stop requests from [`BlowDetector::stop`]
//! - frames: audio from the stream callback via [`FrameSink`]
//! - tick: the poll timer that releases the clip latch between callbacks

use crate::audio::{
    AudioSource, CancelToken, Frame, FrameSink, InputStream, LiveMeter, MeterCore, MeterEvents,
    OpenRequest, SessionMetrics, StreamSignal,
};
use crate::clock::{Clock, SystemClock};
use crate::config::MeterConfig;
use crate::error::MeterError;
use crate::log_debug;
use crossbeam_channel::{bounded, select, tick, unbounded, Receiver, Sender};
use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};


/// Microphone blow detector.
///
/// Call [`start`](Self::start) after the user agrees to use the microphone,
/// then read [`current_volume`](Self::current_volume) for rendering. Events
/// are delivered on the worker thread through [`MeterEvents`].
pub struct BlowDetector<S: AudioSource> {
    source: S,
    events: Arc<dyn MeterEvents>,
    clock: Arc<dyn Clock>,
    live: LiveMeter,
    cancel: CancelToken,
    session: Option<Session>,
    last_metrics: Option<SessionMetrics>,
    log_timings: bool,
}

impl<S: AudioSource> BlowDetector<S> {
    pub fn new(source: S, events: Arc<dyn MeterEvents>) -> Self {
        Self::with_clock(source, events, Arc::new(SystemClock))
    }

    pub fn with_clock(source: S, events: Arc<dyn MeterEvents>, clock: Arc<dyn Clock>) -> Self {
        Self {
            source,
            events,
            clock,
            live: LiveMeter::new(),
            cancel: CancelToken::new(),
            session: None,
            last_metrics: None,
            log_timings: false,
        }
    }

    /// Log a `meter_metrics|...` summary when each session ends.
    pub fn log_timings(mut self, enabled: bool) -> Self {
        self.log_timings = enabled;
        self
    }

    /// Acquire the microphone and begin a fresh lifecycle.
    ///
    /// Any running session is torn down first, so the one-shot event can fire
    /// again. Blocks while the source waits for consent; another thread may
    /// abort that wait through [`canceller`](Self::canceller).
    pub fn start(&mut self, config: MeterConfig) -> Result<(), MeterError> {
        config.validate()?;
        self.stop();
        self.cancel.reset();

        let (frame_tx, frame_rx) = bounded::<Frame>(config.channel_capacity.max(1));
        let (signal_tx, signal_rx) = unbounded::<StreamSignal>();
        let sink = FrameSink::new(config.frame_size, frame_tx, signal_tx, self.clock.clone());

        let request = OpenRequest {
            frame_size: config.frame_size,
            sink: sink.clone(),
            cancel: self.cancel.clone(),
        };
        let mut stream = match self.source.open(request) {
            Ok(stream) => stream,
            Err(err) => {
                sink.detach();
                log_debug(&format!("microphone request failed: {err}"));
                tracing::warn!(reason = err.label(), "microphone request failed");
                return Err(err);
            }
        };
        if self.cancel.is_cancelled() {
            sink.detach();
            stream.release();
            stream.close();
            return Err(MeterError::Cancelled);
        }

        let (stop_tx, stop_rx) = bounded::<()>(1);
        let worker = MeterWorker {
            core: MeterCore::new(&config),
            frames: frame_rx,
            signals: signal_rx,
            stop: stop_rx,
            tick_every: config.tick_interval().max(Duration::from_millis(1)),
            clock: self.clock.clone(),
            events: self.events.clone(),
            live: self.live.clone(),
            sink: sink.clone(),
            lost_reported: Cell::new(false),
        };
        self.live.reset();
        self.live.set_running(true);
        let handle = match thread::Builder::new()
            .name("blowout-meter".to_string())
            .spawn(move || worker.run())
        {
            Ok(handle) => handle,
            Err(err) => {
                self.live.reset();
                sink.detach();
                stream.release();
                stream.close();
                return Err(MeterError::Unsupported(format!(
                    "cannot spawn meter worker: {err}"
                )));
            }
        };

        log_debug(&format!(
            "meter started: source={} frame_size={} clip_level={} clip_lag_ms={} settle_delay_ms={}",
            self.source.name(),
            config.frame_size,
            config.clip_level,
            config.clip_lag_ms,
            config.settle_delay_ms
        ));
        tracing::info!(source = %self.source.name(), "meter started");

        self.session = Some(Session {
            stop: stop_tx,
            worker: Some(handle),
            sink,
            stream,
        });
        Ok(())
    }

    /// End the lifecycle. Safe to call when stopped; events never arrive after it returns.
    pub fn stop(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        let metrics = session.teardown();
        self.live.reset();
        if self.log_timings {
            log_debug(&metrics.log_line());
        }
        tracing::info!(
            frames = metrics.frames_processed,
            dropped = metrics.frames_dropped,
            fired = metrics.fired,
            "meter stopped"
        );
        self.last_metrics = Some(metrics);
    }

    /// True while the worker is metering. Goes false on its own if the stream is lost.
    pub fn is_running(&self) -> bool {
        self.session.is_some() && self.live.is_running()
    }

    /// Smoothed volume in `[0, 1]`; zero when stopped.
    pub fn current_volume(&self) -> f32 {
        if !self.is_running() {
            return 0.0;
        }
        self.live.volume().clamp(0.0, 1.0)
    }

    /// Debounced clipping state, or `None` when no lifecycle is running.
    pub fn is_clipping(&self) -> Option<bool> {
        self.is_running().then(|| self.live.is_clipping())
    }

    /// Handle another thread can use to abandon a pending [`start`](Self::start).
    pub fn canceller(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Shared meter snapshot for a renderer running on another thread.
    pub fn live_meter(&self) -> LiveMeter {
        self.live.clone()
    }

    /// Counters from the most recently finished lifecycle.
    pub fn metrics(&self) -> Option<&SessionMetrics> {
        self.last_metrics.as_ref()
    }
}

impl<S: AudioSource> Drop for BlowDetector<S> {
    fn drop(&mut self) {
        self.stop();
    }
}

struct Session {
    stop: Sender<()>,
    worker: Option<thread::JoinHandle<SessionMetrics>>,
    sink: FrameSink,
    stream: Box<dyn InputStream>,
}

impl Session {
    /// Poll tick and pending one-shot go first, then the callback binding, then the device.
    fn teardown(mut self) -> SessionMetrics {
        let _ = self.stop.try_send(());
        let mut metrics = match self.worker.take().map(|handle| handle.join()) {
            Some(Ok(metrics)) => metrics,
            Some(Err(_)) => {
                log_debug("meter worker panicked during session");
                SessionMetrics::default()
            }
            None => SessionMetrics::default(),
        };
        self.sink.detach();
        self.stream.release();
        self.stream.close();
        metrics.frames_dropped = self.sink.dropped_frames();
        metrics
    }
}

struct MeterWorker {
    core: MeterCore,
    frames: Receiver<Frame>,
    signals: Receiver<StreamSignal>,
    stop: Receiver<()>,
    tick_every: Duration,
    clock: Arc<dyn Clock>,
    events: Arc<dyn MeterEvents>,
    live: LiveMeter,
    sink: FrameSink,
    lost_reported: Cell<bool>,
}

impl MeterWorker {
    fn run(mut self) -> SessionMetrics {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.pump()));
        self.live.set_running(false);
        if outcome.is_err() {
            self.on_worker_panic();
        }
        self.core.into_metrics()
    }

    fn pump(&mut self) {
        let ticker = tick(self.tick_every);
        let mut running = true;
        while running {
            // A stop that raced with a frame wins.
            if !self.stop.is_empty() {
                break;
            }
            select! {
                recv(self.stop) -> _ => running = false,
                recv(self.signals) -> signal => {
                    if let Ok(StreamSignal::Lost(reason)) = signal {
                        self.on_stream_lost(reason);
                    }
                    running = false;
                }
                recv(self.frames) -> frame => match frame {
                    Ok(frame) => {
                        self.core
                            .on_frame(&frame.samples, frame.captured_at, self.events.as_ref());
                        self.publish(self.clock.now());
                    }
                    Err(_) => running = false,
                },
                recv(ticker) -> _ => {
                    let now = self.clock.now();
                    self.core.on_tick(now, self.events.as_ref());
                    self.publish(now);
                }
            }
        }
    }

    fn publish(&self, now: Instant) {
        self.live.publish(self.core.volume(), self.core.is_clipping(now));
    }

    fn on_stream_lost(&self, reason: String) {
        self.sink.detach();
        let err = MeterError::StreamLost(reason);
        log_debug(&format!("meter stream lost: {err}"));
        tracing::warn!(reason = %err, "meter stream lost");
        self.lost_reported.set(true);
        self.events.on_stream_lost(&err);
    }

    /// A panicking event handler ends the lifecycle like a lost stream.
    fn on_worker_panic(&self) {
        self.sink.detach();
        log_debug("meter worker panicked during session");
        tracing::error!("meter worker panicked");
        if self.lost_reported.get() {
            return;
        }
        let err = MeterError::StreamLost("meter worker panicked".to_string());
        let events = self.events.as_ref();
        if panic::catch_unwind(AssertUnwindSafe(|| events.on_stream_lost(&err))).is_err() {
            log_debug("on_stream_lost panicked after worker failure");
        }
    }
}
