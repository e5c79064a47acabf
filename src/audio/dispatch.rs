use crate::clock::Clock;
use crate::lock_or_recover;
use crossbeam_channel::{Sender, TrySendError};
use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc, Mutex,
};
use std::time::Instant;

/// One fixed-size mono frame, stamped when the callback completed it.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Frame {
    pub(crate) captured_at: Instant,
    pub(crate) samples: Vec<f32>,
}

/// Out-of-band notices from a stream to the meter worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum StreamSignal {
    Lost(String),
}

/// Keep only the first channel of interleaved input, converting as we go.
pub(super) fn append_first_channel<T, F>(
    buf: &mut Vec<f32>,
    data: &[T],
    channels: usize,
    convert: F,
) where
    T: Copy,
    F: FnMut(T) -> f32,
{
    buf.extend(data.iter().step_by(channels.max(1)).copied().map(convert));
}

/// Re-chunks whatever the hardware hands us into fixed-size frames.
pub(super) struct FrameDispatcher {
    frame_samples: usize,
    pending: Vec<f32>,
    scratch: Vec<f32>,
    sender: Sender<Frame>,
    clock: Arc<dyn Clock>,
    dropped: Arc<AtomicUsize>,
}

impl FrameDispatcher {
    pub(super) fn new(
        frame_samples: usize,
        sender: Sender<Frame>,
        clock: Arc<dyn Clock>,
        dropped: Arc<AtomicUsize>,
    ) -> Self {
        Self {
            frame_samples: frame_samples.max(1),
            pending: Vec::with_capacity(frame_samples),
            scratch: Vec::new(),
            sender,
            clock,
            dropped,
        }
    }

    pub(super) fn push<T, F>(&mut self, data: &[T], channels: usize, convert: F)
    where
        T: Copy,
        F: FnMut(T) -> f32,
    {
        self.scratch.clear();
        append_first_channel(&mut self.scratch, data, channels, convert);
        self.pending.extend_from_slice(&self.scratch);
        self.flush_full_frames();
    }

    fn flush_full_frames(&mut self) {
        if self.pending.len() < self.frame_samples {
            return;
        }
        // Every frame completed by this callback shares its arrival time.
        let captured_at = self.clock.now();
        while self.pending.len() >= self.frame_samples {
            let samples: Vec<f32> = self.pending.drain(..self.frame_samples).collect();
            let frame = Frame {
                captured_at,
                samples,
            };
            if let Err(err) = self.sender.try_send(frame) {
                match err {
                    TrySendError::Full(_) => {
                        self.dropped.fetch_add(1, Ordering::Relaxed);
                    }
                    TrySendError::Disconnected(_) => {
                        self.pending.clear();
                        break;
                    }
                }
            }
        }
    }
}

/// The processor binding handed to an input stream's callback.
///
/// Cloneable and callable from the audio thread; never blocks. Once detached,
/// every call is a silent no-op so late callbacks cannot reach the meter.
#[derive(Clone)]
pub struct FrameSink {
    frame_samples: usize,
    dispatcher: Arc<Mutex<FrameDispatcher>>,
    attached: Arc<AtomicBool>,
    dropped: Arc<AtomicUsize>,
    signals: Sender<StreamSignal>,
}

impl FrameSink {
    pub(crate) fn new(
        frame_samples: usize,
        frames: Sender<Frame>,
        signals: Sender<StreamSignal>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let dropped = Arc::new(AtomicUsize::new(0));
        let frame_samples = frame_samples.max(1);
        Self {
            frame_samples,
            dispatcher: Arc::new(Mutex::new(FrameDispatcher::new(
                frame_samples,
                frames,
                clock,
                dropped.clone(),
            ))),
            attached: Arc::new(AtomicBool::new(true)),
            dropped,
            signals,
        }
    }

    /// Feed interleaved hardware samples; only channel 0 is metered.
    pub fn push_interleaved<T, F>(&self, data: &[T], channels: usize, convert: F)
    where
        T: Copy,
        F: FnMut(T) -> f32,
    {
        if !self.is_attached() {
            return;
        }
        match self.dispatcher.try_lock() {
            Ok(mut pump) => pump.push(data, channels, convert),
            Err(_) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Feed mono samples already in `[-1, 1]`.
    pub fn push_samples(&self, samples: &[f32]) {
        self.push_interleaved(samples, 1, |sample| sample);
    }

    /// Tell the meter the stream died underneath it.
    pub fn report_lost(&self, reason: impl Into<String>) {
        if !self.is_attached() {
            return;
        }
        let _ = self.signals.try_send(StreamSignal::Lost(reason.into()));
    }

    pub fn is_attached(&self) -> bool {
        self.attached.load(Ordering::Acquire)
    }

    pub fn dropped_frames(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }

    pub(crate) fn detach(&self) {
        if self.attached.swap(false, Ordering::AcqRel) {
            let mut pump = lock_or_recover(&self.dispatcher, "frame_sink_detach");
            pump.pending.clear();
        }
    }
}
