//! Plays recorded mono frames into the meter as if a device delivered them.

use super::source::{AudioSource, InputStream, OpenRequest};
use crate::error::MeterError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// What the replay does once every frame has been delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplayEnd {
    /// Keep the stream open but silent, like a muted microphone.
    #[default]
    Hold,
    /// Report the stream as lost, like an unplugged device.
    Lost,
}

#[derive(Debug, Clone)]
pub struct ReplaySource {
    samples: Vec<f32>,
    pace: Option<Duration>,
    end: ReplayEnd,
}

impl ReplaySource {
    pub fn new(samples: Vec<f32>) -> Self {
        Self {
            samples,
            pace: None,
            end: ReplayEnd::Hold,
        }
    }

    /// Build a replay from whole frames.
    pub fn from_frames<I>(frames: I) -> Self
    where
        I: IntoIterator<Item = Vec<f32>>,
    {
        Self::new(frames.into_iter().flatten().collect())
    }

    /// Sleep this long between delivered frames.
    pub fn paced(mut self, pace: Duration) -> Self {
        self.pace = Some(pace);
        self
    }

    pub fn ending_with(mut self, end: ReplayEnd) -> Self {
        self.end = end;
        self
    }
}

impl AudioSource for ReplaySource {
    fn open(&mut self, request: OpenRequest) -> Result<Box<dyn InputStream>, MeterError> {
        request.cancel.check()?;
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = stop.clone();
        let samples = self.samples.clone();
        let pace = self.pace;
        let end = self.end;
        let sink = request.sink;
        let frame_size = request.frame_size.max(1);

        let handle = thread::Builder::new()
            .name("blowout-replay".to_string())
            .spawn(move || {
                for frame in samples.chunks(frame_size) {
                    if stop_flag.load(Ordering::Acquire) {
                        return;
                    }
                    sink.push_samples(frame);
                    if let Some(pace) = pace {
                        thread::sleep(pace);
                    }
                }
                if end == ReplayEnd::Lost && !stop_flag.load(Ordering::Acquire) {
                    sink.report_lost("replay finished");
                }
            })
            .map_err(|err| MeterError::Unsupported(format!("cannot spawn replay thread: {err}")))?;

        Ok(Box::new(ReplayStream {
            stop,
            handle: Some(handle),
        }))
    }

    fn name(&self) -> String {
        "replay".to_string()
    }
}

struct ReplayStream {
    stop: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl InputStream for ReplayStream {
    fn release(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }

    fn close(&mut self) {}
}

impl Drop for ReplayStream {
    fn drop(&mut self) {
        self.release();
    }
}
