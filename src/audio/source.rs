//! Stream acquisition seam: how the meter obtains and releases live input.

use super::dispatch::FrameSink;
use crate::error::MeterError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Lets another thread abandon a pending microphone request.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// `Err(Cancelled)` once cancelled, so acquirers can `?` around blocking calls.
    pub fn check(&self) -> Result<(), MeterError> {
        if self.is_cancelled() {
            Err(MeterError::Cancelled)
        } else {
            Ok(())
        }
    }

    pub(crate) fn reset(&self) {
        self.cancelled.store(false, Ordering::Release);
    }
}

/// Everything an acquirer needs to open a stream for one lifecycle.
pub struct OpenRequest {
    /// Samples per frame the meter expects.
    pub frame_size: usize,
    /// Where the stream's callback delivers audio.
    pub sink: FrameSink,
    /// Checked around any call that may wait on the user.
    pub cancel: CancelToken,
}

/// Obtains live microphone input.
///
/// `open` may block while the platform asks the user for consent. It must
/// return `MeterError::Cancelled` when `request.cancel` fires during that
/// wait, and must keep nothing alive on any error path.
pub trait AudioSource {
    fn open(&mut self, request: OpenRequest) -> Result<Box<dyn InputStream>, MeterError>;

    fn name(&self) -> String {
        "audio input".to_string()
    }
}

/// A granted, delivering stream.
///
/// Both calls must be idempotent; teardown may run them more than once.
pub trait InputStream {
    /// Stop delivery and release the input tracks.
    fn release(&mut self);

    /// Close the underlying engine context.
    fn close(&mut self);
}
