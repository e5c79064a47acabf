//! Microphone level metering and blow detection.
//!
//! Audio arrives from an [`AudioSource`] through a [`FrameSink`], is folded
//! into a smoothed volume by the frame processor, and loud samples latch the
//! clip hysteresis. The first latch of a lifecycle arms a one-shot event.

mod capture;
mod clip;
mod dispatch;
mod meter;
mod recorder;
mod replay;
mod source;
mod trigger;

pub use capture::{offline_meter_from_pcm, MeterCore, OfflineReport, SessionMetrics};
pub use clip::{ClipDetector, ClipState, ClipTransition};
pub(crate) use dispatch::{Frame, StreamSignal};
pub use dispatch::FrameSink;
pub use meter::{FrameProcessor, FrameReport, LiveMeter};
pub use recorder::{mic_permission_hint, Recorder};
pub use replay::{ReplayEnd, ReplaySource};
pub use source::{AudioSource, CancelToken, InputStream, OpenRequest};
pub use trigger::{MeterEvents, OneShotTrigger};
