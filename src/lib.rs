//! Microphone level meter and "blow out the candle" detector.
//!
//! [`BlowDetector`] owns a capture stream and reports a smoothed volume plus a
//! debounced clipping state. After clipping has lasted the settle delay it
//! fires [`audio::MeterEvents::on_sustained_loud_input`] once per lifecycle.

pub mod audio;
pub mod clock;
pub mod config;
pub mod detector;
pub mod error;

mod app;
mod lock;
mod telemetry;

pub(crate) use lock::lock_or_recover;
pub use app::logging::{crash_log_path, init_logging, log_debug, log_file_path, log_panic};
pub use detector::BlowDetector;
pub use error::MeterError;
pub use telemetry::{init_tracing, tracing_log_path};
