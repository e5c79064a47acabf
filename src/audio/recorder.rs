//! System microphone input via CPAL.
//!
//! Handles device selection, sample format conversion and stream lifetime.
//! Frames reach the meter through the request's [`FrameSink`].

use super::source::{AudioSource, InputStream, OpenRequest};
use crate::error::MeterError;
use crate::log_debug;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{
    BuildStreamError, DefaultStreamConfigError, PlayStreamError, SampleFormat, StreamConfig,
    StreamError,
};

/// Audio input device wrapper and the default [`AudioSource`].
pub struct Recorder {
    device: cpal::Device,
}

impl Recorder {
    /// List microphone names so the CLI can expose a human-friendly selector.
    pub fn list_devices() -> Result<Vec<String>, MeterError> {
        let host = cpal::default_host();
        let devices = host
            .input_devices()
            .map_err(|err| MeterError::Unsupported(format!("no input devices available: {err}")))?;
        let mut names = Vec::new();
        for device in devices {
            if let Ok(name) = device.name() {
                names.push(name);
            }
        }
        Ok(names)
    }

    /// Create a recorder, optionally forcing a specific device so users can pick
    /// the right microphone when a laptop exposes multiple inputs.
    pub fn new(preferred_device: Option<&str>) -> Result<Self, MeterError> {
        let host = cpal::default_host();
        let device = match preferred_device {
            Some(name) => {
                let mut devices = host.input_devices().map_err(|err| {
                    MeterError::Unsupported(format!("no input devices available: {err}"))
                })?;
                devices
                    .find(|d| d.name().map(|n| n == name).unwrap_or(false))
                    .ok_or_else(|| denied(format!("input device '{name}' not found")))?
            }
            None => host
                .default_input_device()
                .ok_or_else(|| denied("no default input device available".to_string()))?,
        };
        Ok(Self { device })
    }

    /// Get the name of the active recording device.
    pub fn device_name(&self) -> String {
        self.device
            .name()
            .unwrap_or_else(|_| "Unknown Device".to_string())
    }
}

impl AudioSource for Recorder {
    fn open(&mut self, request: OpenRequest) -> Result<Box<dyn InputStream>, MeterError> {
        request.cancel.check()?;
        let default_config = self
            .device
            .default_input_config()
            .map_err(default_config_error)?;
        let format = default_config.sample_format();
        let device_config: StreamConfig = default_config.into();
        let channels = usize::from(device_config.channels.max(1));

        log_debug(&format!(
            "Recorder config: device={} format={format:?} sample_rate={}Hz channels={channels} frame={}",
            self.device_name(),
            device_config.sample_rate.0,
            request.frame_size
        ));

        // The error callback runs on the audio thread; forward device loss to
        // the worker so teardown happens on our side.
        let lost = request.sink.clone();
        let err_fn = move |err: StreamError| {
            if stream_error_ends_stream(&err) {
                log_debug(&format!("audio_stream_error: {err}"));
                lost.report_lost(err.to_string());
            } else {
                log_debug(&format!("audio_stream_error (continuing): {err}"));
                tracing::warn!(error = %err, "recoverable audio stream error");
            }
        };

        let sink = request.sink;
        let stream = match format {
            SampleFormat::F32 => self.device.build_input_stream(
                &device_config,
                move |data: &[f32], _| sink.push_interleaved(data, channels, |sample| sample),
                err_fn,
                None,
            ),
            SampleFormat::I16 => self.device.build_input_stream(
                &device_config,
                move |data: &[i16], _| {
                    sink.push_interleaved(data, channels, |sample| sample as f32 / 32_768.0)
                },
                err_fn,
                None,
            ),
            SampleFormat::U16 => self.device.build_input_stream(
                &device_config,
                move |data: &[u16], _| {
                    sink.push_interleaved(data, channels, |sample| {
                        (sample as f32 - 32_768.0) / 32_768.0
                    })
                },
                err_fn,
                None,
            ),
            other => {
                return Err(MeterError::Unsupported(format!(
                    "unsupported sample format: {other:?}"
                )))
            }
        }
        .map_err(build_stream_error)?;

        // Dropping the stream on these paths releases the device.
        request.cancel.check()?;
        stream.play().map_err(play_stream_error)?;
        request.cancel.check()?;

        Ok(Box::new(CpalStream {
            stream: Some(stream),
            released: false,
        }))
    }

    fn name(&self) -> String {
        self.device_name()
    }
}

struct CpalStream {
    stream: Option<cpal::Stream>,
    released: bool,
}

impl InputStream for CpalStream {
    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if let Some(stream) = self.stream.as_ref() {
            if let Err(err) = stream.pause() {
                log_debug(&format!("failed to pause audio stream: {err}"));
            }
        }
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            drop(stream);
            log_debug("audio stream closed");
        }
    }
}

impl Drop for CpalStream {
    fn drop(&mut self) {
        self.release();
        self.close();
    }
}

fn denied(reason: String) -> MeterError {
    MeterError::PermissionDenied(format!("{reason}. {}", mic_permission_hint()))
}

fn default_config_error(err: DefaultStreamConfigError) -> MeterError {
    match err {
        DefaultStreamConfigError::StreamTypeNotSupported => {
            MeterError::Unsupported("device cannot capture audio input".to_string())
        }
        other => denied(format!("cannot read input config: {other}")),
    }
}

fn build_stream_error(err: BuildStreamError) -> MeterError {
    match err {
        BuildStreamError::StreamConfigNotSupported | BuildStreamError::InvalidArgument => {
            MeterError::Unsupported(format!("cannot build input stream: {err}"))
        }
        other => denied(format!("cannot open input stream: {other}")),
    }
}

/// Only a vanished device ends the stream; backends keep delivering after xruns.
fn stream_error_ends_stream(err: &StreamError) -> bool {
    matches!(err, StreamError::DeviceNotAvailable)
}

fn play_stream_error(err: PlayStreamError) -> MeterError {
    denied(format!("cannot start input stream: {err}"))
}

pub fn mic_permission_hint() -> &'static str {
    #[cfg(target_os = "macos")]
    {
        "macOS: System Settings > Privacy & Security > Microphone (enable your terminal)."
    }
    #[cfg(target_os = "linux")]
    {
        "Linux: check PipeWire/PulseAudio permissions and ensure the device is not muted."
    }
    #[cfg(target_os = "windows")]
    {
        "Windows: Settings > Privacy & Security > Microphone (allow access for your terminal)."
    }
    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    {
        "Check OS microphone permissions."
    }
}
