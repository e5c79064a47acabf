//! Error types surfaced by the meter and its stream acquirer.

use thiserror::Error;

/// Failures the caller can see.
///
/// `PermissionDenied` and `StreamLost` are recoverable: the caller tears down
/// and prompts again by calling `start()`. `Unsupported` means the microphone
/// path should be disabled in favour of a manual trigger.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MeterError {
    /// The user declined, or no usable input device/permission API exists.
    #[error("microphone permission denied: {0}")]
    PermissionDenied(String),

    /// The audio subsystem is missing or cannot deliver a usable format.
    #[error("audio input unsupported: {0}")]
    Unsupported(String),

    /// The live stream ended on its own (device removed, driver reset).
    #[error("audio stream lost: {0}")]
    StreamLost(String),

    /// The caller abandoned the wait for a permission grant.
    #[error("microphone request cancelled")]
    Cancelled,

    #[error("invalid meter configuration: {0}")]
    InvalidConfig(String),
}

impl MeterError {
    /// True when the right reaction is to tear down and ask for the microphone again.
    pub fn needs_reprompt(&self) -> bool {
        matches!(
            self,
            MeterError::PermissionDenied(_) | MeterError::StreamLost(_)
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            MeterError::PermissionDenied(_) => "permission_denied",
            MeterError::Unsupported(_) => "unsupported",
            MeterError::StreamLost(_) => "stream_lost",
            MeterError::Cancelled => "cancelled",
            MeterError::InvalidConfig(_) => "invalid_config",
        }
    }
}
