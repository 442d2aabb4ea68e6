//! Vision error types.

use thiserror::Error;

/// Result type for vision operations.
pub type VisionResult<T> = Result<T, VisionError>;

/// Errors that can occur during capture, detection, or encoding.
#[derive(Debug, Error)]
pub enum VisionError {
    /// The capture device could not be opened. Fatal at startup.
    #[error("Capture device unavailable: {0}")]
    DeviceUnavailable(String),

    /// A single capture cycle failed. The previous frame is retained.
    #[error("Capture failed: {0}")]
    Capture(String),

    #[error("Detection failed: {0}")]
    Detection(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Encoding failed: {0}")]
    Encode(String),
}

impl VisionError {
    pub fn device_unavailable(msg: impl Into<String>) -> Self {
        Self::DeviceUnavailable(msg.into())
    }

    pub fn capture(msg: impl Into<String>) -> Self {
        Self::Capture(msg.into())
    }

    pub fn detection(msg: impl Into<String>) -> Self {
        Self::Detection(msg.into())
    }
}
