//! Error types
//!
//! Recoverable failures only. Contract violations (bad dimensions, crop
//! rectangles outside a buffer, removing a sink that was never added) panic.

use thiserror::Error;

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type
#[derive(Debug, Error)]
pub enum Error {
    /// Pixel memory could not be allocated
    #[error("failed to allocate {bytes} bytes of pixel memory")]
    Allocation { bytes: usize },

    /// Codec failure
    #[error("encoder error: {0}")]
    Encoder(#[from] EncoderError),

    /// Capture device failure
    #[error("capture device error: {0}")]
    Device(#[from] DeviceError),

    /// An actor's queue has shut down
    #[error("{0} is no longer running")]
    ActorClosed(&'static str),
}

/// Errors reported by a [`VideoEncoder`](crate::encoder::VideoEncoder)
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EncoderError {
    /// `init` rejected the codec parameters
    #[error("init failed: {0}")]
    InitFailed(String),

    /// A single frame could not be encoded
    #[error("encode failed: {0}")]
    EncodeFailed(String),

    /// `encode` was called before a successful `init`
    #[error("encoder not initialized")]
    Uninitialized,
}

/// Errors reported by a [`CaptureDevice`](crate::capture::CaptureDevice)
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeviceError {
    /// The device cannot deliver the requested parameters
    #[error("unsupported capture parameters: {0}")]
    Unsupported(String),

    /// `read` was called while the device is stopped
    #[error("device not started")]
    NotStarted,

    /// The device went away or returned garbage
    #[error("read failed: {0}")]
    ReadFailed(String),

    /// End of stream
    #[error("end of stream")]
    Eof,
}
