//! Error types for link operations.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type for link operations.
pub type LinkResult<T> = Result<T, LinkError>;

/// Errors that can occur while talking to the external device.
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("Serial device not found: {0}")]
    DeviceNotFound(PathBuf),

    #[error("Failed to open {path}: {message}")]
    OpenFailed { path: PathBuf, message: String },

    #[error("Unsupported baud rate: {0}")]
    UnsupportedBaud(u32),

    #[error("Frame size mismatch: expected {expected} bytes, got {actual}")]
    FrameSize { expected: usize, actual: usize },

    #[error("No complete frame within {timeout:?} ({buffered} bytes buffered)")]
    Timeout { timeout: Duration, buffered: usize },

    #[error("Background reader stopped: {0}")]
    ReaderStopped(String),

    #[error("Transceiver is closed")]
    Closed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Termios error: {0}")]
    Termios(#[from] nix::Error),
}

impl LinkError {
    /// Create an open failure error.
    pub fn open_failed(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::OpenFailed {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Check if this is a receive timeout.
    ///
    /// Timeouts leave the transceiver usable; every other runtime error
    /// means the link is gone.
    pub fn is_timeout(&self) -> bool {
        matches!(self, LinkError::Timeout { .. })
    }
}
