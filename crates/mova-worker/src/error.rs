//! Worker error types.

use std::path::PathBuf;

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Input video not found: {0}")]
    InputNotFound(PathBuf),

    #[error("Device connection failed: {0}")]
    DeviceUnavailable(String),

    #[error("Device timeout at frame {frame}")]
    FrameTimeout { frame: u64 },

    #[error("Device link lost at frame {frame}: {message}")]
    LinkLost { frame: u64, message: String },

    #[error("Failed to create output video: {0}")]
    OutputFailed(String),

    #[error("Output video empty")]
    OutputEmpty,

    #[error("Processing failed: {0}")]
    ProcessingFailed(String),

    #[error("Job store error: {0}")]
    Store(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Link error: {0}")]
    Link(#[from] mova_link::LinkError),

    #[error("Media error: {0}")]
    Media(#[from] mova_media::MediaError),

    #[error("Model error: {0}")]
    Model(#[from] mova_models::ModelError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl WorkerError {
    pub fn device_unavailable(msg: impl Into<String>) -> Self {
        Self::DeviceUnavailable(msg.into())
    }

    pub fn output_failed(msg: impl Into<String>) -> Self {
        Self::OutputFailed(msg.into())
    }

    pub fn processing_failed(msg: impl Into<String>) -> Self {
        Self::ProcessingFailed(msg.into())
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Map a link failure during the exchange of frame `frame`.
    pub fn from_exchange(frame: u64, err: mova_link::LinkError) -> Self {
        if err.is_timeout() {
            Self::FrameTimeout { frame }
        } else {
            Self::LinkLost {
                frame,
                message: err.to_string(),
            }
        }
    }

    /// Frame a device exchange failed at.
    pub fn frame_index(&self) -> Option<u64> {
        match self {
            WorkerError::FrameTimeout { frame } | WorkerError::LinkLost { frame, .. } => Some(*frame),
            _ => None,
        }
    }

    /// Check if the device stopped answering mid-session.
    pub fn is_timeout(&self) -> bool {
        matches!(self, WorkerError::FrameTimeout { .. })
    }

    /// Human-readable cause written into the job record.
    pub fn session_failure_message(&self) -> String {
        match self {
            WorkerError::InputNotFound(_) => "Original video not found".to_string(),
            WorkerError::OutputEmpty => "Output video empty".to_string(),
            WorkerError::Link(e) => format!("Device connection failed: {e}"),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_exchange_timeout_keeps_frame_index() {
        let err = WorkerError::from_exchange(
            42,
            mova_link::LinkError::Timeout {
                timeout: Duration::from_secs(5),
                buffered: 100,
            },
        );
        assert!(err.is_timeout());
        assert_eq!(err.frame_index(), Some(42));
        assert_eq!(err.session_failure_message(), "Device timeout at frame 42");
    }

    #[test]
    fn test_exchange_reader_failure() {
        let err = WorkerError::from_exchange(
            3,
            mova_link::LinkError::ReaderStopped("broken pipe".into()),
        );
        assert!(!err.is_timeout());
        assert_eq!(err.frame_index(), Some(3));
        assert!(err
            .session_failure_message()
            .starts_with("Device link lost at frame 3"));
    }

    #[test]
    fn test_failure_messages() {
        assert_eq!(
            WorkerError::InputNotFound(PathBuf::from("/x/original.webm")).session_failure_message(),
            "Original video not found"
        );
        assert_eq!(WorkerError::OutputEmpty.session_failure_message(), "Output video empty");
        assert_eq!(WorkerError::OutputEmpty.frame_index(), None);

        let link = WorkerError::from(mova_link::LinkError::DeviceNotFound(PathBuf::from(
            "/dev/ttyUSB9",
        )));
        assert_eq!(
            link.session_failure_message(),
            "Device connection failed: Serial device not found: /dev/ttyUSB9"
        );
    }
}
