//! Structured session logging.
//!
//! Every event carries the session directory name and the edge mode, so a
//! device session can be followed frame by frame in JSON logs.

use tracing::{debug, error, info, warn, Span};

use crate::config::EdgeMode;
use crate::error::WorkerError;

/// Logger bound to one session run.
#[derive(Debug, Clone)]
pub struct JobLogger {
    session_id: String,
    edge_mode: EdgeMode,
}

impl JobLogger {
    pub fn new(session_id: &str, edge_mode: EdgeMode) -> Self {
        Self {
            session_id: session_id.to_string(),
            edge_mode,
        }
    }

    pub fn log_start(&self) {
        info!(
            session = %self.session_id,
            edge_mode = %self.edge_mode,
            "Session started"
        );
    }

    /// Source geometry once the decoder is open.
    pub fn log_stream(&self, width: u32, height: u32, fps: f64, total_frames: u64) {
        info!(
            session = %self.session_id,
            width,
            height,
            fps,
            total_frames,
            "Source video opened"
        );
    }

    /// Device link handed to the session.
    pub fn log_device_link(&self, link: &str, width: u32, height: u32) {
        info!(
            session = %self.session_id,
            link = %link,
            device_width = width,
            device_height = height,
            "Device link ready"
        );
    }

    pub fn log_frame_progress(&self, frame: u64, processed: u64, total: u64) {
        debug!(
            session = %self.session_id,
            frame,
            processed,
            total,
            "Progress written"
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(session = %self.session_id, "Session warning: {}", message);
    }

    /// Failure with the frame it happened at, when known.
    pub fn log_failure(&self, err: &WorkerError, processed: u64) {
        error!(
            session = %self.session_id,
            edge_mode = %self.edge_mode,
            frame = err.frame_index(),
            device_timeout = err.is_timeout(),
            processed,
            "Session failed: {}", err
        );
    }

    pub fn log_completion(&self, frames: u64, peak: f64, peak_frame: u64) {
        info!(
            session = %self.session_id,
            frames,
            peak_intensity = peak,
            peak_frame,
            "Session completed"
        );
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn edge_mode(&self) -> EdgeMode {
        self.edge_mode
    }

    /// Span covering the whole session run.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "session",
            session = %self.session_id,
            edge_mode = %self.edge_mode
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_logger_creation() {
        let logger = JobLogger::new("2024-05-01_squats", EdgeMode::Device);
        assert_eq!(logger.session_id(), "2024-05-01_squats");
        assert_eq!(logger.edge_mode(), EdgeMode::Device);
    }

    #[test]
    fn test_failure_logging_without_subscriber() {
        let logger = JobLogger::new("lost-link", EdgeMode::Device);
        logger.log_failure(
            &WorkerError::LinkLost {
                frame: 4,
                message: "Link reader stopped: broken pipe".to_string(),
            },
            4,
        );
        logger.log_failure(&WorkerError::OutputEmpty, 0);
    }
}
