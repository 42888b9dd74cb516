//! Worker metrics and the optional Prometheus exporter.

use std::net::{Ipv4Addr, SocketAddrV4};

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use mova_models::JobStatus;

use crate::error::{WorkerError, WorkerResult};

/// Metric names as constants for consistency.
pub mod names {
    pub const FRAMES_PROCESSED_TOTAL: &str = "mova_frames_processed_total";
    pub const SESSIONS_TOTAL: &str = "mova_sessions_total";
    pub const SESSION_DURATION_SECONDS: &str = "mova_session_duration_seconds";
    pub const PENDING_SESSIONS: &str = "mova_pending_sessions";
}

/// Install the Prometheus recorder with an HTTP listener on `port`.
pub fn init_metrics(port: u16) -> WorkerResult<()> {
    PrometheusBuilder::new()
        .with_http_listener(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port))
        .install()
        .map_err(|e| WorkerError::config_error(format!("metrics exporter: {e}")))
}

pub fn record_frames_processed(count: u64) {
    counter!(names::FRAMES_PROCESSED_TOTAL).increment(count);
}

/// Record a session reaching a terminal status.
pub fn record_session(status: JobStatus, duration_secs: f64) {
    counter!(names::SESSIONS_TOTAL, "status" => status.as_str()).increment(1);
    histogram!(names::SESSION_DURATION_SECONDS, "status" => status.as_str()).record(duration_secs);
}

pub fn set_pending_sessions(count: usize) {
    gauge!(names::PENDING_SESSIONS).set(count as f64);
}
