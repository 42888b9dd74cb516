//! Link metrics.

use metrics::counter;

/// Metric name constants.
pub mod names {
    /// Frames written to the device.
    pub const FRAMES_SENT_TOTAL: &str = "mova_link_frames_sent_total";

    /// Complete frames received from the device.
    pub const FRAMES_RECEIVED_TOTAL: &str = "mova_link_frames_received_total";

    /// Receive calls that hit their deadline.
    pub const TIMEOUTS_TOTAL: &str = "mova_link_timeouts_total";

    /// Background reader failures.
    pub const READER_FAILURES_TOTAL: &str = "mova_link_reader_failures_total";
}

pub fn record_frame_sent() {
    counter!(names::FRAMES_SENT_TOTAL).increment(1);
}

pub fn record_frame_received() {
    counter!(names::FRAMES_RECEIVED_TOTAL).increment(1);
}

pub fn record_timeout() {
    counter!(names::TIMEOUTS_TOTAL).increment(1);
}

pub fn record_reader_failure(kind: &str) {
    counter!(names::READER_FAILURES_TOTAL, "kind" => kind.to_string()).increment(1);
}
