//! Shared data models for the movement analyzer.
//!
//! This crate provides Serde-serializable types for:
//! - The persisted job record and its status lifecycle
//! - The analytics record written at session completion
//! - Hot-zone labels and per-zone energy snapshots

pub mod analytics;
pub mod error;
pub mod job_status;
pub mod zone;

// Re-export common types
pub use analytics::{
    round_dp, AnalyticsRecord, IntensitySummary, RepetitionSummary, Resolution, TimelineSample,
    ZoneTimelineEntry,
};
pub use error::{ModelError, ModelResult};
pub use job_status::{JobRecord, JobStatus, JobUpdate};
pub use zone::{ZoneLabel, ZoneSnapshot};
