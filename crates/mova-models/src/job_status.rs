//! Persisted job record for a single analysis session.
//!
//! The record lives next to the session's video as `job.json` and is
//! shared with whatever created the session, so updates are merges: fields
//! this crate does not know about are carried through untouched.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ModelError, ModelResult};

/// Job processing status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Session created, waiting for a worker
    #[default]
    Pending,
    /// Frames are being processed
    Processing,
    /// Heatmap video and analytics written
    Done,
    /// Session failed; the record carries the cause
    Error,
}

impl JobStatus {
    /// Get string representation of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Done => "done",
            JobStatus::Error => "error",
        }
    }

    /// Check if this is a terminal state (no more updates expected).
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Error)
    }

    /// Whether a record in this status may move to `next`.
    ///
    /// `pending -> error` is allowed so input validation can fail a session
    /// before processing starts. Re-asserting `processing` is allowed for
    /// progress writes.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        match (self, next) {
            (JobStatus::Pending, JobStatus::Pending) => true,
            (JobStatus::Pending, JobStatus::Processing) => true,
            (JobStatus::Pending, JobStatus::Error) => true,
            (JobStatus::Processing, JobStatus::Processing) => true,
            (JobStatus::Processing, JobStatus::Done) => true,
            (JobStatus::Processing, JobStatus::Error) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The `job.json` record.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct JobRecord {
    /// Current status
    #[serde(default)]
    pub status: JobStatus,

    /// Frame count reported when processing started
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_frames: Option<u64>,

    /// Frames processed so far
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_frames: Option<u64>,

    /// Human-readable failure cause; only present with `status = error`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// When this worker last wrote the record
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,

    /// Fields owned by other writers
    #[serde(flatten)]
    #[schemars(skip)]
    pub extra: Map<String, Value>,
}

impl JobRecord {
    /// Create a fresh pending record.
    pub fn pending() -> Self {
        Self::default()
    }

    /// Check if the job is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Merge an update into this record, validating the status transition.
    pub fn apply(&mut self, update: &JobUpdate) -> ModelResult<()> {
        if let Some(next) = update.status {
            if !self.status.can_transition_to(next) {
                return Err(ModelError::InvalidTransition {
                    from: self.status,
                    to: next,
                });
            }
            self.status = next;
            if next != JobStatus::Error {
                self.error = None;
            }
        }
        if let Some(total) = update.total_frames {
            self.total_frames = Some(total);
        }
        if let Some(processed) = update.processed_frames {
            self.processed_frames = Some(processed);
        }
        if let Some(error) = &update.error {
            self.error = Some(error.clone());
        }
        self.updated_at = Some(Utc::now());
        Ok(())
    }

    /// Merge an update without transition checks.
    ///
    /// Used by the executor's last-resort failure path, where the record
    /// may be in any state.
    pub fn force_apply(&mut self, update: &JobUpdate) {
        if let Some(next) = update.status {
            self.status = next;
            if next != JobStatus::Error {
                self.error = None;
            }
        }
        if let Some(total) = update.total_frames {
            self.total_frames = Some(total);
        }
        if let Some(processed) = update.processed_frames {
            self.processed_frames = Some(processed);
        }
        if let Some(error) = &update.error {
            self.error = Some(error.clone());
        }
        self.updated_at = Some(Utc::now());
    }
}

/// A partial update; `None` fields leave the record untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobUpdate {
    pub status: Option<JobStatus>,
    pub total_frames: Option<u64>,
    pub processed_frames: Option<u64>,
    pub error: Option<String>,
}

impl JobUpdate {
    /// Move to `processing` with the initial counters.
    pub fn processing(total_frames: u64) -> Self {
        Self {
            status: Some(JobStatus::Processing),
            total_frames: Some(total_frames),
            processed_frames: Some(0),
            error: None,
        }
    }

    /// Progress counter only.
    pub fn progress(processed_frames: u64) -> Self {
        Self {
            processed_frames: Some(processed_frames),
            ..Default::default()
        }
    }

    /// Move to `done` with the final frame count.
    pub fn done(processed_frames: u64) -> Self {
        Self {
            status: Some(JobStatus::Done),
            processed_frames: Some(processed_frames),
            ..Default::default()
        }
    }

    /// Move to `error` with a cause.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: Some(JobStatus::Error),
            error: Some(message.into()),
            ..Default::default()
        }
    }
}
