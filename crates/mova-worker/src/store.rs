//! File-backed job record.
//!
//! Every write is a read-modify-write merge: fields the worker does not
//! know about stay in the file, and the file is replaced atomically.

use std::path::{Path, PathBuf};

use mova_media::write_json_atomic;
use mova_models::{JobRecord, JobUpdate};
use tracing::{debug, warn};

use crate::error::{WorkerError, WorkerResult};

/// File name of the job record inside a session directory.
pub const JOB_FILE: &str = "job.json";

/// Reads and updates one session's `job.json`.
#[derive(Debug, Clone)]
pub struct JobStore {
    path: PathBuf,
}

impl JobStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store for the record inside `session_dir`.
    pub fn for_session(session_dir: &Path) -> Self {
        Self::new(session_dir.join(JOB_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and parse the record.
    pub fn load(&self) -> WorkerResult<JobRecord> {
        let bytes = std::fs::read(&self.path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Read the record, treating a missing or unreadable file as empty.
    pub fn load_or_default(&self) -> JobRecord {
        match self.load() {
            Ok(record) => record,
            Err(WorkerError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                JobRecord::default()
            }
            Err(e) => {
                warn!(path = %self.path.display(), "Unreadable job record, starting empty: {}", e);
                JobRecord::default()
            }
        }
    }

    /// Merge `update` with transition checks and persist.
    pub fn update(&self, update: &JobUpdate) -> WorkerResult<JobRecord> {
        let mut record = self.load_or_default();
        record.apply(update)?;
        self.persist(&record)?;
        Ok(record)
    }

    /// Merge `update` regardless of the current status and persist.
    pub fn force_update(&self, update: &JobUpdate) -> WorkerResult<JobRecord> {
        let mut record = self.load_or_default();
        record.force_apply(update);
        self.persist(&record)?;
        Ok(record)
    }

    fn persist(&self, record: &JobRecord) -> WorkerResult<()> {
        write_json_atomic(&self.path, record)
            .map_err(|e| WorkerError::store(format!("{}: {}", self.path.display(), e)))?;
        debug!(
            path = %self.path.display(),
            status = %record.status,
            processed = ?record.processed_frames,
            "Job record written"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mova_models::JobStatus;
    use tempfile::TempDir;

    #[test]
    fn test_update_keeps_unknown_fields() {
        let dir = TempDir::new().unwrap();
        let store = JobStore::for_session(dir.path());
        std::fs::write(
            store.path(),
            r#"{"status":"pending","exercise":"squat","created_by":"tablet-3"}"#,
        )
        .unwrap();

        let record = store.update(&JobUpdate::processing(120)).unwrap();
        assert_eq!(record.status, JobStatus::Processing);

        let raw: serde_json::Value =
            serde_json::from_slice(&std::fs::read(store.path()).unwrap()).unwrap();
        assert_eq!(raw["status"], "processing");
        assert_eq!(raw["total_frames"], 120);
        assert_eq!(raw["processed_frames"], 0);
        assert_eq!(raw["exercise"], "squat");
        assert_eq!(raw["created_by"], "tablet-3");
    }

    #[test]
    fn test_unreadable_record_merges_into_empty() {
        let dir = TempDir::new().unwrap();
        let store = JobStore::for_session(dir.path());
        std::fs::write(store.path(), b"{ not json").unwrap();

        assert!(store.load().is_err());
        let record = store.update(&JobUpdate::error("Original video not found")).unwrap();
        assert_eq!(record.status, JobStatus::Error);

        let reloaded = store.load().unwrap();
        assert_eq!(reloaded.error.as_deref(), Some("Original video not found"));
    }

    #[test]
    fn test_invalid_transition_is_not_written() {
        let dir = TempDir::new().unwrap();
        let store = JobStore::for_session(dir.path());
        store.update(&JobUpdate::processing(10)).unwrap();
        store.update(&JobUpdate::done(10)).unwrap();

        assert!(matches!(
            store.update(&JobUpdate::processing(10)),
            Err(WorkerError::Model(_))
        ));
        assert_eq!(store.load().unwrap().status, JobStatus::Done);

        let forced = store.force_update(&JobUpdate::error("worker crashed")).unwrap();
        assert_eq!(forced.status, JobStatus::Error);
    }

    #[test]
    fn test_progress_does_not_change_status() {
        let dir = TempDir::new().unwrap();
        let store = JobStore::for_session(dir.path());
        store.update(&JobUpdate::processing(30)).unwrap();
        let record = store.update(&JobUpdate::progress(20)).unwrap();
        assert_eq!(record.status, JobStatus::Processing);
        assert_eq!(record.processed_frames, Some(20));
        assert_eq!(record.total_frames, Some(30));
    }
}
