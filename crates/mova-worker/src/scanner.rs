//! Discovery of pending sessions under the sessions root.

use std::path::{Path, PathBuf};

use mova_models::JobStatus;
use tracing::{debug, warn};

use crate::error::WorkerResult;
use crate::store::JobStore;

/// Session directories whose record is `pending`, sorted by name.
///
/// Entries that are not directories, have no `job.json`, or hold a record
/// that does not parse are skipped. A missing root yields no sessions.
pub fn find_pending_sessions(root: &Path) -> WorkerResult<Vec<PathBuf>> {
    let entries = match std::fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(root = %root.display(), "Sessions directory does not exist yet");
            return Ok(Vec::new());
        }
        Err(e) => return Err(e.into()),
    };

    let mut pending = Vec::new();
    for entry in entries {
        let entry = entry?;
        let dir = entry.path();
        if !dir.is_dir() {
            continue;
        }

        let store = JobStore::for_session(&dir);
        if !store.path().is_file() {
            continue;
        }

        match store.load() {
            Ok(record) if record.status == JobStatus::Pending => pending.push(dir),
            Ok(_) => {}
            Err(e) => {
                warn!(session = %dir.display(), "Skipping unreadable job record: {}", e);
            }
        }
    }

    pending.sort();
    Ok(pending)
}

/// Directory name used as the session ID in logs.
pub fn session_id(dir: &Path) -> String {
    dir.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| dir.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn session(root: &Path, name: &str, job: Option<&str>) -> PathBuf {
        let dir = root.join(name);
        std::fs::create_dir_all(&dir).unwrap();
        if let Some(job) = job {
            std::fs::write(dir.join("job.json"), job).unwrap();
        }
        dir
    }

    #[test]
    fn test_finds_only_pending_sessions_in_order() {
        let root = TempDir::new().unwrap();
        session(root.path(), "c", Some(r#"{"status":"pending"}"#));
        session(root.path(), "a", Some(r#"{"status":"pending","note":"x"}"#));
        session(root.path(), "b", Some(r#"{"status":"done","processed_frames":10}"#));
        session(root.path(), "d", Some("garbage"));
        session(root.path(), "e", None);
        std::fs::write(root.path().join("stray.json"), r#"{"status":"pending"}"#).unwrap();

        let found = find_pending_sessions(root.path()).unwrap();
        let names: Vec<String> = found.iter().map(|p| session_id(p)).collect();
        assert_eq!(names, vec!["a", "c"]);
    }

    #[test]
    fn test_missing_root_is_empty() {
        let root = TempDir::new().unwrap();
        let found = find_pending_sessions(&root.path().join("nope")).unwrap();
        assert!(found.is_empty());
    }
}
