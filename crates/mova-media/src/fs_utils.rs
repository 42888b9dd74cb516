//! Filesystem utilities for session artifacts.
//!
//! Records are replaced atomically: the new content goes to a temp file in
//! the destination directory, which is then renamed over the target. A
//! reader therefore sees either the old or the new file, never a torn one.

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tempfile::NamedTempFile;

use crate::error::{MediaError, MediaResult};

/// Atomically replace `dst` with `contents`.
///
/// # Errors
///
/// Returns an error if the parent directory can't be created or the temp
/// file can't be written or renamed.
pub fn write_atomic(dst: impl AsRef<Path>, contents: &[u8]) -> MediaResult<()> {
    let dst = dst.as_ref();
    let parent = match dst.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    if !parent.exists() {
        std::fs::create_dir_all(parent)?;
    }

    let mut tmp = NamedTempFile::new_in(parent)?;
    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;
    tmp.persist(dst).map_err(|e| {
        tracing::error!("Failed to persist {}: {}", dst.display(), e.error);
        MediaError::from(e.error)
    })?;

    Ok(())
}

/// Atomically replace `dst` with pretty-printed JSON.
pub fn write_json_atomic<T: Serialize>(dst: impl AsRef<Path>, value: &T) -> MediaResult<()> {
    let bytes = serde_json::to_vec_pretty(value)?;
    write_atomic(dst, &bytes)
}

/// Delete a file, treating "already gone" as success.
///
/// Returns whether a file was removed.
pub fn remove_if_exists(path: impl AsRef<Path>) -> MediaResult<bool> {
    match std::fs::remove_file(path.as_ref()) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(MediaError::from(e)),
    }
}

/// True if `path` is a regular file with at least one byte.
pub fn is_nonempty_file(path: impl AsRef<Path>) -> bool {
    std::fs::metadata(path.as_ref())
        .map(|m| m.is_file() && m.len() > 0)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_atomic_replaces_content() {
        let dir = TempDir::new().unwrap();
        let dst = dir.path().join("job.json");

        write_atomic(&dst, b"old").unwrap();
        write_atomic(&dst, b"new content").unwrap();

        assert_eq!(std::fs::read_to_string(&dst).unwrap(), "new content");
        // No temp files left behind
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_write_atomic_creates_parent() {
        let dir = TempDir::new().unwrap();
        let dst = dir.path().join("session-1").join("analytics.json");

        write_json_atomic(&dst, &serde_json::json!({"fps": 30.0})).unwrap();

        let value: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&dst).unwrap()).unwrap();
        assert_eq!(value["fps"], 30.0);
    }

    #[test]
    fn test_remove_if_exists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("heatmap.webm");

        assert!(!remove_if_exists(&path).unwrap());
        std::fs::write(&path, b"x").unwrap();
        assert!(remove_if_exists(&path).unwrap());
        assert!(!path.exists());
    }

    #[test]
    fn test_is_nonempty_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("heatmap.webm");

        assert!(!is_nonempty_file(&path));
        std::fs::write(&path, b"").unwrap();
        assert!(!is_nonempty_file(&path));
        std::fs::write(&path, b"webm").unwrap();
        assert!(is_nonempty_file(&path));
        assert!(!is_nonempty_file(dir.path()));
    }
}
