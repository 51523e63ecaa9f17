//! The snapshot sidecar (§4.4): a best-effort JSON mirror of a snapshot's
//! full record, so `list`/`get` don't have to reconstruct everything from a
//! git tag. Its absence never invalidates the snapshot — the tag is the
//! source of truth.

use std::fs;
use std::io;
use std::path::Path;

use crate::model::layout::snapshot_sidecar_path;
use crate::model::snapshot::SnapshotRecord;

/// Write `record`'s sidecar file, creating parent directories as needed.
///
/// # Errors
/// Returns an `io::Error` if serialization or the atomic write fails.
pub fn write(root: &Path, record: &SnapshotRecord) -> io::Result<()> {
    let path = snapshot_sidecar_path(root, record.name.as_str());
    let json = serde_json::to_string_pretty(record)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    crate::model::layout::atomic_write(&path, json.as_bytes())
}

/// Read a snapshot's sidecar file, if present.
///
/// Returns `Ok(None)` if the file does not exist; a malformed sidecar is
/// treated the same way — a read failure here must never block the caller
/// from falling back to the tag itself.
#[must_use]
pub fn read(root: &Path, name: &str) -> Option<SnapshotRecord> {
    let path = snapshot_sidecar_path(root, name);
    let raw = fs::read_to_string(path).ok()?;
    serde_json::from_str(&raw).ok()
}

/// Delete a snapshot's sidecar file, if present. No-op if it doesn't exist.
///
/// # Errors
/// Returns an `io::Error` for failures other than "file not found".
pub fn delete(root: &Path, name: &str) -> io::Result<()> {
    let path = snapshot_sidecar_path(root, name);
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ids::SnapshotName;
    use chrono::Utc;
    use tempfile::tempdir;

    fn record(name: &str) -> SnapshotRecord {
        SnapshotRecord {
            name: SnapshotName::new(name).unwrap(),
            hash: "a".repeat(40),
            message: "msg".to_owned(),
            description: None,
            labels: Default::default(),
            metadata: serde_json::json!({}),
            created_at: Utc::now(),
            author: "Alice <alice@example.com>".to_owned(),
        }
    }

    #[test]
    fn write_then_read_round_trips() {
        let dir = tempdir().unwrap();
        let rec = record("v1");
        write(dir.path(), &rec).unwrap();
        let loaded = read(dir.path(), "v1").unwrap();
        assert_eq!(loaded, rec);
    }

    #[test]
    fn read_missing_returns_none() {
        let dir = tempdir().unwrap();
        assert!(read(dir.path(), "nope").is_none());
    }

    #[test]
    fn delete_is_idempotent() {
        let dir = tempdir().unwrap();
        let rec = record("v1");
        write(dir.path(), &rec).unwrap();
        delete(dir.path(), "v1").unwrap();
        assert!(read(dir.path(), "v1").is_none());
        delete(dir.path(), "v1").unwrap();
    }
}
