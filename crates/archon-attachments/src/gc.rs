//! Referential garbage collection (§4.5 `Delete`): enumerate live attachment
//! references first, then delete any stored blob not in that set.

use std::collections::BTreeSet;

use crate::error::AttachmentError;
use crate::store::AttachmentStore;

/// The outcome of a GC pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GcReport {
    /// Hashes that were (or, in a dry run, would be) removed.
    pub removed: Vec<String>,
    /// `true` if this was a dry run: `removed` lists candidates, nothing
    /// was actually deleted.
    pub dry_run: bool,
}

/// Delete every stored blob whose hash is not present in `live_hashes`.
///
/// # Errors
/// Propagates any I/O failure enumerating or deleting blobs.
pub fn collect(store: &AttachmentStore, live_hashes: &BTreeSet<String>, dry_run: bool) -> Result<GcReport, AttachmentError> {
    let mut removed = Vec::new();
    for hash in store.list_hashes()? {
        if live_hashes.contains(&hash) {
            continue;
        }
        if !dry_run {
            store.delete(&hash)?;
        }
        removed.push(hash);
    }
    tracing::info!(count = removed.len(), dry_run, "attachment gc pass complete");
    Ok(GcReport { removed, dry_run })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::DEFAULT_LFS_THRESHOLD;
    use chrono::Utc;
    use tempfile::tempdir;

    #[test]
    fn collect_removes_only_unreferenced_blobs() {
        let dir = tempdir().unwrap();
        let store = AttachmentStore::new(dir.path(), DEFAULT_LFS_THRESHOLD);
        let kept = store.store(b"kept", "a.txt", Utc::now()).unwrap();
        let orphan = store.store(b"orphan", "b.txt", Utc::now()).unwrap();

        let live: BTreeSet<String> = [kept.hash.clone()].into_iter().collect();
        let report = collect(&store, &live, false).unwrap();

        assert_eq!(report.removed, vec![orphan.hash.clone()]);
        assert!(store.retrieve(&kept.hash).is_ok());
        assert!(store.retrieve(&orphan.hash).is_err());
    }

    #[test]
    fn dry_run_reports_without_deleting() {
        let dir = tempdir().unwrap();
        let store = AttachmentStore::new(dir.path(), DEFAULT_LFS_THRESHOLD);
        let orphan = store.store(b"orphan", "b.txt", Utc::now()).unwrap();

        let report = collect(&store, &BTreeSet::new(), true).unwrap();

        assert_eq!(report.removed, vec![orphan.hash.clone()]);
        assert!(report.dry_run);
        assert!(store.retrieve(&orphan.hash).is_ok());
    }
}
