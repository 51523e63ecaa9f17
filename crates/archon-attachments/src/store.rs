//! Content-addressed attachment storage (S5, §4.5).
//!
//! Blobs live at `attachments/<prefix>/<hash>` under the project root, where
//! `<prefix>` is the first two hex characters of the SHA-256 hash (256-way
//! sharding). There is no metadata file alongside a blob: a hash is its own
//! identity, and `filename` is recorded by the caller, not by the store.

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AttachmentError;
use crate::hash::{self, HASH_LEN};

/// Attachments at or above this size are flagged `isLFS` (§4.5).
pub const DEFAULT_LFS_THRESHOLD: u64 = 1024 * 1024;

/// One stored attachment's metadata, as returned by [`AttachmentStore::store`].
///
/// Identity is `hash` alone; `filename` and `stored_at` reflect the call that
/// produced this record, not necessarily the call that first wrote the bytes
/// to disk (§4.5: two stores of the same bytes under different names yield
/// one file, with each caller getting back its own metadata).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AttachmentRecord {
    /// Lowercase hex SHA-256 of the stored bytes, 64 characters.
    pub hash: String,
    /// Size of the stored bytes.
    pub size: u64,
    /// Original filename, for display only.
    pub filename: String,
    /// Derived: `true` when `size >= lfs_threshold`.
    #[serde(rename = "isLFS")]
    pub is_lfs: bool,
    /// When this call stored (or re-encountered) the attachment.
    #[serde(rename = "storedAt")]
    pub stored_at: DateTime<Utc>,
}

/// A content-addressed blob store rooted at a project directory.
pub struct AttachmentStore {
    attachments_dir: PathBuf,
    lfs_threshold: u64,
}

impl AttachmentStore {
    /// Open a store under `project_root/attachments`.
    #[must_use]
    pub fn new(project_root: &Path, lfs_threshold: u64) -> Self {
        Self {
            attachments_dir: project_root.join("attachments"),
            lfs_threshold,
        }
    }

    fn path_for(&self, hash: &str) -> PathBuf {
        self.attachments_dir.join(hash::shard_prefix(hash)).join(hash)
    }

    /// Store `data` under its SHA-256 hash, recording `filename` as display
    /// metadata. If a blob with this hash already exists, the new bytes are
    /// discarded (dedup) and a fresh record is returned anyway.
    ///
    /// # Errors
    /// Returns [`AttachmentError::Io`] if the temp file, shard directory, or
    /// rename operation fails.
    pub fn store(&self, data: &[u8], filename: &str, now: DateTime<Utc>) -> Result<AttachmentRecord, AttachmentError> {
        self.store_reader(io::Cursor::new(data), filename, now)
    }

    /// Stream `reader` into the store, hashing incrementally so the whole
    /// blob never needs to be held in memory at once.
    ///
    /// # Errors
    /// Returns [`AttachmentError::Io`] if reading, writing, or the final
    /// rename fails.
    pub fn store_reader<R: Read>(&self, mut reader: R, filename: &str, now: DateTime<Utc>) -> Result<AttachmentRecord, AttachmentError> {
        self.ensure_dir(&self.attachments_dir)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&self.attachments_dir).map_err(|e| self.io_err(&self.attachments_dir, e))?;

        let mut hasher = sha2::Sha256::default();
        use sha2::Digest;
        let mut size: u64 = 0;
        let mut buf = [0u8; 64 * 1024];
        loop {
            let n = reader.read(&mut buf).map_err(|e| self.io_err(tmp.path(), e))?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
            tmp.write_all(&buf[..n]).map_err(|e| self.io_err(tmp.path(), e))?;
            size += n as u64;
        }
        tmp.flush().map_err(|e| self.io_err(tmp.path(), e))?;

        let digest = hasher.finalize();
        let mut hash = String::with_capacity(HASH_LEN);
        for byte in digest {
            hash.push_str(&format!("{byte:02x}"));
        }

        let dest = self.path_for(&hash);
        self.ensure_dir(dest.parent().expect("shard path always has a parent"))?;

        if dest.exists() {
            drop(tmp); // dedup: discard the freshly written temp file
            tracing::debug!(hash = %hash, "attachment already stored, discarding duplicate bytes");
        } else {
            tmp.persist(&dest).map_err(|e| self.io_err(&dest, e.error))?;
            tracing::debug!(hash = %hash, size, "stored new attachment");
        }

        Ok(AttachmentRecord {
            hash,
            size,
            filename: filename.to_owned(),
            is_lfs: size >= self.lfs_threshold,
            stored_at: now,
        })
    }

    /// Open a reader for the blob stored under `hash`.
    ///
    /// # Errors
    /// Returns [`AttachmentError::InvalidHash`] if `hash` is malformed, or
    /// [`AttachmentError::NotFound`] if no blob exists for it.
    pub fn retrieve(&self, hash: &str) -> Result<fs::File, AttachmentError> {
        let hash = hash::normalize(hash)?;
        let path = self.path_for(&hash);
        fs::File::open(&path).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                AttachmentError::NotFound { hash: hash.clone() }
            } else {
                self.io_err(&path, e)
            }
        })
    }

    /// Confirm that the blob stored under `hash` actually hashes to `hash`.
    ///
    /// # Errors
    /// Returns [`AttachmentError::NotFound`] if absent, or
    /// [`AttachmentError::IntegrityMismatch`] if the stored bytes no longer
    /// match the hash they are filed under.
    pub fn verify(&self, hash: &str) -> Result<(), AttachmentError> {
        let hash = hash::normalize(hash)?;
        let path = self.path_for(&hash);
        let data = fs::read(&path).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                AttachmentError::NotFound { hash: hash.clone() }
            } else {
                self.io_err(&path, e)
            }
        })?;
        let actual = hash::digest(&data);
        if actual == hash {
            Ok(())
        } else {
            Err(AttachmentError::IntegrityMismatch { hash, actual })
        }
    }

    /// Remove the blob stored under `hash`.
    ///
    /// # Errors
    /// Returns [`AttachmentError::NotFound`] if no such blob exists.
    pub fn delete(&self, hash: &str) -> Result<(), AttachmentError> {
        let hash = hash::normalize(hash)?;
        let path = self.path_for(&hash);
        fs::remove_file(&path).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                AttachmentError::NotFound { hash: hash.clone() }
            } else {
                self.io_err(&path, e)
            }
        })?;
        tracing::debug!(hash = %hash, "deleted attachment");
        Ok(())
    }

    /// Iterate the hashes of every blob currently stored, for GC and audits.
    ///
    /// # Errors
    /// Returns [`AttachmentError::Io`] if a shard directory cannot be read.
    pub fn list_hashes(&self) -> Result<Vec<String>, AttachmentError> {
        let mut hashes = Vec::new();
        if !self.attachments_dir.is_dir() {
            return Ok(hashes);
        }
        for shard in fs::read_dir(&self.attachments_dir).map_err(|e| self.io_err(&self.attachments_dir, e))? {
            let shard = shard.map_err(|e| self.io_err(&self.attachments_dir, e))?;
            if !shard.file_type().map_err(|e| self.io_err(&shard.path(), e))?.is_dir() {
                continue;
            }
            for entry in fs::read_dir(shard.path()).map_err(|e| self.io_err(&shard.path(), e))? {
                let entry = entry.map_err(|e| self.io_err(&shard.path(), e))?;
                if let Some(name) = entry.file_name().to_str() {
                    if hash::normalize(name).is_ok() {
                        hashes.push(name.to_owned());
                    }
                }
            }
        }
        hashes.sort();
        Ok(hashes)
    }

    fn ensure_dir(&self, dir: &Path) -> Result<(), AttachmentError> {
        if !dir.exists() {
            fs::create_dir_all(dir).map_err(|e| self.io_err(dir, e))?;
        }
        Ok(())
    }

    fn io_err(&self, path: &Path, source: io::Error) -> AttachmentError {
        AttachmentError::Io { path: path.to_owned(), source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z").unwrap().with_timezone(&Utc)
    }

    #[test]
    fn store_then_retrieve_round_trips() {
        let dir = tempdir().unwrap();
        let store = AttachmentStore::new(dir.path(), DEFAULT_LFS_THRESHOLD);

        let record = store.store(b"hello world", "greeting.txt", now()).unwrap();
        assert_eq!(record.size, 11);
        assert!(!record.is_lfs);

        let mut buf = Vec::new();
        store.retrieve(&record.hash).unwrap().read_to_end(&mut buf).unwrap();
        assert_eq!(buf, b"hello world");
    }

    #[test]
    fn storing_identical_bytes_dedups_to_one_file() {
        let dir = tempdir().unwrap();
        let store = AttachmentStore::new(dir.path(), DEFAULT_LFS_THRESHOLD);

        let a = store.store(b"same bytes", "a.txt", now()).unwrap();
        let b = store.store(b"same bytes", "b.txt", now()).unwrap();
        assert_eq!(a.hash, b.hash);
        assert_eq!(store.list_hashes().unwrap().len(), 1);
    }

    #[test]
    fn large_attachment_is_flagged_lfs() {
        let dir = tempdir().unwrap();
        let store = AttachmentStore::new(dir.path(), 10);
        let record = store.store(b"0123456789abcdef", "big.bin", now()).unwrap();
        assert!(record.is_lfs);
    }

    #[test]
    fn retrieve_missing_is_not_found() {
        let dir = tempdir().unwrap();
        let store = AttachmentStore::new(dir.path(), DEFAULT_LFS_THRESHOLD);
        let err = store.retrieve(&"a".repeat(64)).unwrap_err();
        assert!(matches!(err, AttachmentError::NotFound { .. }));
    }

    #[test]
    fn verify_detects_tampered_bytes() {
        let dir = tempdir().unwrap();
        let store = AttachmentStore::new(dir.path(), DEFAULT_LFS_THRESHOLD);
        let record = store.store(b"original", "f.txt", now()).unwrap();

        let path = store.path_for(&record.hash);
        fs::write(&path, b"tampered!").unwrap();

        let err = store.verify(&record.hash).unwrap_err();
        assert!(matches!(err, AttachmentError::IntegrityMismatch { .. }));
    }

    #[test]
    fn delete_then_retrieve_not_found() {
        let dir = tempdir().unwrap();
        let store = AttachmentStore::new(dir.path(), DEFAULT_LFS_THRESHOLD);
        let record = store.store(b"gone soon", "f.txt", now()).unwrap();
        store.delete(&record.hash).unwrap();
        assert!(store.retrieve(&record.hash).is_err());
    }

    #[test]
    fn delete_missing_is_not_found() {
        let dir = tempdir().unwrap();
        let store = AttachmentStore::new(dir.path(), DEFAULT_LFS_THRESHOLD);
        let err = store.delete(&"b".repeat(64)).unwrap_err();
        assert!(matches!(err, AttachmentError::NotFound { .. }));
    }
}
