//! Error types for attachment store operations.

use std::path::PathBuf;

use thiserror::Error;

/// Errors returned by [`crate::AttachmentStore`] operations.
#[derive(Debug, Error)]
pub enum AttachmentError {
    /// A hash string was not 64 lowercase-or-uppercase hex characters.
    #[error("invalid attachment hash `{value}`: {reason}")]
    InvalidHash {
        /// The raw value that failed validation.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The requested attachment does not exist.
    #[error("attachment `{hash}` not found")]
    NotFound {
        /// The hash that was looked up.
        hash: String,
    },

    /// A stored blob's bytes no longer match its hash.
    #[error("attachment `{hash}` failed integrity check: stored content hashes to `{actual}`")]
    IntegrityMismatch {
        /// The hash the blob was stored under.
        hash: String,
        /// The hash actually computed from the stored bytes.
        actual: String,
    },

    /// An I/O error occurred reading or writing the store.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        /// The path being operated on.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}
