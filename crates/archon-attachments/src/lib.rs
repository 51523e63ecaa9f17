//! Content-addressed attachment storage for Archon (S5, §4.5).
//!
//! Blobs are stored by their SHA-256 hash, sharded 256-way by the hash's
//! first two hex characters. A hash is an attachment's entire identity;
//! filenames are caller-supplied display metadata, never part of the store's
//! own state.

pub mod error;
pub mod gc;
pub mod hash;
pub mod store;

pub use error::AttachmentError;
pub use gc::{collect as gc_collect, GcReport};
pub use hash::{digest, normalize as normalize_hash};
pub use store::{AttachmentRecord, AttachmentStore, DEFAULT_LFS_THRESHOLD};
