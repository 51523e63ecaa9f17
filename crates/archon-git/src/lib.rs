//! Git abstraction layer for Archon.
//!
//! This crate defines the [`GitRepo`] trait — the single interface through
//! which the rest of Archon interacts with git. No other Archon crate should
//! import gix directly; instead, they depend on `archon-git` and program
//! against the trait.
//!
//! # Crate layout
//!
//! - [`repo`] — the [`GitRepo`] trait definition.
//! - [`types`] — value types used in trait signatures ([`GitOid`], [`RefName`],
//!   [`TreeEntry`], [`TagInfo`], etc.).
//! - [`error`] — the [`GitError`] enum returned by all trait methods.
//! - [`gix_repo`] — the [`GixRepo`] implementation backed by gix.

pub mod cancel;
pub mod checkout_impl;
pub mod error;
pub mod gix_repo;
pub mod objects_impl;
pub mod push_impl;
pub mod refs_impl;
pub mod repo;
pub mod status_impl;
pub mod tag_impl;
pub mod types;

// Re-export the main trait and commonly used types at the crate root for
// ergonomic imports: `use archon_git::{GitRepo, GitOid, GitError};`
pub use cancel::CancelToken;
pub use error::GitError;
pub use gix_repo::GixRepo;
pub use repo::GitRepo;
pub use types::{CommitInfo, EntryMode, GitOid, OidParseError, RefEdit, RefName, RefNameError, TagInfo, TreeEdit, TreeEntry};
