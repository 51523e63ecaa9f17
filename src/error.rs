//! Error types for Archon's core operations.
//!
//! Defines [`ArchonError`], the unified error type returned from node store,
//! diff, merge, snapshot, and CLI-dispatch code. Error messages are
//! agent-friendly: each variant describes what went wrong and what to do
//! about it, so a caller can act on the message without extra context.
//!
//! No Git-specific concepts leak into this module beyond an opaque error
//! string — `archon-git`'s own `GitError` is wrapped, not re-exported.

use std::fmt;
use std::path::PathBuf;

use crate::model::diff::Change;

// ---------------------------------------------------------------------------
// ArchonError
// ---------------------------------------------------------------------------

/// Unified error type for Archon operations.
///
/// Each variant is self-contained: a caller receiving this error should be
/// able to understand what happened and what to do next without additional
/// context.
#[derive(Debug)]
pub enum ArchonError {
    /// A request failed basic validation (empty name, malformed identifier,
    /// out-of-range value).
    InvalidInput {
        /// What was invalid.
        field: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The requested node, snapshot, or attachment does not exist.
    NotFound {
        /// What kind of thing was being looked up (`"node"`, `"snapshot"`,
        /// `"attachment"`).
        kind: &'static str,
        /// The identifier that was not found.
        id: String,
    },

    /// A snapshot name collides with an existing one (at-most-one-per-name
    /// invariant, §4.4).
    AlreadyExists {
        /// What kind of thing already exists.
        kind: &'static str,
        /// The colliding identifier.
        id: String,
    },

    /// A filesystem path is outside the project root or otherwise unsafe to
    /// use.
    InvalidPath {
        /// The offending path.
        path: PathBuf,
        /// Why it was rejected.
        reason: String,
    },

    /// Reading or writing project state on disk failed in a way that is not
    /// a plain I/O error (corrupt JSON, schema mismatch, invariant
    /// violation detected on load).
    StorageFailure {
        /// Human-readable description of the problem.
        detail: String,
    },

    /// An `archon-git` operation failed.
    GitFailure {
        /// The underlying `archon-git` error.
        source: archon_git::GitError,
    },

    /// A load-time invariant check failed: orphaned nodes, nodes claimed by
    /// two parents, or unknown child IDs (§4.1 failure semantics).
    IntegrityFailure {
        /// The repair report describing what was found.
        repair: Repair,
    },

    /// An in-memory operation would violate a data-model invariant (move
    /// into own subtree, non-permutation reorder).
    InvariantViolation {
        /// Human-readable description of the violated invariant.
        detail: String,
    },

    /// A three-way merge produced unresolved conflicts.
    MergeConflict {
        /// One entry per conflicting logical key.
        conflicts: Vec<MergeConflictInfo>,
    },

    /// Applying a resolved merge failed partway through (§4.3 `Apply`).
    ApplyFailed {
        /// Which change could not be applied.
        change: Box<Change>,
        /// Why it failed.
        reason: String,
    },

    /// The search index failed to read, write, or rebuild.
    SearchFailure {
        /// Human-readable description of the problem.
        detail: String,
    },

    /// A configuration file could not be loaded or parsed.
    ConfigError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Human-readable description of the problem.
        detail: String,
    },

    /// The current directory is not inside an Archon project.
    NoProject,

    /// A long-running operation was cancelled via its cancellation token.
    Cancelled {
        /// Which operation was cancelled.
        operation: String,
    },

    /// A plain I/O error occurred.
    Io(std::io::Error),
}

// ---------------------------------------------------------------------------
// Repair
// ---------------------------------------------------------------------------

/// A report of node-store invariant violations detected on load (§4.1).
///
/// Produced instead of crashing, so a UI or CLI can drive interactive
/// resolution.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Repair {
    /// Node IDs referenced as a child by no parent and not the root.
    pub orphans: Vec<String>,
    /// Node IDs claimed as a child by more than one parent.
    pub duplicate_parent_claims: Vec<String>,
    /// Child IDs referenced by a parent's `children` list that have no
    /// corresponding node file.
    pub unknown_children: Vec<String>,
}

impl Repair {
    /// `true` if no problems were found.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.orphans.is_empty()
            && self.duplicate_parent_claims.is_empty()
            && self.unknown_children.is_empty()
    }
}

impl fmt::Display for Repair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_clean() {
            return write!(f, "no integrity problems found");
        }
        writeln!(f, "integrity problems found:")?;
        if !self.orphans.is_empty() {
            writeln!(f, "  orphaned nodes: {}", self.orphans.join(", "))?;
        }
        if !self.duplicate_parent_claims.is_empty() {
            writeln!(
                f,
                "  nodes claimed by multiple parents: {}",
                self.duplicate_parent_claims.join(", ")
            )?;
        }
        if !self.unknown_children.is_empty() {
            writeln!(f, "  unknown child references: {}", self.unknown_children.join(", "))?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MergeConflictInfo
// ---------------------------------------------------------------------------

/// Summary information about one unresolved merge conflict (§4.3).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MergeConflictInfo {
    /// The logical key that conflicted (e.g. `"<nodeId>|name"`).
    pub logical_key: String,
    /// Human-readable description of the conflict.
    pub description: String,
}

impl MergeConflictInfo {
    /// Create a new conflict summary.
    #[must_use]
    pub const fn new(logical_key: String, description: String) -> Self {
        Self { logical_key, description }
    }
}

impl fmt::Display for MergeConflictInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.logical_key, self.description)
    }
}

// ---------------------------------------------------------------------------
// Display — agent-friendly error messages
// ---------------------------------------------------------------------------

impl fmt::Display for ArchonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidInput { field, reason } => {
                write!(f, "invalid {field}: {reason}")
            }
            Self::NotFound { kind, id } => {
                write!(
                    f,
                    "{kind} '{id}' not found.\n  To fix: check the identifier, or list existing {kind}s."
                )
            }
            Self::AlreadyExists { kind, id } => {
                write!(
                    f,
                    "{kind} '{id}' already exists.\n  To fix: use a different name, or delete the existing one first."
                )
            }
            Self::InvalidPath { path, reason } => {
                write!(f, "invalid path '{}': {reason}", path.display())
            }
            Self::StorageFailure { detail } => {
                write!(
                    f,
                    "project storage error: {detail}\n  To fix: inspect the affected file under the project root."
                )
            }
            Self::GitFailure { source } => {
                write!(f, "git operation failed: {source}")
            }
            Self::IntegrityFailure { repair } => {
                write!(f, "{repair}  To fix: resolve each listed problem, then retry.")
            }
            Self::InvariantViolation { detail } => {
                write!(f, "operation rejected: {detail}")
            }
            Self::MergeConflict { conflicts } => {
                write!(f, "merge conflict in {} location(s):", conflicts.len())?;
                for c in conflicts {
                    write!(f, "\n  - {c}")?;
                }
                write!(f, "\n  To fix: resolve each conflict, then retry the merge.")
            }
            Self::ApplyFailed { change, reason } => {
                write!(f, "failed to apply change {change:?}: {reason}")
            }
            Self::SearchFailure { detail } => {
                write!(
                    f,
                    "search index error: {detail}\n  To fix: run the index rebuild command."
                )
            }
            Self::ConfigError { path, detail } => {
                write!(
                    f,
                    "configuration error in '{}': {detail}\n  To fix: edit the config file and correct the issue.",
                    path.display()
                )
            }
            Self::NoProject => {
                write!(
                    f,
                    "not inside an Archon project.\n  To fix: run this command from a project directory, or run `archon init` first."
                )
            }
            Self::Cancelled { operation } => {
                write!(f, "{operation} was cancelled.")
            }
            Self::Io(err) => {
                write!(
                    f,
                    "I/O error: {err}\n  To fix: check file permissions and disk space."
                )
            }
        }
    }
}

// ---------------------------------------------------------------------------
// std::error::Error
// ---------------------------------------------------------------------------

impl std::error::Error for ArchonError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::GitFailure { source } => Some(source),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// From impls
// ---------------------------------------------------------------------------

impl From<std::io::Error> for ArchonError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<archon_git::GitError> for ArchonError {
    fn from(err: archon_git::GitError) -> Self {
        Self::GitFailure { source: err }
    }
}

impl From<crate::config::ConfigError> for ArchonError {
    fn from(err: crate::config::ConfigError) -> Self {
        Self::ConfigError {
            path: err.path.unwrap_or_default(),
            detail: err.message,
        }
    }
}

impl From<crate::model::ids::ValidationError> for ArchonError {
    fn from(err: crate::model::ids::ValidationError) -> Self {
        Self::InvalidInput {
            field: err.kind.to_string(),
            reason: err.reason,
        }
    }
}

impl From<archon_search::SearchError> for ArchonError {
    fn from(err: archon_search::SearchError) -> Self {
        Self::SearchFailure {
            detail: err.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
