//! Validated identifier newtypes for Archon's data model.
//!
//! Mirrors the validated-newtype pattern used throughout Archon: construction
//! validates format once, and every later use of the value is guaranteed
//! well-formed. Each type round-trips through `serde` as a plain JSON string
//! via `try_from`/`into`, so on-disk JSON stays simple while in-memory values
//! stay validated.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// NodeId
// ---------------------------------------------------------------------------

/// A node's stable, globally unique identity.
///
/// Backed by a UUID v4. Never reused, never mutated after creation (§3).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NodeId(Uuid);

impl NodeId {
    /// Generate a fresh, random node identity.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Return the canonical hyphenated string form.
    #[must_use]
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for NodeId {
    type Err = ValidationError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| ValidationError {
                kind: ErrorKind::NodeId,
                value: s.to_owned(),
                reason: e.to_string(),
            })
    }
}

impl TryFrom<String> for NodeId {
    type Error = ValidationError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<NodeId> for String {
    fn from(id: NodeId) -> Self {
        id.0.to_string()
    }
}

// ---------------------------------------------------------------------------
// SnapshotName
// ---------------------------------------------------------------------------

/// A validated snapshot name: `^[A-Za-z0-9_-]{1,50}$` (§3).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SnapshotName(String);

impl SnapshotName {
    /// Maximum length of a snapshot name.
    pub const MAX_LEN: usize = 50;

    /// Create a new `SnapshotName`, validating format.
    ///
    /// # Errors
    /// Returns an error if the name is empty, too long, or contains a
    /// character outside `[A-Za-z0-9_-]`.
    pub fn new(s: &str) -> Result<Self, ValidationError> {
        Self::validate(s)?;
        Ok(Self(s.to_owned()))
    }

    /// Return the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The `snapshot-<name>` git tag this snapshot is recorded under.
    #[must_use]
    pub fn tag_name(&self) -> String {
        format!("snapshot-{}", self.0)
    }

    fn validate(s: &str) -> Result<(), ValidationError> {
        if s.is_empty() {
            return Err(ValidationError {
                kind: ErrorKind::SnapshotName,
                value: s.to_owned(),
                reason: "snapshot name must not be empty".to_owned(),
            });
        }
        if s.len() > Self::MAX_LEN {
            return Err(ValidationError {
                kind: ErrorKind::SnapshotName,
                value: s.to_owned(),
                reason: format!(
                    "snapshot name must be at most {} characters, got {}",
                    Self::MAX_LEN,
                    s.len()
                ),
            });
        }
        if !s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
            return Err(ValidationError {
                kind: ErrorKind::SnapshotName,
                value: s.to_owned(),
                reason: "snapshot name must contain only letters, digits, '_' and '-'".to_owned(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for SnapshotName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for SnapshotName {
    type Err = ValidationError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for SnapshotName {
    type Error = ValidationError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::validate(&s)?;
        Ok(Self(s))
    }
}

impl From<SnapshotName> for String {
    fn from(name: SnapshotName) -> Self {
        name.0
    }
}

// ---------------------------------------------------------------------------
// Validation errors
// ---------------------------------------------------------------------------

/// The kind of value that failed validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// A [`NodeId`] validation error.
    NodeId,
    /// A [`SnapshotName`] validation error.
    SnapshotName,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NodeId => write!(f, "NodeId"),
            Self::SnapshotName => write!(f, "SnapshotName"),
        }
    }
}

/// A validation error for one of Archon's identifier newtypes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationError {
    /// What kind of value was being validated.
    pub kind: ErrorKind,
    /// The invalid value.
    pub value: String,
    /// Human-readable explanation.
    pub reason: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {}: {:?} — {}", self.kind, self.value, self.reason)
    }
}

impl std::error::Error for ValidationError {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
