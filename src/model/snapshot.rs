//! The snapshot record (§3, §4.4): a named, immutable point in project
//! history, surfaced as a git annotated tag plus a best-effort sidecar.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::SnapshotName;

/// A snapshot: a human-named pointer at a commit, with authorship and
/// free-form metadata. Identity is `name` within a project (§3).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    /// Unique, validated name.
    pub name: SnapshotName,
    /// The commit this snapshot points to, as 40-char lowercase hex.
    pub hash: String,
    /// The commit message used when the snapshot was created.
    pub message: String,
    /// Optional longer-form description (stored in the tag message body).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Caller-defined string labels.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    /// Opaque caller-defined metadata.
    #[serde(default = "default_metadata")]
    pub metadata: serde_json::Value,
    /// When the snapshot was created.
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    /// Author identity string (`"Name <email>"`).
    pub author: String,
}

fn default_metadata() -> serde_json::Value {
    serde_json::json!({})
}

/// Request payload for creating a new snapshot (§4.4 `Create`).
#[derive(Clone, Debug, Default)]
pub struct CreateSnapshotRequest {
    /// Snapshot name; validated by [`SnapshotName::new`].
    pub name: String,
    /// Commit message; must be non-empty.
    pub message: String,
    /// Optional longer description, placed in the tag message body.
    pub description: Option<String>,
    /// Caller-defined string labels.
    pub labels: BTreeMap<String, String>,
    /// Opaque caller-defined metadata.
    pub metadata: Option<serde_json::Value>,
    /// Author identity; falls back to the configured default when absent.
    pub author: Option<String>,
}
