//! The node tree: `Node`, typed properties, and the project manifest.
//!
//! Node JSON files are the source of truth (§4.1). Key ordering in the
//! serialized form matters for diff quality, so `Node` derives `Serialize`
//! with fields in the order they should appear on disk and property maps use
//! `BTreeMap` for stable key ordering.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::NodeId;

/// A typed scalar carried by a node property.
///
/// `typeHint` disambiguates values that would otherwise collide under plain
/// JSON typing (e.g. a date stored as a string). Equality for diffing
/// compares both `type_hint` and the canonical-JSON encoding of `value`
/// (§4.2 rule 6).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PropertyValue {
    /// The declared type of `value`. Defaults to `string` when absent on
    /// disk, matching the property shape described in §4.1.
    #[serde(rename = "typeHint", skip_serializing_if = "Option::is_none")]
    pub type_hint: Option<TypeHint>,
    /// The raw value. Left as `serde_json::Value` so arbitrary scalars
    /// (including nested attachment-reference objects) round-trip without
    /// loss.
    pub value: serde_json::Value,
}

impl PropertyValue {
    /// Build a property value with an explicit type hint.
    #[must_use]
    pub fn new(type_hint: TypeHint, value: serde_json::Value) -> Self {
        Self {
            type_hint: Some(type_hint),
            value,
        }
    }

    /// The effective type hint, defaulting to `String` when unset.
    #[must_use]
    pub fn effective_type_hint(&self) -> TypeHint {
        self.type_hint.unwrap_or(TypeHint::String)
    }

    /// `true` if this property is an attachment reference
    /// (`{ "typeHint": "attachment", "value": "<64-hex>" }`, §4.5 GC rule).
    #[must_use]
    pub fn is_attachment_reference(&self) -> bool {
        self.type_hint == Some(TypeHint::Attachment) && self.value.is_string()
    }
}

/// Declared type of a property value.
///
/// `Attachment` is a reserved hint recognized by the referential GC pass
/// (`archon-attachments::gc`) even though it is not one of the base scalar
/// kinds listed in §3.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TypeHint {
    /// UTF-8 string.
    String,
    /// IEEE-754 double.
    Number,
    /// `true`/`false`.
    Boolean,
    /// RFC 3339 timestamp string.
    Date,
    /// JSON `null`.
    Null,
    /// A reference to an attachment store entry by SHA-256 hash.
    Attachment,
}

/// One node in the project tree.
///
/// `id` is immutable after creation; `children` order is semantically
/// meaningful (§3). `description` is modeled as an ordinary field here but
/// treated as a property with the reserved key `"description"` by the diff
/// engine (§4.2 rule 6).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Stable, globally unique, never reused, never mutated.
    pub id: NodeId,
    /// Non-empty display name.
    pub name: String,
    /// Optional free-text description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Typed property map, keyed by caller-defined property name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, PropertyValue>,
    /// Ordered child node IDs. The root node appears in no other node's
    /// `children`.
    #[serde(default)]
    pub children: Vec<NodeId>,
    /// Creation timestamp, monotonically non-decreasing per node (§5).
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    /// Last-mutation timestamp.
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl Node {
    /// Construct a fresh node with a newly generated ID and matching
    /// `created_at`/`updated_at` timestamps.
    #[must_use]
    pub fn new(name: String, description: Option<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: NodeId::new(),
            name,
            description,
            properties: BTreeMap::new(),
            children: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// `true` if `name` is non-empty after trimming (§4.1 `CreateNode`
    /// validation rule).
    #[must_use]
    pub fn is_valid_name(name: &str) -> bool {
        !name.trim().is_empty()
    }
}

/// Root-level `project.json` manifest: project identity plus the root
/// node's ID, so the tree can be walked from a known entry point (§6).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProjectManifest {
    /// Human-readable project name.
    pub name: String,
    /// ID of the tree's root node.
    #[serde(rename = "rootId")]
    pub root_id: NodeId,
    /// On-disk schema version, for forward-compatible migrations.
    #[serde(rename = "schemaVersion")]
    pub schema_version: u32,
    /// Free-form project settings, opaque to the core model (§6).
    #[serde(default = "default_settings")]
    pub settings: serde_json::Value,
    /// When the project was initialized.
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    /// Last time the manifest itself was written.
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

fn default_settings() -> serde_json::Value {
    serde_json::json!({})
}

impl ProjectManifest {
    /// Current on-disk schema version written by this build.
    pub const CURRENT_SCHEMA_VERSION: u32 = 1;

    /// Build a manifest for a newly initialized project.
    #[must_use]
    pub fn new(name: String, root_id: NodeId, now: DateTime<Utc>) -> Self {
        Self {
            name,
            root_id,
            schema_version: Self::CURRENT_SCHEMA_VERSION,
            settings: default_settings(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn node_new_sets_matching_timestamps() {
        let n = Node::new("Root".to_owned(), None, now());
        assert_eq!(n.created_at, n.updated_at);
        assert!(n.children.is_empty());
        assert!(n.properties.is_empty());
    }

    #[test]
    fn name_validation_rejects_blank() {
        assert!(!Node::is_valid_name(""));
        assert!(!Node::is_valid_name("   "));
        assert!(Node::is_valid_name("ok"));
    }

    #[test]
    fn property_value_defaults_to_string_hint() {
        let p = PropertyValue {
            type_hint: None,
            value: serde_json::json!("x"),
        };
        assert_eq!(p.effective_type_hint(), TypeHint::String);
    }

    #[test]
    fn attachment_reference_detection() {
        let hash = "a".repeat(64);
        let p = PropertyValue::new(TypeHint::Attachment, serde_json::json!(hash));
        assert!(p.is_attachment_reference());

        let not_ref = PropertyValue::new(TypeHint::String, serde_json::json!(hash));
        assert!(!not_ref.is_attachment_reference());
    }

    #[test]
    fn node_json_field_order_and_shape() {
        let n = Node::new("Root".to_owned(), Some("desc".to_owned()), now());
        let v = serde_json::to_value(&n).unwrap();
        let obj = v.as_object().unwrap();
        let keys: Vec<&str> = obj.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec![
                "id",
                "name",
                "description",
                "children",
                "createdAt",
                "updatedAt"
            ]
        );
    }

    #[test]
    fn project_manifest_roundtrip() {
        let m = ProjectManifest::new("demo".to_owned(), NodeId::new(), now());
        let json = serde_json::to_string(&m).unwrap();
        let decoded: ProjectManifest = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, m);
    }
}
