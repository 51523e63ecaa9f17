//! The change set vocabulary produced by the semantic diff engine (§4.2).
//!
//! These types describe *what* changed between two revisions of the node
//! tree. The engine that produces them lives in `crate::diff::engine`; this
//! module only defines the stable, serializable shape of a change.

use serde::{Deserialize, Serialize};

use super::ids::NodeId;

/// One categorized change between two revisions.
///
/// Renamed, Moved, and PropertyChanged are independent categories: a single
/// node ID may appear in more than one of them for the same diff (§4.2
/// rule 3).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Change {
    /// A node present in the "to" side only.
    Added {
        /// The new node's ID.
        #[serde(rename = "nodeId")]
        node_id: NodeId,
        /// Its parent at the "to" side.
        #[serde(rename = "parentId")]
        parent_id: NodeId,
    },
    /// A node present in the "from" side only.
    Removed {
        /// The removed node's ID.
        #[serde(rename = "nodeId")]
        node_id: NodeId,
        /// Its parent at the "from" side.
        #[serde(rename = "parentId")]
        parent_id: NodeId,
    },
    /// A node's `name` differs between revisions.
    Renamed {
        /// The node's ID.
        #[serde(rename = "nodeId")]
        node_id: NodeId,
        /// Name at the "from" side.
        #[serde(rename = "nameFrom")]
        name_from: String,
        /// Name at the "to" side.
        #[serde(rename = "nameTo")]
        name_to: String,
    },
    /// A node's parent differs between revisions.
    Moved {
        /// The node's ID.
        #[serde(rename = "nodeId")]
        node_id: NodeId,
        /// Parent at the "from" side.
        #[serde(rename = "parentFrom")]
        parent_from: NodeId,
        /// Parent at the "to" side.
        #[serde(rename = "parentTo")]
        parent_to: NodeId,
    },
    /// A node's description or one or more properties differ.
    PropertyChanged {
        /// The node's ID.
        #[serde(rename = "nodeId")]
        node_id: NodeId,
        /// Individual property-level deltas, sorted by (key, kind).
        deltas: Vec<PropertyDelta>,
    },
    /// A parent's `children` order or membership differs.
    OrderChanged {
        /// The parent node's ID.
        #[serde(rename = "parentId")]
        parent_id: NodeId,
        /// Child order at the "from" side.
        #[serde(rename = "orderFrom")]
        order_from: Vec<NodeId>,
        /// Child order at the "to" side.
        #[serde(rename = "orderTo")]
        order_to: Vec<NodeId>,
    },
    /// An attachment-typed property's referenced hash changed.
    AttachmentChanged {
        /// The node's ID.
        #[serde(rename = "nodeId")]
        node_id: NodeId,
        /// The property key carrying the attachment reference.
        key: String,
        /// Hash at the "from" side, if any.
        #[serde(rename = "hashFrom", skip_serializing_if = "Option::is_none")]
        hash_from: Option<String>,
        /// Hash at the "to" side, if any.
        #[serde(rename = "hashTo", skip_serializing_if = "Option::is_none")]
        hash_to: Option<String>,
    },
}

impl Change {
    /// The fixed type rank used for deterministic sorting (§4.2 rule 5).
    #[must_use]
    pub fn rank(&self) -> u8 {
        match self {
            Self::Added { .. } => 0,
            Self::Removed { .. } => 1,
            Self::Renamed { .. } => 2,
            Self::Moved { .. } => 3,
            Self::PropertyChanged { .. } => 4,
            Self::OrderChanged { .. } => 5,
            Self::AttachmentChanged { .. } => 6,
        }
    }

    /// The primary sort key: `nodeId` for every variant except
    /// `OrderChanged`, which sorts by `parentId`.
    #[must_use]
    pub fn primary_key(&self) -> &NodeId {
        match self {
            Self::Added { node_id, .. }
            | Self::Removed { node_id, .. }
            | Self::Renamed { node_id, .. }
            | Self::Moved { node_id, .. }
            | Self::PropertyChanged { node_id, .. }
            | Self::AttachmentChanged { node_id, .. } => node_id,
            Self::OrderChanged { parent_id, .. } => parent_id,
        }
    }
}

/// How a single property differs between two revisions of a node.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PropertyDelta {
    /// The property key (or the reserved key `"description"`).
    pub key: String,
    /// Which direction the key appears in.
    pub kind: PropertyDeltaKind,
}

/// Classification of a single property-level delta (§4.2 rule 6).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PropertyDeltaKind {
    /// Present on the "to" side only.
    Added,
    /// Present on the "from" side only.
    Removed,
    /// Present on both sides with a differing `(typeHint, value)` pair.
    Updated,
}

/// Aggregate counts over a change set (§4.2 rule 7).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    /// Total number of changes across all categories.
    pub total: usize,
    /// Number of `Added` changes.
    pub added: usize,
    /// Number of `Removed` changes.
    pub removed: usize,
    /// Number of `Renamed` changes.
    pub renamed: usize,
    /// Number of `Moved` changes.
    pub moved: usize,
    /// Number of `PropertyChanged` changes.
    #[serde(rename = "propertyChanged")]
    pub property_changed: usize,
    /// Number of `OrderChanged` changes.
    #[serde(rename = "orderChanged")]
    pub order_changed: usize,
    /// Number of `AttachmentChanged` changes.
    #[serde(rename = "attachmentChanged")]
    pub attachment_changed: usize,
}

impl Summary {
    /// Compute a summary from a change set.
    #[must_use]
    pub fn from_changes(changes: &[Change]) -> Self {
        let mut s = Self {
            total: changes.len(),
            ..Self::default()
        };
        for c in changes {
            match c {
                Change::Added { .. } => s.added += 1,
                Change::Removed { .. } => s.removed += 1,
                Change::Renamed { .. } => s.renamed += 1,
                Change::Moved { .. } => s.moved += 1,
                Change::PropertyChanged { .. } => s.property_changed += 1,
                Change::OrderChanged { .. } => s.order_changed += 1,
                Change::AttachmentChanged { .. } => s.attachment_changed += 1,
            }
        }
        s
    }
}

/// Sort a change set into the deterministic order required by §4.2 rule 5:
/// by `(rank, primary_key)`, with `PropertyChanged` deltas sorted internally
/// by `(key, kind)`.
pub fn sort_changes(changes: &mut [Change]) {
    for c in changes.iter_mut() {
        if let Change::PropertyChanged { deltas, .. } = c {
            deltas.sort();
        }
    }
    changes.sort_by(|a, b| a.rank().cmp(&b.rank()).then_with(|| a.primary_key().cmp(b.primary_key())));
}
