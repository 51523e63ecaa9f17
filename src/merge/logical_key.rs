//! Logical-key indexing (§4.3): maps each change produced by the diff engine
//! to the string key identifying the logical field it touches, so changes
//! from two divergent revisions can be compared field-by-field rather than
//! node-by-node.

use std::collections::BTreeMap;

use crate::model::diff::{Change, PropertyDeltaKind};
use crate::model::ids::NodeId;
use crate::model::node::{Node, PropertyValue, TypeHint};

/// One logical-key-addressable unit of change, expanded from a [`Change`].
///
/// `PropertyChanged` expands into one `Property` entry per delta;
/// `Renamed`/`Moved`/`OrderChanged` map one-to-one; `Added`/`Removed`/
/// `AttachmentChanged` collapse onto the shared `"<nodeId>|node"` key.
#[derive(Clone, Debug)]
pub enum Entry {
    /// `"<nodeId>|name"`.
    Rename { node_id: NodeId, name_to: String },
    /// `"<nodeId>|parent"`.
    Move { node_id: NodeId, parent_to: NodeId },
    /// `"<parentId>|order"`.
    Order { parent_id: NodeId, order_to: Vec<NodeId> },
    /// `"<nodeId>|property:<key>"`. `value` is `None` for a `Removed` delta.
    Property {
        node_id: NodeId,
        key: String,
        kind: PropertyDeltaKind,
        value: Option<PropertyValue>,
    },
    /// `"<nodeId>|node"` — a whole-node event (add, remove, or attachment
    /// reference change), not auto-applied (§4.3).
    Node { node_id: NodeId, change: Change },
}

impl Entry {
    /// The logical key this entry occupies.
    #[must_use]
    pub fn logical_key(&self) -> String {
        match self {
            Self::Rename { node_id, .. } => format!("{node_id}|name"),
            Self::Move { node_id, .. } => format!("{node_id}|parent"),
            Self::Order { parent_id, .. } => format!("{parent_id}|order"),
            Self::Property { node_id, key, .. } => format!("{node_id}|property:{key}"),
            Self::Node { node_id, .. } => format!("{node_id}|node"),
        }
    }
}

/// Expand a change set into logical-key entries, resolving each
/// `PropertyChanged` delta's new value by looking it up on `side_nodes` (the
/// "to" side of the diff this change set came from).
#[must_use]
pub fn expand(changes: &[Change], side_nodes: &BTreeMap<NodeId, Node>) -> Vec<Entry> {
    let mut out = Vec::new();
    for change in changes {
        match change {
            Change::Renamed { node_id, name_to, .. } => out.push(Entry::Rename {
                node_id: *node_id,
                name_to: name_to.clone(),
            }),
            Change::Moved { node_id, parent_to, .. } => out.push(Entry::Move {
                node_id: *node_id,
                parent_to: *parent_to,
            }),
            Change::OrderChanged { parent_id, order_to, .. } => out.push(Entry::Order {
                parent_id: *parent_id,
                order_to: order_to.clone(),
            }),
            Change::PropertyChanged { node_id, deltas } => {
                for delta in deltas {
                    let value = resolve_value(*node_id, &delta.key, delta.kind, side_nodes);
                    out.push(Entry::Property {
                        node_id: *node_id,
                        key: delta.key.clone(),
                        kind: delta.kind,
                        value,
                    });
                }
            }
            Change::Added { .. } | Change::Removed { .. } | Change::AttachmentChanged { .. } => {
                out.push(Entry::Node {
                    node_id: *change.primary_key(),
                    change: change.clone(),
                });
            }
        }
    }
    out
}

fn resolve_value(
    node_id: NodeId,
    key: &str,
    kind: PropertyDeltaKind,
    side_nodes: &BTreeMap<NodeId, Node>,
) -> Option<PropertyValue> {
    if kind == PropertyDeltaKind::Removed {
        return None;
    }
    let node = side_nodes.get(&node_id)?;
    if key == "description" {
        node.description
            .clone()
            .map(|desc| PropertyValue::new(TypeHint::String, serde_json::Value::String(desc)))
    } else {
        node.properties.get(key).cloned()
    }
}
