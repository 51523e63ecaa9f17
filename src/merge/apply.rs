//! Application (§4.3 `Apply`): replays a clean [`Resolution`] into the Node
//! Store, `TheirsOnly` then `OursOnly` — the apply order is fixed so the
//! same resolution always produces the same tree.

use chrono::{DateTime, Utc};

use crate::error::ArchonError;
use crate::model::diff::{Change, PropertyDeltaKind};
use crate::store::NodeStore;

use super::classify::Resolution;
use super::logical_key::Entry;

/// One successfully applied logical change, for UI reporting.
#[derive(Clone, Debug)]
pub struct AppliedChange {
    /// The logical key that was applied.
    pub logical_key: String,
    /// Human-readable description of what was done.
    pub description: String,
}

/// The result of a successful `Apply` pass.
#[derive(Clone, Debug, Default)]
pub struct ApplyOutcome {
    /// Changes applied to the working tree, in apply order.
    pub applied: Vec<AppliedChange>,
    /// Whole-node changes (Add/Remove/AttachmentChanged) that were recorded
    /// but not auto-applied (§4.3).
    pub advisory: Vec<Change>,
}

/// Apply a clean resolution to `store`.
///
/// # Errors
/// Returns [`ArchonError::MergeConflict`] if `resolution` still has
/// unresolved conflicts (callers must resolve or drop them first), or
/// [`ArchonError::ApplyFailed`] if applying a change fails partway through —
/// `outcome.applied` on a prior successful call reflects how far the walk
/// got before the failure.
pub fn apply(resolution: &Resolution, store: &mut NodeStore, now: DateTime<Utc>) -> Result<ApplyOutcome, ArchonError> {
    if !resolution.is_clean() {
        return Err(ArchonError::MergeConflict {
            conflicts: resolution.conflicts.clone(),
        });
    }

    let mut outcome = ApplyOutcome::default();
    for entry in resolution.theirs_only.iter().chain(resolution.ours_only.iter()) {
        apply_entry(entry, store, now, &mut outcome)?;
    }
    Ok(outcome)
}

fn apply_entry(entry: &Entry, store: &mut NodeStore, now: DateTime<Utc>, outcome: &mut ApplyOutcome) -> Result<(), ArchonError> {
    match entry {
        Entry::Rename { node_id, name_to } => {
            let name_from = store.get_node(*node_id).map(|n| n.name).unwrap_or_default();
            store
                .update_node(*node_id, Some(name_to.clone()), None, None, now)
                .map_err(|e| apply_failed(Change::Renamed {
                    node_id: *node_id,
                    name_from,
                    name_to: name_to.clone(),
                }, e))?;
            outcome.applied.push(AppliedChange {
                logical_key: entry.logical_key(),
                description: format!("renamed to '{name_to}'"),
            });
        }
        Entry::Move { node_id, parent_to } => {
            let parent_from = store.parent_of(*node_id)?.unwrap_or(*parent_to);
            store
                .move_node(*node_id, *parent_to, None, now)
                .map_err(|e| apply_failed(Change::Moved {
                    node_id: *node_id,
                    parent_from,
                    parent_to: *parent_to,
                }, e))?;
            outcome.applied.push(AppliedChange {
                logical_key: entry.logical_key(),
                description: format!("moved to parent {parent_to}"),
            });
        }
        Entry::Order { parent_id, order_to } => {
            store
                .reorder_children(*parent_id, order_to.clone(), now)
                .map_err(|e| apply_failed(Change::OrderChanged {
                    parent_id: *parent_id,
                    order_from: Vec::new(),
                    order_to: order_to.clone(),
                }, e))?;
            outcome.applied.push(AppliedChange {
                logical_key: entry.logical_key(),
                description: "reordered children".to_owned(),
            });
        }
        Entry::Property { node_id, key, kind, value } => {
            apply_property(*node_id, key, *kind, value.as_ref(), store, now)?;
            outcome.applied.push(AppliedChange {
                logical_key: entry.logical_key(),
                description: format!("property '{key}' {kind:?}"),
            });
        }
        Entry::Node { change, .. } => {
            outcome.advisory.push(change.clone());
        }
    }
    Ok(())
}

fn apply_property(
    node_id: crate::model::ids::NodeId,
    key: &str,
    kind: PropertyDeltaKind,
    value: Option<&crate::model::node::PropertyValue>,
    store: &mut NodeStore,
    now: DateTime<Utc>,
) -> Result<(), ArchonError> {
    if kind == PropertyDeltaKind::Removed {
        if key == "description" {
            store.update_node(node_id, None, Some(None), None, now)?;
        } else {
            store.delete_property(node_id, key, now)?;
        }
        return Ok(());
    }

    let Some(value) = value else {
        return Err(ArchonError::ApplyFailed {
            change: Box::new(Change::PropertyChanged {
                node_id,
                deltas: vec![],
            }),
            reason: format!("no resolved value for property '{key}'"),
        });
    };

    if key == "description" {
        let desc = value.value.as_str().map(str::to_owned);
        store.update_node(node_id, None, Some(desc), None, now)?;
    } else {
        store.set_property(node_id, key, value.clone(), now)?;
    }
    Ok(())
}

fn apply_failed(change: Change, source: ArchonError) -> ArchonError {
    ArchonError::ApplyFailed {
        change: Box::new(change),
        reason: source.to_string(),
    }
}
