//! The semantic diff engine (S2, §4.2): compares two revisions of the node
//! tree and produces a deterministic [`Change`] set, never a byte diff.
//!
//! A revision is resolved to either the live working tree or a git commit
//! (reached directly via `rev_parse`, or by snapshot name via the
//! `snapshot-<name>` tag). Loading a git revision reads blobs straight from
//! the object database — it never checks the tree out.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use archon_git::{EntryMode, GitOid, GitRepo};

use crate::canonical_json;
use crate::error::ArchonError;
use crate::model::diff::{sort_changes, Change, PropertyDelta, PropertyDeltaKind, Summary};
use crate::model::ids::NodeId;
use crate::model::node::Node;
use crate::store;

/// A resolved revision, ready to be loaded into a node map.
#[derive(Clone, Copy, Debug)]
pub enum Revision {
    /// The live on-disk working tree (the literal `"working"` revspec).
    Working,
    /// A git commit, reached directly or via a snapshot tag.
    Git(GitOid),
}

/// Resolve a revision specification (`"working"`, an OID, a ref, or a
/// snapshot name) to a [`Revision`].
///
/// Snapshot names are tried first against `snapshot-<spec>`; if no such tag
/// exists, `spec` is handed to `rev_parse` so plain OIDs and ref names keep
/// working.
///
/// # Errors
/// Returns [`ArchonError::NotFound`] if `spec` resolves to nothing.
pub fn resolve_revision(repo: &dyn GitRepo, spec: &str) -> Result<Revision, ArchonError> {
    if spec == "working" {
        return Ok(Revision::Working);
    }
    let tag_name = format!("snapshot-{spec}");
    if let Some(tag) = repo.read_tag(&tag_name)? {
        return Ok(Revision::Git(tag.target));
    }
    match repo.rev_parse_opt(spec)? {
        Some(oid) => Ok(Revision::Git(oid)),
        None => Err(ArchonError::NotFound {
            kind: "revision",
            id: spec.to_owned(),
        }),
    }
}

/// Load the node map for a resolved revision.
///
/// # Errors
/// Returns [`ArchonError::GitFailure`] if the commit or its tree cannot be
/// read, or [`ArchonError::Io`] if the working tree cannot be read.
pub fn load_nodes(repo: &dyn GitRepo, project_root: &Path, rev: Revision) -> Result<BTreeMap<NodeId, Node>, ArchonError> {
    match rev {
        Revision::Working => store::load_all_nodes_at(project_root),
        Revision::Git(commit_oid) => load_nodes_from_commit(repo, commit_oid),
    }
}

fn load_nodes_from_commit(repo: &dyn GitRepo, commit_oid: GitOid) -> Result<BTreeMap<NodeId, Node>, ArchonError> {
    let commit = repo.read_commit(commit_oid)?;
    let root_entries = repo.read_tree(commit.tree_oid)?;
    let Some(nodes_entry) = root_entries.iter().find(|e| e.name == "nodes" && e.mode == EntryMode::Tree) else {
        return Ok(BTreeMap::new());
    };

    let mut out = BTreeMap::new();
    for entry in repo.read_tree(nodes_entry.oid)? {
        if entry.mode != EntryMode::Blob {
            continue;
        }
        let bytes = repo.read_blob(entry.oid)?;
        match serde_json::from_slice::<Node>(&bytes) {
            Ok(node) => {
                out.insert(node.id, node);
            }
            Err(e) => {
                tracing::warn!(file = %entry.name, error = %e, "skipping malformed node file");
            }
        }
    }
    Ok(out)
}

/// The result of a full diff: the deterministically sorted change set and
/// its aggregate summary (§4.2 rule 5, rule 7).
#[derive(Clone, Debug)]
pub struct DiffResult {
    /// Individual changes, sorted by (rank, primary key).
    pub changes: Vec<Change>,
    /// Aggregate counts over `changes`.
    pub summary: Summary,
}

/// Diff two resolved revisions.
///
/// # Errors
/// Propagates any error from loading either revision.
pub fn diff_revisions(
    repo: &dyn GitRepo,
    project_root: &Path,
    from: &str,
    to: &str,
) -> Result<DiffResult, ArchonError> {
    let from_rev = resolve_revision(repo, from)?;
    let to_rev = resolve_revision(repo, to)?;
    let from_nodes = load_nodes(repo, project_root, from_rev)?;
    let to_nodes = load_nodes(repo, project_root, to_rev)?;
    let changes = diff_nodes(&from_nodes, &to_nodes);
    let summary = Summary::from_changes(&changes);
    Ok(DiffResult { changes, summary })
}

/// Compute the change set between two already-loaded node maps.
///
/// Implements the seven steps in §4.2: build per-side parent indices,
/// classify additions/removals/renames/moves/property changes per node ID,
/// classify order changes per parent, then sort deterministically.
#[must_use]
pub fn diff_nodes(from: &BTreeMap<NodeId, Node>, to: &BTreeMap<NodeId, Node>) -> Vec<Change> {
    let parent_from = parent_index(from);
    let parent_to = parent_index(to);

    let mut changes = Vec::new();

    for (id, _) in to.iter().filter(|(id, _)| !from.contains_key(*id)) {
        if let Some(&parent_id) = parent_to.get(id) {
            changes.push(Change::Added {
                node_id: *id,
                parent_id,
            });
        }
    }

    for (id, _) in from.iter().filter(|(id, _)| !to.contains_key(*id)) {
        if let Some(&parent_id) = parent_from.get(id) {
            changes.push(Change::Removed {
                node_id: *id,
                parent_id,
            });
        }
    }

    for (id, from_node) in from {
        let Some(to_node) = to.get(id) else { continue };

        if from_node.name != to_node.name {
            changes.push(Change::Renamed {
                node_id: *id,
                name_from: from_node.name.clone(),
                name_to: to_node.name.clone(),
            });
        }

        let parent_from_id = parent_from.get(id).copied();
        let parent_to_id = parent_to.get(id).copied();
        if let (Some(pf), Some(pt)) = (parent_from_id, parent_to_id) {
            if pf != pt {
                changes.push(Change::Moved {
                    node_id: *id,
                    parent_from: pf,
                    parent_to: pt,
                });
            }
        }

        let (deltas, attachment_changes) = property_deltas(*id, from_node, to_node);
        if !deltas.is_empty() {
            changes.push(Change::PropertyChanged { node_id: *id, deltas });
        }
        changes.extend(attachment_changes);
    }

    for (parent_id, from_node) in from {
        let Some(to_node) = to.get(parent_id) else { continue };
        if !from_node.children.is_empty() && from_node.children != to_node.children {
            changes.push(Change::OrderChanged {
                parent_id: *parent_id,
                order_from: from_node.children.clone(),
                order_to: to_node.children.clone(),
            });
        }
    }

    sort_changes(&mut changes);
    changes
}

fn parent_index(nodes: &BTreeMap<NodeId, Node>) -> BTreeMap<NodeId, NodeId> {
    let mut parent_of = BTreeMap::new();
    for (parent_id, node) in nodes {
        for child_id in &node.children {
            parent_of.insert(*child_id, *parent_id);
        }
    }
    parent_of
}

/// Resolved-open-question: attachment-typed properties are reported as
/// [`Change::AttachmentChanged`] rather than a generic [`PropertyDelta`], so
/// callers can distinguish "this file changed" from an ordinary scalar edit
/// (see DESIGN.md).
fn property_deltas(node_id: NodeId, from: &Node, to: &Node) -> (Vec<PropertyDelta>, Vec<Change>) {
    let mut deltas = Vec::new();
    let mut attachment_changes = Vec::new();

    match (&from.description, &to.description) {
        (None, Some(_)) => deltas.push(PropertyDelta {
            key: "description".to_owned(),
            kind: PropertyDeltaKind::Added,
        }),
        (Some(_), None) => deltas.push(PropertyDelta {
            key: "description".to_owned(),
            kind: PropertyDeltaKind::Removed,
        }),
        (Some(a), Some(b)) if a != b => deltas.push(PropertyDelta {
            key: "description".to_owned(),
            kind: PropertyDeltaKind::Updated,
        }),
        _ => {}
    }

    let keys: BTreeSet<&String> = from.properties.keys().chain(to.properties.keys()).collect();
    for key in keys {
        let pa = from.properties.get(key);
        let pb = to.properties.get(key);
        let is_attachment = pa.is_some_and(|p| p.is_attachment_reference()) || pb.is_some_and(|p| p.is_attachment_reference());

        if is_attachment {
            let hash_from = pa.and_then(|p| p.value.as_str()).map(str::to_owned);
            let hash_to = pb.and_then(|p| p.value.as_str()).map(str::to_owned);
            if hash_from != hash_to {
                attachment_changes.push(Change::AttachmentChanged {
                    node_id,
                    key: key.clone(),
                    hash_from,
                    hash_to,
                });
            }
            continue;
        }

        match (pa, pb) {
            (None, Some(_)) => deltas.push(PropertyDelta {
                key: key.clone(),
                kind: PropertyDeltaKind::Added,
            }),
            (Some(_), None) => deltas.push(PropertyDelta {
                key: key.clone(),
                kind: PropertyDeltaKind::Removed,
            }),
            (Some(a), Some(b)) => {
                let changed = a.effective_type_hint() != b.effective_type_hint() || !canonical_json::values_equal(&a.value, &b.value);
                if changed {
                    deltas.push(PropertyDelta {
                        key: key.clone(),
                        kind: PropertyDeltaKind::Updated,
                    });
                }
            }
            (None, None) => {}
        }
    }

    (deltas, attachment_changes)
}
