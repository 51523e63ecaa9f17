//! The Node Store (§4.1): CRUD and structural operations over the node tree.
//!
//! Every node is its own JSON file at `nodes/<id>.json`; `project.json` holds
//! the root pointer. Writes go through [`atomic_write`](crate::model::layout::atomic_write)
//! so a reader never observes a half-written file. There is no in-memory
//! database — each call reads exactly the files it needs, which keeps
//! concurrent single-writer access (§5) simple to reason about.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use archon_search::{IndexedNode, IndexedProperty, SearchIndex};

use crate::config::ArchonConfig;
use crate::error::{ArchonError, Repair};
use crate::model::ids::NodeId;
use crate::model::layout::{self, atomic_write};
use crate::model::node::{Node, ProjectManifest, PropertyValue};

/// Handle onto an Archon project's node tree on disk.
///
/// Every mutation also updates the search index (§4.6): best-effort, so an
/// index failure never blocks the node-store write that triggered it — it is
/// logged and left for the next [`NodeStore::rebuild_index`] to fix.
pub struct NodeStore {
    root: PathBuf,
    manifest: ProjectManifest,
    search: Option<SearchIndex>,
}

impl NodeStore {
    /// Open an existing project at `root`, loading its manifest.
    ///
    /// # Errors
    /// Returns [`ArchonError::NoProject`] if `project.json` is missing, or
    /// [`ArchonError::StorageFailure`] if it cannot be parsed.
    pub fn open(root: &Path) -> Result<Self, ArchonError> {
        let path = layout::project_path(root);
        let raw = std::fs::read_to_string(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ArchonError::NoProject
            } else {
                ArchonError::Io(e)
            }
        })?;
        let manifest: ProjectManifest = serde_json::from_str(&raw).map_err(|e| ArchonError::StorageFailure {
            detail: format!("project.json is corrupt: {e}"),
        })?;
        if let Err(e) = repair_duplicate_parent_claims(root) {
            tracing::warn!(error = %e, "duplicate-parent-claim repair sweep failed; continuing with tree as-is");
        }
        Ok(Self {
            root: root.to_owned(),
            manifest,
            search: open_search_index(root),
        })
    }

    /// Initialize a fresh project at `root` (idempotent) and open it.
    ///
    /// # Errors
    /// Returns [`ArchonError::Io`] on any filesystem failure.
    pub fn init(root: &Path, project_name: &str) -> Result<Self, ArchonError> {
        let manifest = layout::init_project(root, project_name)?;
        Ok(Self {
            root: root.to_owned(),
            manifest,
            search: open_search_index(root),
        })
    }

    /// The project root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The loaded project manifest.
    #[must_use]
    pub fn manifest(&self) -> &ProjectManifest {
        &self.manifest
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Fetch a single node by ID.
    ///
    /// # Errors
    /// Returns [`ArchonError::NotFound`] if no such node file exists.
    pub fn get_node(&self, id: NodeId) -> Result<Node, ArchonError> {
        self.read_node(id)
    }

    /// Fetch the project's root node.
    ///
    /// # Errors
    /// Returns [`ArchonError::NotFound`] if the root node file is missing.
    pub fn get_root_node(&self) -> Result<Node, ArchonError> {
        self.read_node(self.manifest.root_id)
    }

    /// List the direct children of `id`, in order.
    ///
    /// # Errors
    /// Returns [`ArchonError::NotFound`] if `id` does not exist.
    pub fn list_children(&self, id: NodeId) -> Result<Vec<Node>, ArchonError> {
        let parent = self.read_node(id)?;
        parent.children.iter().map(|child_id| self.read_node(*child_id)).collect()
    }

    /// Return the path from the root to `id`, inclusive, root first.
    ///
    /// # Errors
    /// Returns [`ArchonError::NotFound`] if `id` does not exist, or
    /// [`ArchonError::StorageFailure`] if the tree is too deep to be well
    /// formed (cycle guard — should be unreachable given [`move_node`](Self::move_node)'s
    /// invariant enforcement, but load-time corruption is still possible).
    pub fn get_node_path(&self, id: NodeId) -> Result<Vec<Node>, ArchonError> {
        let all = self.load_all_nodes()?;
        let parent_of = parent_index(&all);

        let mut chain = vec![id];
        let mut current = id;
        for _ in 0..=all.len() {
            match parent_of.get(&current) {
                Some(&parent_id) => {
                    chain.push(parent_id);
                    if parent_id == self.manifest.root_id {
                        break;
                    }
                    current = parent_id;
                }
                None => break,
            }
        }
        chain.reverse();
        chain
            .into_iter()
            .map(|node_id| {
                all.get(&node_id).cloned().ok_or(ArchonError::NotFound {
                    kind: "node",
                    id: node_id.to_string(),
                })
            })
            .collect()
    }

    /// Load every node file under `nodes/` into memory, keyed by ID.
    ///
    /// Used by the diff engine (working-tree revisions), repair checks, and
    /// any operation that needs the whole tree at once. Malformed files are
    /// skipped with a warning rather than failing the whole load.
    ///
    /// # Errors
    /// Returns [`ArchonError::Io`] if the `nodes/` directory cannot be read.
    pub fn load_all_nodes(&self) -> Result<BTreeMap<NodeId, Node>, ArchonError> {
        load_all_nodes_at(&self.root)
    }

    /// Find the current parent of `id`, if any (the root has none).
    ///
    /// # Errors
    /// Returns [`ArchonError::Io`] if the tree cannot be read.
    pub fn parent_of(&self, id: NodeId) -> Result<Option<NodeId>, ArchonError> {
        let all = self.load_all_nodes()?;
        Ok(parent_index(&all).get(&id).copied())
    }

    /// Run the load-time integrity check (§4.1 failure semantics: orphans,
    /// duplicate parent claims, unknown children).
    ///
    /// # Errors
    /// Returns [`ArchonError::Io`] if the tree cannot be read.
    pub fn check_integrity(&self) -> Result<Repair, ArchonError> {
        let all = self.load_all_nodes()?;
        Ok(check_integrity(&all, self.manifest.root_id))
    }

    /// `true` if this store has a live search index (disabled-in-config and
    /// failed-to-open both read as `false`).
    #[must_use]
    pub fn search_enabled(&self) -> bool {
        self.search.as_ref().is_some_and(SearchIndex::is_enabled)
    }

    /// Full-text search over node name/description/path.
    ///
    /// # Errors
    /// Returns [`ArchonError::SearchFailure`] if the underlying query fails.
    pub fn search_nodes(&self, q: &str, limit: u32) -> Result<Vec<archon_search::NodeHit>, ArchonError> {
        self.search.as_ref().map_or_else(|| Ok(Vec::new()), |s| s.search_nodes(q, limit).map_err(ArchonError::from))
    }

    /// Full-text search over `{key, value}` property pairs.
    ///
    /// # Errors
    /// Returns [`ArchonError::SearchFailure`] if the underlying query fails.
    pub fn search_properties(&self, q: &str, limit: u32) -> Result<Vec<archon_search::PropertyHit>, ArchonError> {
        self.search.as_ref().map_or_else(|| Ok(Vec::new()), |s| s.search_properties(q, limit).map_err(ArchonError::from))
    }

    /// Enumerate node IDs whose display path starts with `prefix`.
    ///
    /// # Errors
    /// Returns [`ArchonError::SearchFailure`] if the underlying query fails.
    pub fn search_by_path(&self, prefix: &str, limit: u32) -> Result<Vec<String>, ArchonError> {
        self.search.as_ref().map_or_else(|| Ok(Vec::new()), |s| s.search_by_path(prefix, limit).map_err(ArchonError::from))
    }

    /// Enumerate node IDs at exactly `depth`.
    ///
    /// # Errors
    /// Returns [`ArchonError::SearchFailure`] if the underlying query fails.
    pub fn nodes_at_depth(&self, depth: u32, limit: u32) -> Result<Vec<String>, ArchonError> {
        self.search.as_ref().map_or_else(|| Ok(Vec::new()), |s| s.get_nodes_by_depth(depth, limit).map_err(ArchonError::from))
    }

    /// Rebuild the search index from scratch by re-reading every node file
    /// (§4.6 `RebuildIndex`). A no-op if no index is open.
    ///
    /// # Errors
    /// Returns [`ArchonError::SearchFailure`] if the rebuild transaction
    /// fails, or [`ArchonError::Io`] if the tree cannot be read.
    pub fn rebuild_index(&mut self, now: DateTime<Utc>) -> Result<(), ArchonError> {
        if self.search.is_none() {
            return Ok(());
        }
        let all = self.load_all_nodes()?;
        let parent_of = parent_index(&all);
        let indexed: Vec<IndexedNode> = all
            .iter()
            .map(|(id, node)| {
                let (path, depth) = build_path(&all, &parent_of, *id);
                to_indexed_node(node, parent_of.get(id).copied(), &path, depth)
            })
            .collect();
        if let Some(search) = self.search.as_mut() {
            search.rebuild(&indexed, now)?;
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    /// Create a new node as the last child of `parent_id`.
    ///
    /// # Errors
    /// Returns [`ArchonError::InvalidInput`] if `name` is blank, or
    /// [`ArchonError::NotFound`] if `parent_id` does not exist.
    pub fn create_node(
        &mut self,
        parent_id: NodeId,
        name: &str,
        description: Option<String>,
        properties: BTreeMap<String, PropertyValue>,
        now: DateTime<Utc>,
    ) -> Result<Node, ArchonError> {
        if !Node::is_valid_name(name) {
            return Err(ArchonError::InvalidInput {
                field: "name".to_owned(),
                reason: "must not be empty or whitespace-only".to_owned(),
            });
        }
        let mut parent = self.read_node(parent_id)?;

        let mut node = Node::new(name.to_owned(), description, now);
        node.properties = properties;

        parent.children.push(node.id);
        parent.updated_at = now;

        self.write_node(&node)?;
        self.write_node(&parent)?;
        self.reindex(&node);
        self.reindex(&parent);
        Ok(node)
    }

    /// Update a node's name, description, and/or properties in place.
    ///
    /// `description` uses double-`Option` to distinguish "leave unchanged"
    /// (`None`) from "clear the description" (`Some(None)`). `properties`,
    /// when given, replaces the entire property map.
    ///
    /// # Errors
    /// Returns [`ArchonError::NotFound`] if `id` does not exist, or
    /// [`ArchonError::InvalidInput`] if a new name is blank.
    pub fn update_node(
        &mut self,
        id: NodeId,
        name: Option<String>,
        description: Option<Option<String>>,
        properties: Option<BTreeMap<String, PropertyValue>>,
        now: DateTime<Utc>,
    ) -> Result<Node, ArchonError> {
        let mut node = self.read_node(id)?;
        if let Some(name) = name {
            if !Node::is_valid_name(&name) {
                return Err(ArchonError::InvalidInput {
                    field: "name".to_owned(),
                    reason: "must not be empty or whitespace-only".to_owned(),
                });
            }
            node.name = name;
        }
        if let Some(description) = description {
            node.description = description;
        }
        if let Some(properties) = properties {
            node.properties = properties;
        }
        node.updated_at = now;
        self.write_node(&node)?;
        self.reindex(&node);
        Ok(node)
    }

    /// Set (or overwrite) a single property.
    ///
    /// # Errors
    /// Returns [`ArchonError::NotFound`] if `id` does not exist.
    pub fn set_property(
        &mut self,
        id: NodeId,
        key: &str,
        value: PropertyValue,
        now: DateTime<Utc>,
    ) -> Result<Node, ArchonError> {
        let mut node = self.read_node(id)?;
        node.properties.insert(key.to_owned(), value);
        node.updated_at = now;
        self.write_node(&node)?;
        self.reindex(&node);
        Ok(node)
    }

    /// Remove a single property. No-op if the key is absent.
    ///
    /// # Errors
    /// Returns [`ArchonError::NotFound`] if `id` does not exist.
    pub fn delete_property(&mut self, id: NodeId, key: &str, now: DateTime<Utc>) -> Result<Node, ArchonError> {
        let mut node = self.read_node(id)?;
        node.properties.remove(key);
        node.updated_at = now;
        self.write_node(&node)?;
        self.reindex(&node);
        Ok(node)
    }

    /// Delete a node and its entire subtree.
    ///
    /// The root node cannot be deleted.
    ///
    /// # Errors
    /// Returns [`ArchonError::InvariantViolation`] if `id` is the root, or
    /// [`ArchonError::NotFound`] if `id` does not exist.
    pub fn delete_node(&mut self, id: NodeId, now: DateTime<Utc>) -> Result<(), ArchonError> {
        if id == self.manifest.root_id {
            return Err(ArchonError::InvariantViolation {
                detail: "the root node cannot be deleted".to_owned(),
            });
        }
        let all = self.load_all_nodes()?;
        let parent_of = parent_index(&all);
        let parent_id = parent_of.get(&id).copied().ok_or(ArchonError::NotFound {
            kind: "node",
            id: id.to_string(),
        })?;

        let mut to_remove = BTreeSet::new();
        collect_subtree(&all, id, &mut to_remove);

        let mut parent = self.read_node(parent_id)?;
        parent.children.retain(|c| *c != id);
        parent.updated_at = now;
        self.write_node(&parent)?;
        self.reindex(&parent);

        for node_id in to_remove {
            let path = layout::node_path(&self.root, &node_id);
            if path.exists() {
                std::fs::remove_file(path)?;
            }
            self.remove_from_index(node_id);
        }
        Ok(())
    }

    /// Move `node_id` to become a child of `new_parent_id`, optionally at a
    /// specific zero-based `position` in the new parent's children (appended
    /// if `None` or out of range).
    ///
    /// Rejects moves that would create a cycle: walks
    /// `new_parent_id → parent(new_parent_id) → …` up to the root; if
    /// `node_id` appears in that chain, the move is rejected (§4.1).
    ///
    /// # Errors
    /// Returns [`ArchonError::InvariantViolation`] for a cyclic move or a
    /// move of the root node, [`ArchonError::NotFound`] if either node is
    /// missing.
    pub fn move_node(
        &mut self,
        node_id: NodeId,
        new_parent_id: NodeId,
        position: Option<usize>,
        now: DateTime<Utc>,
    ) -> Result<(), ArchonError> {
        if node_id == self.manifest.root_id {
            return Err(ArchonError::InvariantViolation {
                detail: "the root node cannot be moved".to_owned(),
            });
        }
        if node_id == new_parent_id {
            return Err(ArchonError::InvariantViolation {
                detail: "a node cannot become its own parent".to_owned(),
            });
        }

        let all = self.load_all_nodes()?;
        if !all.contains_key(&new_parent_id) {
            return Err(ArchonError::NotFound {
                kind: "node",
                id: new_parent_id.to_string(),
            });
        }
        let parent_of = parent_index(&all);
        let old_parent_id = parent_of.get(&node_id).copied().ok_or(ArchonError::NotFound {
            kind: "node",
            id: node_id.to_string(),
        })?;

        let mut walker = Some(new_parent_id);
        while let Some(current) = walker {
            if current == node_id {
                return Err(ArchonError::InvariantViolation {
                    detail: format!(
                        "moving node {node_id} under {new_parent_id} would create a cycle"
                    ),
                });
            }
            walker = parent_of.get(&current).copied();
        }

        // Write order matters for crash-safety: attach to the new parent
        // before detaching from the old one (§4.1). A crash between the two
        // writes then leaves the node claimed by both parents — a
        // duplicate parent claim the next `open` resolves by preferring the
        // newer parent — rather than claimed by neither, which would be an
        // unrecoverable orphan.
        let mut new_parent = self.read_node(new_parent_id)?;
        if new_parent_id == old_parent_id {
            new_parent.children.retain(|c| *c != node_id);
        }
        let insert_at = position.map_or(new_parent.children.len(), |p| p.min(new_parent.children.len()));
        new_parent.children.insert(insert_at, node_id);
        new_parent.updated_at = now;
        self.write_node(&new_parent)?;

        let old_parent = if new_parent_id == old_parent_id {
            new_parent.clone()
        } else {
            let mut old_parent = self.read_node(old_parent_id)?;
            old_parent.children.retain(|c| *c != node_id);
            old_parent.updated_at = now;
            self.write_node(&old_parent)?;
            old_parent
        };

        let mut node = self.read_node(node_id)?;
        node.updated_at = now;
        self.write_node(&node)?;

        self.reindex(&new_parent);
        self.reindex(&old_parent);
        self.reindex_subtree(node_id);

        Ok(())
    }

    /// Reorder `parent_id`'s children to exactly `ordered`.
    ///
    /// `ordered` must be a permutation of the parent's current children.
    ///
    /// # Errors
    /// Returns [`ArchonError::InvariantViolation`] if `ordered` is not a
    /// permutation of the current children, or [`ArchonError::NotFound`] if
    /// `parent_id` does not exist.
    pub fn reorder_children(
        &mut self,
        parent_id: NodeId,
        ordered: Vec<NodeId>,
        now: DateTime<Utc>,
    ) -> Result<(), ArchonError> {
        let mut parent = self.read_node(parent_id)?;

        let current: BTreeSet<NodeId> = parent.children.iter().copied().collect();
        let proposed: BTreeSet<NodeId> = ordered.iter().copied().collect();
        if current != proposed || ordered.len() != parent.children.len() {
            return Err(ArchonError::InvariantViolation {
                detail: "reorder_children requires a permutation of the current children".to_owned(),
            });
        }

        parent.children = ordered;
        parent.updated_at = now;
        self.write_node(&parent)
    }

    // -----------------------------------------------------------------------
    // Internal helpers
    // -----------------------------------------------------------------------

    /// Best-effort reindex of a single node. Errors are logged, never
    /// propagated: a stale index entry is recoverable via
    /// [`rebuild_index`](Self::rebuild_index), but a blocked node-store
    /// write is not (§7 propagation rule for index failures).
    fn reindex(&self, node: &Node) {
        let Some(search) = &self.search else { return };
        let all = match self.load_all_nodes() {
            Ok(all) => all,
            Err(e) => {
                tracing::warn!(node = %node.id, error = %e, "could not load tree to reindex node; index may be stale");
                return;
            }
        };
        let parent_of = parent_index(&all);
        let (path, depth) = build_path(&all, &parent_of, node.id);
        let indexed = to_indexed_node(node, parent_of.get(&node.id).copied(), &path, depth);
        if let Err(e) = search.index_node(&indexed, node.updated_at) {
            tracing::warn!(node = %node.id, error = %e, "search index update failed; index may be stale until rebuilt");
        }
    }

    /// Best-effort reindex of `id` and every descendant, for moves (whose
    /// `path`/`depth` changes ripple through the whole subtree).
    fn reindex_subtree(&self, id: NodeId) {
        if self.search.is_none() {
            return;
        }
        let all = match self.load_all_nodes() {
            Ok(all) => all,
            Err(e) => {
                tracing::warn!(node = %id, error = %e, "could not load tree to reindex subtree; index may be stale");
                return;
            }
        };
        let parent_of = parent_index(&all);
        let mut subtree = BTreeSet::new();
        collect_subtree(&all, id, &mut subtree);
        for node_id in subtree {
            let Some(node) = all.get(&node_id) else { continue };
            let (path, depth) = build_path(&all, &parent_of, node_id);
            let indexed = to_indexed_node(node, parent_of.get(&node_id).copied(), &path, depth);
            if let Some(search) = &self.search {
                if let Err(e) = search.index_node(&indexed, node.updated_at) {
                    tracing::warn!(node = %node_id, error = %e, "search index update failed; index may be stale until rebuilt");
                }
            }
        }
    }

    /// Best-effort removal of `id` from the search index.
    fn remove_from_index(&self, id: NodeId) {
        let Some(search) = &self.search else { return };
        if let Err(e) = search.remove_node(&id.to_string()) {
            tracing::warn!(node = %id, error = %e, "search index removal failed; index may be stale until rebuilt");
        }
    }

    fn read_node(&self, id: NodeId) -> Result<Node, ArchonError> {
        read_node_at(&self.root, id)
    }

    fn write_node(&self, node: &Node) -> Result<(), ArchonError> {
        write_node_at(&self.root, node)
    }
}

fn read_node_at(root: &Path, id: NodeId) -> Result<Node, ArchonError> {
    let path = layout::node_path(root, &id);
    let raw = std::fs::read_to_string(&path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ArchonError::NotFound {
                kind: "node",
                id: id.to_string(),
            }
        } else {
            ArchonError::Io(e)
        }
    })?;
    serde_json::from_str(&raw).map_err(|e| ArchonError::StorageFailure {
        detail: format!("node file '{id}.json' is corrupt: {e}"),
    })
}

fn write_node_at(root: &Path, node: &Node) -> Result<(), ArchonError> {
    let path = layout::node_path(root, &node.id);
    let json = layout::to_sorted_pretty_json(node).map_err(|e| ArchonError::StorageFailure {
        detail: format!("failed to serialize node '{}': {e}", node.id),
    })?;
    atomic_write(&path, json.as_bytes())?;
    Ok(())
}

/// Load every `nodes/<id>.json` file under `root`. Standalone so the diff
/// engine can load a "working" revision without constructing a full
/// [`NodeStore`].
///
/// # Errors
/// Returns [`ArchonError::Io`] if the `nodes/` directory cannot be read.
pub fn load_all_nodes_at(root: &Path) -> Result<BTreeMap<NodeId, Node>, ArchonError> {
    let dir = root.join(layout::NODES_DIR);
    let mut out = BTreeMap::new();
    if !dir.exists() {
        return Ok(out);
    }
    for entry in std::fs::read_dir(&dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.extension().and_then(std::ffi::OsStr::to_str) != Some("json") {
            continue;
        }
        let raw = std::fs::read_to_string(&path)?;
        match serde_json::from_str::<Node>(&raw) {
            Ok(node) => {
                out.insert(node.id, node);
            }
            Err(e) => {
                tracing::warn!(file = %path.display(), error = %e, "skipping malformed node file");
            }
        }
    }
    Ok(out)
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

fn collect_subtree(nodes: &BTreeMap<NodeId, Node>, id: NodeId, out: &mut BTreeSet<NodeId>) {
    if !out.insert(id) {
        return;
    }
    if let Some(node) = nodes.get(&id) {
        for child_id in &node.children {
            collect_subtree(nodes, *child_id, out);
        }
    }
}

/// Open the project's search index at its canonical path
/// (`.archon/index/archon.db`, §6), honoring the `[search].enabled` config
/// flag. Returns `None` (rather than failing the whole store open) if the
/// database cannot be opened — search becomes unavailable for this session
/// but node-store reads and writes are unaffected.
fn open_search_index(root: &Path) -> Option<SearchIndex> {
    let config = ArchonConfig::load(&layout::config_path(root)).unwrap_or_default();
    match SearchIndex::open(&layout::index_db_path(root), config.search.enabled) {
        Ok(index) => Some(index),
        Err(e) => {
            tracing::warn!(error = %e, "failed to open search index; continuing without it");
            None
        }
    }
}

/// Compute `id`'s denormalized display path (`"Root > … > Name"`) and depth
/// from the root, by walking `parent_of` from `id` upward.
fn build_path(all: &BTreeMap<NodeId, Node>, parent_of: &BTreeMap<NodeId, NodeId>, id: NodeId) -> (String, u32) {
    let mut chain = vec![id];
    let mut current = id;
    while let Some(&parent_id) = parent_of.get(&current) {
        chain.push(parent_id);
        current = parent_id;
    }
    chain.reverse();
    let depth = u32::try_from(chain.len().saturating_sub(1)).unwrap_or(u32::MAX);
    let path = chain
        .iter()
        .filter_map(|node_id| all.get(node_id).map(|n| n.name.as_str()))
        .collect::<Vec<_>>()
        .join(" > ");
    (path, depth)
}

fn to_indexed_node(node: &Node, parent_id: Option<NodeId>, path: &str, depth: u32) -> IndexedNode {
    IndexedNode {
        id: node.id.to_string(),
        name: node.name.clone(),
        description: node.description.clone(),
        parent_id: parent_id.map(|p| p.to_string()),
        path: path.to_owned(),
        depth,
        child_count: u32::try_from(node.children.len()).unwrap_or(u32::MAX),
        created_at: node.created_at,
        updated_at: node.updated_at,
        properties: node
            .properties
            .iter()
            .map(|(key, value)| IndexedProperty {
                key: key.clone(),
                value: value.value.clone(),
                type_hint: value
                    .type_hint
                    .and_then(|th| serde_json::to_value(th).ok())
                    .and_then(|v| v.as_str().map(str::to_owned)),
            })
            .collect(),
    }
}

/// Check the loaded tree for the three integrity problems described in
/// §4.1: orphaned nodes, nodes claimed by more than one parent, and
/// `children` entries with no corresponding node file.
#[must_use]
pub fn check_integrity(nodes: &BTreeMap<NodeId, Node>, root_id: NodeId) -> Repair {
    let mut claim_count: BTreeMap<NodeId, u32> = BTreeMap::new();
    let mut unknown_children = Vec::new();

    for node in nodes.values() {
        for child_id in &node.children {
            *claim_count.entry(*child_id).or_insert(0) += 1;
            if !nodes.contains_key(child_id) {
                unknown_children.push(child_id.to_string());
            }
        }
    }

    let duplicate_parent_claims: Vec<String> = claim_count
        .iter()
        .filter(|(_, &count)| count > 1)
        .map(|(id, _)| id.to_string())
        .collect();

    let orphans: Vec<String> = nodes
        .keys()
        .filter(|id| **id != root_id && !claim_count.contains_key(*id))
        .map(NodeId::to_string)
        .collect();

    unknown_children.sort();
    unknown_children.dedup();

    Repair {
        orphans,
        duplicate_parent_claims,
        unknown_children,
    }
}

/// Recover from a crash mid-`move_node` (§4.1): a node claimed by more than
/// one parent has its claim kept on the parent with the strictly newer
/// `updatedAt` and removed from the others. A tie between claimants is
/// ambiguous and is left alone, so it still surfaces via
/// [`check_integrity`] for manual resolution. Best-effort: a read or write
/// failure for one claim is logged and the rest of the sweep continues.
fn repair_duplicate_parent_claims(root: &Path) -> Result<(), ArchonError> {
    let nodes = load_all_nodes_at(root)?;
    let mut claimants: BTreeMap<NodeId, Vec<NodeId>> = BTreeMap::new();
    for node in nodes.values() {
        for child_id in &node.children {
            let parents = claimants.entry(*child_id).or_default();
            if !parents.contains(&node.id) {
                parents.push(node.id);
            }
        }
    }

    for (child_id, parent_ids) in claimants {
        if parent_ids.len() < 2 {
            continue;
        }
        let mut by_updated_at: Vec<(NodeId, DateTime<Utc>)> = parent_ids
            .iter()
            .filter_map(|id| nodes.get(id).map(|parent| (*id, parent.updated_at)))
            .collect();
        by_updated_at.sort_by_key(|(_, updated_at)| *updated_at);
        let Some(&(winner, winner_updated_at)) = by_updated_at.last() else {
            continue;
        };
        let ambiguous = by_updated_at
            .iter()
            .rev()
            .nth(1)
            .is_some_and(|(_, updated_at)| *updated_at == winner_updated_at);
        if ambiguous {
            continue;
        }

        for parent_id in &parent_ids {
            if *parent_id == winner {
                continue;
            }
            let mut parent = match read_node_at(root, *parent_id) {
                Ok(parent) => parent,
                Err(e) => {
                    tracing::warn!(parent = %parent_id, child = %child_id, error = %e, "could not load parent to repair duplicate claim");
                    continue;
                }
            };
            parent.children.retain(|c| *c != child_id);
            if let Err(e) = write_node_at(root, &parent) {
                tracing::warn!(parent = %parent_id, child = %child_id, error = %e, "could not write parent to repair duplicate claim");
            }
        }
    }
    Ok(())
}
