//! Writer contract (§4.6): keep the search index's base tables (and, via
//! triggers, the FTS5 shadow tables) synchronized with the node store.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, TransactionBehavior};

use crate::error::SearchError;

/// One property to index alongside a node.
#[derive(Clone, Debug)]
pub struct IndexedProperty {
    /// Property key.
    pub key: String,
    /// Canonical JSON value, stored as its string serialization.
    pub value: serde_json::Value,
    /// Optional type hint, mirrored from the node's property record.
    pub type_hint: Option<String>,
}

/// A node's indexable fields, denormalized with its position in the tree.
#[derive(Clone, Debug)]
pub struct IndexedNode {
    /// Node identifier, as its canonical string form.
    pub id: String,
    /// Node name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Parent node identifier, `None` for the root.
    pub parent_id: Option<String>,
    /// Denormalized display path, `"Root > … > Name"`.
    pub path: String,
    /// Depth from the root (root is `0`).
    pub depth: u32,
    /// Number of direct children.
    pub child_count: u32,
    /// When the node was created.
    pub created_at: DateTime<Utc>,
    /// When the node was last updated.
    pub updated_at: DateTime<Utc>,
    /// Properties to index alongside the node.
    pub properties: Vec<IndexedProperty>,
}

/// Upsert one node's row and replace its property rows (§4.6 `IndexNode`).
///
/// # Errors
/// Propagates any `rusqlite` error.
pub fn index_node(conn: &Connection, node: &IndexedNode, now: DateTime<Utc>) -> Result<(), SearchError> {
    conn.execute(
        "INSERT INTO nodes (id, name, description, parent_id, path, depth, child_count, created_at, updated_at, indexed_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
         ON CONFLICT(id) DO UPDATE SET
            name = excluded.name,
            description = excluded.description,
            parent_id = excluded.parent_id,
            path = excluded.path,
            depth = excluded.depth,
            child_count = excluded.child_count,
            created_at = excluded.created_at,
            updated_at = excluded.updated_at,
            indexed_at = excluded.indexed_at",
        params![
            node.id,
            node.name,
            node.description,
            node.parent_id,
            node.path,
            node.depth,
            node.child_count,
            node.created_at.to_rfc3339(),
            node.updated_at.to_rfc3339(),
            now.to_rfc3339(),
        ],
    )?;

    conn.execute("DELETE FROM properties WHERE node_id = ?1", params![node.id])?;
    for prop in &node.properties {
        conn.execute(
            "INSERT INTO properties (node_id, key, value, type_hint) VALUES (?1, ?2, ?3, ?4)",
            params![node.id, prop.key, prop.value.to_string(), prop.type_hint],
        )?;
    }
    Ok(())
}

/// Remove a node's row, cascading its properties (§4.6 `RemoveNode`).
///
/// # Errors
/// Propagates any `rusqlite` error.
pub fn remove_node(conn: &Connection, node_id: &str) -> Result<(), SearchError> {
    conn.execute("DELETE FROM properties WHERE node_id = ?1", params![node_id])?;
    conn.execute("DELETE FROM nodes WHERE id = ?1", params![node_id])?;
    Ok(())
}

/// Truncate and reinsert every node and property in a single `BEGIN
/// IMMEDIATE` transaction (§4.6 `RebuildIndex`): the write lock is taken up
/// front rather than on first write, so a concurrent reader never observes
/// the index mid-truncate.
///
/// # Errors
/// Propagates any `rusqlite` error; the transaction rolls back on failure.
pub fn rebuild(conn: &mut Connection, nodes: &[IndexedNode], now: DateTime<Utc>) -> Result<(), SearchError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    tx.execute("DELETE FROM nodes", [])?;
    tx.execute("DELETE FROM properties", [])?;
    for node in nodes {
        index_node(&tx, node, now)?;
    }
    tx.commit()?;
    tracing::info!(count = nodes.len(), "search index rebuilt");
    Ok(())
}
