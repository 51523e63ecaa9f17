//! Rebuildable FTS5-backed secondary search index for Archon node trees
//! (S6, §4.6).
//!
//! The index is a cache: every row here is derivable from node JSON, so
//! there is no migration path, only `rebuild`. Disabling it in config turns
//! every writer into a no-op while queries simply return nothing.

pub mod error;
pub mod query;
pub mod schema;
pub mod writer;

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::Connection;

pub use error::SearchError;
pub use query::{build_fts_query, search_by_path, search_nodes, search_properties, get_nodes_by_depth, NodeHit, PropertyHit};
pub use writer::{IndexedNode, IndexedProperty};

/// A handle to one project's search index.
pub struct SearchIndex {
    conn: Connection,
    enabled: bool,
}

impl SearchIndex {
    /// Open (creating if necessary) the index database at `path`.
    ///
    /// # Errors
    /// Propagates any `rusqlite` error opening the connection or
    /// initializing the schema.
    pub fn open(path: &Path, enabled: bool) -> Result<Self, SearchError> {
        let conn = Connection::open(path)?;
        schema::initialize(&conn)?;
        Ok(Self { conn, enabled })
    }

    /// Open an in-memory index, mainly for tests.
    ///
    /// # Errors
    /// Propagates any `rusqlite` error initializing the schema.
    pub fn open_in_memory() -> Result<Self, SearchError> {
        let conn = Connection::open_in_memory()?;
        schema::initialize(&conn)?;
        Ok(Self { conn, enabled: true })
    }

    /// `true` if writes are active. When `false`, every writer method is a
    /// no-op (§4.6: "it may be disabled; all writers become no-ops").
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Upsert one node's row and its properties.
    ///
    /// # Errors
    /// Propagates any `rusqlite` error.
    pub fn index_node(&self, node: &IndexedNode, now: DateTime<Utc>) -> Result<(), SearchError> {
        if !self.enabled {
            return Ok(());
        }
        writer::index_node(&self.conn, node, now)
    }

    /// Remove a node's row and cascade its properties.
    ///
    /// # Errors
    /// Propagates any `rusqlite` error.
    pub fn remove_node(&self, node_id: &str) -> Result<(), SearchError> {
        if !self.enabled {
            return Ok(());
        }
        writer::remove_node(&self.conn, node_id)
    }

    /// Truncate and reinsert every node and property in one transaction.
    ///
    /// # Errors
    /// Propagates any `rusqlite` error.
    pub fn rebuild(&mut self, nodes: &[IndexedNode], now: DateTime<Utc>) -> Result<(), SearchError> {
        if !self.enabled {
            return Ok(());
        }
        writer::rebuild(&mut self.conn, nodes, now)
    }

    /// Full-text search over node `{name, description, path}`.
    ///
    /// # Errors
    /// Propagates any `rusqlite` error.
    pub fn search_nodes(&self, q: &str, limit: u32) -> Result<Vec<NodeHit>, SearchError> {
        query::search_nodes(&self.conn, q, limit)
    }

    /// Full-text search over `{key, value}` property pairs.
    ///
    /// # Errors
    /// Propagates any `rusqlite` error.
    pub fn search_properties(&self, q: &str, limit: u32) -> Result<Vec<PropertyHit>, SearchError> {
        query::search_properties(&self.conn, q, limit)
    }

    /// Enumerate node IDs whose display path starts with `prefix`.
    ///
    /// # Errors
    /// Propagates any `rusqlite` error.
    pub fn search_by_path(&self, prefix: &str, limit: u32) -> Result<Vec<String>, SearchError> {
        query::search_by_path(&self.conn, prefix, limit)
    }

    /// Enumerate node IDs at exactly `depth`.
    ///
    /// # Errors
    /// Propagates any `rusqlite` error.
    pub fn get_nodes_by_depth(&self, depth: u32, limit: u32) -> Result<Vec<String>, SearchError> {
        query::get_nodes_by_depth(&self.conn, depth, limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z").unwrap().with_timezone(&Utc)
    }

    fn node(id: &str) -> IndexedNode {
        IndexedNode {
            id: id.to_owned(),
            name: "Alpha".to_owned(),
            description: None,
            parent_id: None,
            path: "Root > Alpha".to_owned(),
            depth: 1,
            child_count: 0,
            created_at: now(),
            updated_at: now(),
            properties: vec![],
        }
    }

    #[test]
    fn disabled_index_writers_are_no_ops() {
        let conn = Connection::open_in_memory().unwrap();
        schema::initialize(&conn).unwrap();
        let index = SearchIndex { conn, enabled: false };

        index.index_node(&node("n1"), now()).unwrap();
        let hits = index.search_by_path("Root", 10).unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn enabled_index_round_trips() {
        let index = SearchIndex::open_in_memory().unwrap();
        index.index_node(&node("n1"), now()).unwrap();
        let hits = index.search_by_path("Root", 10).unwrap();
        assert_eq!(hits, vec!["n1".to_owned()]);
    }
}
