//! Database schema (§4.6): base tables plus two FTS5 indexes kept in sync by
//! triggers. The index is a cache — every table here is fully derivable from
//! the node store, so there is no migration story, only `rebuild`.

use rusqlite::Connection;

use crate::error::SearchError;

/// Create the schema if it does not already exist. Idempotent.
///
/// # Errors
/// Propagates any `rusqlite` error executing the schema statements.
pub fn initialize(conn: &Connection) -> Result<(), SearchError> {
    conn.execute_batch(
        r"
        PRAGMA journal_mode = WAL;

        CREATE TABLE IF NOT EXISTS nodes (
            id          TEXT PRIMARY KEY,
            name        TEXT NOT NULL,
            description TEXT,
            parent_id   TEXT,
            path        TEXT NOT NULL,
            depth       INTEGER NOT NULL,
            child_count INTEGER NOT NULL,
            created_at  TEXT NOT NULL,
            updated_at  TEXT NOT NULL,
            indexed_at  TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_nodes_parent ON nodes(parent_id);
        CREATE INDEX IF NOT EXISTS idx_nodes_depth ON nodes(depth);
        CREATE INDEX IF NOT EXISTS idx_nodes_path ON nodes(path);

        CREATE TABLE IF NOT EXISTS properties (
            node_id    TEXT NOT NULL,
            key        TEXT NOT NULL,
            value      TEXT NOT NULL,
            type_hint  TEXT,
            PRIMARY KEY (node_id, key)
        );

        CREATE INDEX IF NOT EXISTS idx_properties_node ON properties(node_id);

        CREATE VIRTUAL TABLE IF NOT EXISTS nodes_fts USING fts5(
            name, description, path,
            content = 'nodes',
            content_rowid = 'rowid'
        );

        CREATE VIRTUAL TABLE IF NOT EXISTS properties_fts USING fts5(
            key, value,
            content = 'properties',
            content_rowid = 'rowid'
        );

        CREATE TRIGGER IF NOT EXISTS nodes_ai AFTER INSERT ON nodes BEGIN
            INSERT INTO nodes_fts(rowid, name, description, path)
            VALUES (new.rowid, new.name, new.description, new.path);
        END;

        CREATE TRIGGER IF NOT EXISTS nodes_ad AFTER DELETE ON nodes BEGIN
            INSERT INTO nodes_fts(nodes_fts, rowid, name, description, path)
            VALUES ('delete', old.rowid, old.name, old.description, old.path);
        END;

        CREATE TRIGGER IF NOT EXISTS nodes_au AFTER UPDATE ON nodes BEGIN
            INSERT INTO nodes_fts(nodes_fts, rowid, name, description, path)
            VALUES ('delete', old.rowid, old.name, old.description, old.path);
            INSERT INTO nodes_fts(rowid, name, description, path)
            VALUES (new.rowid, new.name, new.description, new.path);
        END;

        CREATE TRIGGER IF NOT EXISTS properties_ai AFTER INSERT ON properties BEGIN
            INSERT INTO properties_fts(rowid, key, value) VALUES (new.rowid, new.key, new.value);
        END;

        CREATE TRIGGER IF NOT EXISTS properties_ad AFTER DELETE ON properties BEGIN
            INSERT INTO properties_fts(properties_fts, rowid, key, value)
            VALUES ('delete', old.rowid, old.key, old.value);
        END;

        CREATE TRIGGER IF NOT EXISTS properties_au AFTER UPDATE ON properties BEGIN
            INSERT INTO properties_fts(properties_fts, rowid, key, value)
            VALUES ('delete', old.rowid, old.key, old.value);
            INSERT INTO properties_fts(rowid, key, value) VALUES (new.rowid, new.key, new.value);
        END;
        ",
    )?;
    Ok(())
}
