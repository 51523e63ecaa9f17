//! Search contract (§4.6): ranked full-text search, property search,
//! path-prefix search, and depth-bucket enumeration.

use rusqlite::{params, Connection};

use crate::error::SearchError;

/// One ranked hit from [`search_nodes`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeHit {
    /// Matching node's identifier.
    pub node_id: String,
    /// Matching node's name.
    pub name: String,
    /// Matching node's denormalized display path.
    pub path: String,
    /// Highlighted snippet around the match.
    pub snippet: String,
}

/// One hit from [`search_properties`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PropertyHit {
    /// Owning node's identifier.
    pub node_id: String,
    /// Property key.
    pub key: String,
    /// Property value, as stored (its canonical JSON string form).
    pub value: String,
}

/// Expand a user query into an FTS5 `MATCH` expression: bare terms gain a
/// trailing `*` for prefix matching, quoted phrases are preserved verbatim.
#[must_use]
pub fn build_fts_query(q: &str) -> String {
    let mut out = String::new();
    let mut chars = q.chars().peekable();
    let mut first = true;

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        if !first {
            out.push(' ');
        }
        first = false;

        if c == '"' {
            out.push(chars.next().expect("peeked"));
            for next in chars.by_ref() {
                out.push(next);
                if next == '"' {
                    break;
                }
            }
        } else {
            let mut term = String::new();
            while let Some(&c) = chars.peek() {
                if c.is_whitespace() {
                    break;
                }
                term.push(c);
                chars.next();
            }
            out.push_str(&term);
            if !term.ends_with('*') {
                out.push('*');
            }
        }
    }
    out
}

/// Full-text search over node `{name, description, path}` (§4.6 `SearchNodes`).
///
/// # Errors
/// Propagates any `rusqlite` error, including a malformed FTS5 query.
pub fn search_nodes(conn: &Connection, q: &str, limit: u32) -> Result<Vec<NodeHit>, SearchError> {
    let fts_query = build_fts_query(q);
    let mut stmt = conn.prepare(
        "SELECT nodes.id, nodes.name, nodes.path,
                snippet(nodes_fts, -1, '[', ']', '...', 10)
         FROM nodes_fts
         JOIN nodes ON nodes.rowid = nodes_fts.rowid
         WHERE nodes_fts MATCH ?1
         ORDER BY rank
         LIMIT ?2",
    )?;
    let rows = stmt.query_map(params![fts_query, limit], |row| {
        Ok(NodeHit {
            node_id: row.get(0)?,
            name: row.get(1)?,
            path: row.get(2)?,
            snippet: row.get(3)?,
        })
    })?;
    rows.collect::<Result<Vec<_>, _>>().map_err(SearchError::from)
}

/// Full-text search over `{key, value}` property pairs (§4.6 `SearchProperties`).
///
/// # Errors
/// Propagates any `rusqlite` error, including a malformed FTS5 query.
pub fn search_properties(conn: &Connection, q: &str, limit: u32) -> Result<Vec<PropertyHit>, SearchError> {
    let fts_query = build_fts_query(q);
    let mut stmt = conn.prepare(
        "SELECT properties.node_id, properties.key, properties.value
         FROM properties_fts
         JOIN properties ON properties.rowid = properties_fts.rowid
         WHERE properties_fts MATCH ?1
         ORDER BY rank
         LIMIT ?2",
    )?;
    let rows = stmt.query_map(params![fts_query, limit], |row| {
        Ok(PropertyHit {
            node_id: row.get(0)?,
            key: row.get(1)?,
            value: row.get(2)?,
        })
    })?;
    rows.collect::<Result<Vec<_>, _>>().map_err(SearchError::from)
}

/// Enumerate node IDs whose display path starts with `prefix` (§4.6
/// `SearchByPath`).
///
/// # Errors
/// Propagates any `rusqlite` error.
pub fn search_by_path(conn: &Connection, prefix: &str, limit: u32) -> Result<Vec<String>, SearchError> {
    let mut stmt = conn.prepare("SELECT id FROM nodes WHERE path LIKE ?1 ORDER BY path LIMIT ?2")?;
    let pattern = format!("{prefix}%");
    let rows = stmt.query_map(params![pattern, limit], |row| row.get(0))?;
    rows.collect::<Result<Vec<_>, _>>().map_err(SearchError::from)
}

/// Enumerate node IDs at exactly `depth` (§4.6 `GetNodesByDepth`).
///
/// # Errors
/// Propagates any `rusqlite` error.
pub fn get_nodes_by_depth(conn: &Connection, depth: u32, limit: u32) -> Result<Vec<String>, SearchError> {
    let mut stmt = conn.prepare("SELECT id FROM nodes WHERE depth = ?1 ORDER BY name LIMIT ?2")?;
    let rows = stmt.query_map(params![depth, limit], |row| row.get(0))?;
    rows.collect::<Result<Vec<_>, _>>().map_err(SearchError::from)
}
