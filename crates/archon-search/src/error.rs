//! Error types for the search index.

use thiserror::Error;

/// Errors returned by [`crate::SearchIndex`] operations.
#[derive(Debug, Error)]
pub enum SearchError {
    /// The underlying SQLite database returned an error.
    #[error("search index database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A query argument was rejected before reaching the database.
    #[error("invalid search query: {reason}")]
    InvalidQuery {
        /// Why the query was rejected.
        reason: String,
    },
}
