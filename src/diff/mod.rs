//! The semantic diff engine (S2, §4.2) — compares two node-tree revisions
//! and produces a deterministic, typed change set.

pub mod engine;

pub use engine::{diff_nodes, diff_revisions, load_nodes, resolve_revision, DiffResult, Revision};
