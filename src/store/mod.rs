//! The Node Store (S1, §4.1) — CRUD and structural operations over the node
//! tree that every other component builds on.

pub mod node_store;

pub use node_store::{check_integrity, load_all_nodes_at, NodeStore};
