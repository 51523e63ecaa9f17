//! archon library crate — version-controlled knowledge workbench with
//! semantic diff, three-way merge, snapshots, and search over hierarchical
//! node trees.
//!
//! The primary interface is the `archon` CLI binary, which wires these
//! modules to `clap` subcommands (see [`cli`]). Library consumers can use
//! each module directly: [`store`] for the node tree, [`diff`] for semantic
//! comparison, [`merge`] for three-way merge, and [`snapshot`] for named
//! history points.

pub mod canonical_json;
pub mod cli;
pub mod config;
pub mod diff;
pub mod error;
pub mod lock;
pub mod merge;
pub mod model;
pub mod snapshot;
pub mod store;
pub mod telemetry;
