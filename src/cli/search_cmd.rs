//! `archon search` (§6, §4.6).

use chrono::Utc;
use clap::Subcommand;

use crate::error::ArchonError;
use crate::store::NodeStore;

use super::common::Context;

#[derive(Subcommand)]
pub enum SearchCommand {
    /// Full-text search over node name, description, and path.
    Nodes {
        /// Query text. Bare terms match as a prefix; `"quoted phrases"` match
        /// verbatim.
        query: String,
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },
    /// Full-text search over property keys and values.
    Properties {
        /// Query text, same syntax as `nodes`.
        query: String,
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },
    /// List node IDs whose display path starts with `prefix`.
    Path {
        /// Path prefix, e.g. `"Root > Auth"`.
        prefix: String,
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },
    /// List node IDs at exactly `depth` from the root.
    Depth {
        /// Depth from the root (the root itself is `0`).
        depth: u32,
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },
    /// Rebuild the search index from the node files on disk.
    Rebuild,
}

pub fn run(cmd: SearchCommand) -> Result<i32, ArchonError> {
    let ctx = Context::discover()?;
    let mut store = NodeStore::open(&ctx.root)?;

    if !store.search_enabled() {
        eprintln!("search index is disabled ([search].enabled = false in .archon/config.toml)");
        return Ok(1);
    }

    match cmd {
        SearchCommand::Nodes { query, limit } => {
            for hit in store.search_nodes(&query, limit)? {
                println!("{}\t{}\t{}", hit.node_id, hit.path, hit.snippet);
            }
        }
        SearchCommand::Properties { query, limit } => {
            for hit in store.search_properties(&query, limit)? {
                println!("{}\t{}={}", hit.node_id, hit.key, hit.value);
            }
        }
        SearchCommand::Path { prefix, limit } => {
            for id in store.search_by_path(&prefix, limit)? {
                println!("{id}");
            }
        }
        SearchCommand::Depth { depth, limit } => {
            for id in store.nodes_at_depth(depth, limit)? {
                println!("{id}");
            }
        }
        SearchCommand::Rebuild => {
            store.rebuild_index(Utc::now())?;
            println!("search index rebuilt");
        }
    }
    Ok(0)
}
