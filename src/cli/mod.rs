//! CLI surface (§6): `snapshot`, `diff`, `merge`, `attachment`, and `search`
//! commands, each exiting 0 on success, 1 on operational error, 2 on usage
//! error (the latter enforced by `clap` itself before any subcommand runs).

pub mod attachment;
pub mod common;
pub mod diff_cmd;
pub mod merge_cmd;
pub mod search_cmd;
pub mod snapshot_cmd;

use clap::{Parser, Subcommand};

use crate::error::ArchonError;

/// archon — version-controlled knowledge workbench.
#[derive(Parser)]
#[command(name = "archon", version, about)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Initialize a new Archon project in the current directory.
    Init {
        /// Project name recorded in `project.json`.
        #[arg(default_value = "project")]
        name: String,
    },

    /// Create, list, inspect, and restore snapshots.
    #[command(subcommand)]
    Snapshot(snapshot_cmd::SnapshotCommand),

    /// Compare two revisions' node trees.
    Diff(diff_cmd::DiffArgs),

    /// Three-way merge two revisions against a common ancestor.
    Merge(merge_cmd::MergeArgs),

    /// Manage content-addressed attachments.
    #[command(subcommand)]
    Attachment(attachment::AttachmentCommand),

    /// Query or rebuild the search index.
    #[command(subcommand)]
    Search(search_cmd::SearchCommand),
}

/// Dispatch a parsed [`Cli`] invocation, returning the process exit code
/// (0 success, 1 operational error).
#[must_use]
pub fn run(cli: Cli) -> i32 {
    let result = match cli.command {
        Command::Init { name } => run_init(&name),
        Command::Snapshot(cmd) => snapshot_cmd::run(cmd),
        Command::Diff(args) => diff_cmd::run(args),
        Command::Merge(args) => merge_cmd::run(args),
        Command::Attachment(cmd) => attachment::run(cmd),
        Command::Search(cmd) => search_cmd::run(cmd),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            1
        }
    }
}

fn run_init(name: &str) -> Result<i32, ArchonError> {
    let cwd = std::env::current_dir()?;
    crate::model::layout::init_project(&cwd, name)?;
    println!("initialized Archon project '{name}' in {}", cwd.display());
    Ok(0)
}
