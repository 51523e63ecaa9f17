//! `archon snapshot` (§6, §4.4).

use chrono::Utc;
use clap::Subcommand;

use crate::error::ArchonError;
use crate::lock::BusyGuard;
use crate::model::snapshot::CreateSnapshotRequest;
use crate::snapshot::SnapshotManager;

use super::common::Context;

#[derive(Subcommand)]
pub enum SnapshotCommand {
    /// Create a new snapshot.
    Create {
        /// Unique snapshot name.
        name: String,
        /// Commit message.
        message: String,
        /// Optional longer description.
        description: Option<String>,
    },
    /// List all snapshots, most recent first.
    List,
    /// Show one snapshot's record.
    Get {
        /// Snapshot name.
        name: String,
    },
    /// Restore the working tree to a snapshot's commit.
    Restore {
        /// Snapshot name.
        name: String,
    },
}

pub fn run(cmd: SnapshotCommand) -> Result<i32, ArchonError> {
    let ctx = Context::discover()?;
    let manager = SnapshotManager::new(&ctx.repo, ctx.root.clone(), &ctx.config);

    match cmd {
        SnapshotCommand::Create { name, message, description } => {
            let _guard = BusyGuard::acquire(&ctx.root, ctx.config.lock_timeout_secs)?;
            let record = manager.create(
                CreateSnapshotRequest {
                    name,
                    message,
                    description,
                    labels: Default::default(),
                    metadata: None,
                    author: None,
                },
                Utc::now(),
            )?;
            println!("created snapshot '{}' at {}", record.name, record.hash);
        }
        SnapshotCommand::List => {
            for record in manager.list()? {
                println!("{}\t{}\t{}", record.name, record.hash, record.created_at.to_rfc3339());
            }
        }
        SnapshotCommand::Get { name } => match manager.get(&name)? {
            Some(record) => {
                println!("{}", serde_json::to_string_pretty(&record).unwrap_or_default());
            }
            None => {
                eprintln!("snapshot '{name}' not found");
                return Ok(1);
            }
        },
        SnapshotCommand::Restore { name } => {
            let _guard = BusyGuard::acquire(&ctx.root, ctx.config.lock_timeout_secs)?;
            manager.restore(&name)?;
            println!("restored to snapshot '{name}'");
        }
    }
    Ok(0)
}
