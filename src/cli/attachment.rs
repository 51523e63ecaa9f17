//! `archon attachment` (§6, §4.5).

use std::collections::BTreeSet;
use std::io::{self, Read, Write};
use std::path::PathBuf;

use clap::Subcommand;

use archon_attachments::{gc_collect, AttachmentError, AttachmentStore};

use crate::error::ArchonError;
use crate::store;

use super::common::Context;

#[derive(Subcommand)]
pub enum AttachmentCommand {
    /// Store a file (or stdin, with `-`) as an attachment.
    Add {
        /// Path to the file to store, or `-` to read from stdin.
        path: String,
        /// Display filename to record (defaults to the path's file name, or
        /// `"stdin"` when reading from `-`).
        #[arg(long)]
        name: Option<String>,
    },
    /// List every stored attachment hash.
    List,
    /// Retrieve a stored attachment's bytes.
    Get {
        /// The attachment's hash.
        hash: String,
        /// Write to this path instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Remove a stored attachment.
    Remove {
        /// The attachment's hash.
        hash: String,
        /// Remove even if the hash is still referenced by a node property.
        #[arg(long)]
        force: bool,
    },
    /// Verify stored attachments still hash to their filename.
    Verify {
        /// Verify every stored attachment instead of the given hashes.
        #[arg(long)]
        all: bool,
        /// Hashes to verify.
        hashes: Vec<String>,
    },
    /// Delete every stored blob no longer referenced by a node property.
    Gc {
        /// Report what would be removed without deleting anything.
        #[arg(long)]
        dry_run: bool,
    },
}

pub fn run(cmd: AttachmentCommand) -> Result<i32, ArchonError> {
    let ctx = Context::discover()?;
    let store = AttachmentStore::new(&ctx.root, ctx.config.attachments.lfs_threshold_bytes);

    match cmd {
        AttachmentCommand::Add { path, name } => {
            let (filename, record) = if path == "-" {
                let mut buf = Vec::new();
                io::stdin().read_to_end(&mut buf).map_err(ArchonError::from)?;
                let filename = name.unwrap_or_else(|| "stdin".to_owned());
                (filename.clone(), store.store(&buf, &filename, chrono::Utc::now()).map_err(attachment_err)?)
            } else {
                let bytes = std::fs::read(&path)?;
                let filename = name.unwrap_or_else(|| {
                    PathBuf::from(&path)
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_else(|| path.clone())
                });
                (filename.clone(), store.store(&bytes, &filename, chrono::Utc::now()).map_err(attachment_err)?)
            };
            let _ = filename;
            println!("{}", serde_json::to_string_pretty(&record).unwrap_or_default());
        }
        AttachmentCommand::List => {
            for hash in store.list_hashes().map_err(attachment_err)? {
                println!("{hash}");
            }
        }
        AttachmentCommand::Get { hash, output } => {
            let mut file = match store.retrieve(&hash) {
                Ok(f) => f,
                Err(AttachmentError::NotFound { .. }) => {
                    eprintln!("attachment '{hash}' not found");
                    return Ok(1);
                }
                Err(e) => return Err(attachment_err(e)),
            };
            match output {
                Some(path) => {
                    let mut buf = Vec::new();
                    file.read_to_end(&mut buf)?;
                    std::fs::write(&path, buf)?;
                }
                None => {
                    io::copy(&mut file, &mut io::stdout())?;
                }
            }
        }
        AttachmentCommand::Remove { hash, force } => {
            if !force {
                let live = live_attachment_hashes(&ctx.root)?;
                if live.contains(&hash) {
                    eprintln!("attachment '{hash}' is still referenced; use --force to remove anyway");
                    return Ok(1);
                }
            }
            match store.delete(&hash) {
                Ok(()) => println!("removed attachment '{hash}'"),
                Err(AttachmentError::NotFound { .. }) => {
                    eprintln!("attachment '{hash}' not found");
                    return Ok(1);
                }
                Err(e) => return Err(attachment_err(e)),
            }
        }
        AttachmentCommand::Verify { all, hashes } => {
            let targets = if all { store.list_hashes().map_err(attachment_err)? } else { hashes };
            let mut failed = 0;
            for hash in targets {
                match store.verify(&hash) {
                    Ok(()) => println!("{hash}\tok"),
                    Err(e) => {
                        failed += 1;
                        println!("{hash}\tFAILED: {e}");
                    }
                }
            }
            if failed > 0 {
                return Ok(1);
            }
        }
        AttachmentCommand::Gc { dry_run } => {
            let live = live_attachment_hashes(&ctx.root)?;
            let report = gc_collect(&store, &live, dry_run).map_err(attachment_err)?;
            if report.dry_run {
                println!("{} attachment(s) would be removed:", report.removed.len());
            } else {
                println!("removed {} attachment(s):", report.removed.len());
            }
            for hash in &report.removed {
                println!("  {hash}");
            }
        }
    }
    Ok(0)
}

/// Every attachment hash referenced by a node property anywhere in the live
/// tree, used by `remove` (without `--force`) and `gc` to decide what is
/// still live.
fn live_attachment_hashes(project_root: &std::path::Path) -> Result<BTreeSet<String>, ArchonError> {
    let nodes = store::load_all_nodes_at(project_root)?;
    let mut hashes = BTreeSet::new();
    for node in nodes.values() {
        for property in node.properties.values() {
            if property.is_attachment_reference() {
                if let Some(hash) = property.value.as_str() {
                    hashes.insert(hash.to_owned());
                }
            }
        }
    }
    Ok(hashes)
}

fn attachment_err(e: AttachmentError) -> ArchonError {
    ArchonError::StorageFailure { detail: e.to_string() }
}
