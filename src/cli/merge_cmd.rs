//! `archon merge` (§6, §4.3).

use chrono::Utc;
use clap::Args;

use crate::error::ArchonError;
use crate::lock::BusyGuard;
use crate::merge::{apply, classify_revisions};
use crate::store::NodeStore;

use super::common::Context;

/// Three-way merge two revisions against a common ancestor.
#[derive(Args)]
pub struct MergeArgs {
    /// The common ancestor revision.
    base: String,
    /// "Our" revision.
    ours: String,
    /// "Their" revision.
    theirs: String,

    /// Classify and report but do not write anything to the working tree.
    #[arg(long)]
    dry_run: bool,

    /// Emit machine-readable JSON instead of text.
    #[arg(long)]
    json: bool,

    /// Print every applied change, not just the totals.
    #[arg(long)]
    verbose: bool,
}

pub fn run(args: MergeArgs) -> Result<i32, ArchonError> {
    let ctx = Context::discover()?;
    let resolution = classify_revisions(&ctx.repo, &ctx.root, &args.base, &args.ours, &args.theirs)?;

    if !resolution.is_clean() {
        if args.json {
            let payload = serde_json::json!({
                "clean": false,
                "conflicts": resolution.conflicts.iter().map(|c| serde_json::json!({
                    "logicalKey": c.logical_key,
                    "description": c.description,
                })).collect::<Vec<_>>(),
            });
            println!("{}", serde_json::to_string_pretty(&payload).unwrap_or_default());
        } else {
            println!("merge conflict in {} location(s):", resolution.conflicts.len());
            for c in &resolution.conflicts {
                println!("  - {c}");
            }
        }
        return Ok(1);
    }

    if args.dry_run {
        report_outcome(
            &args,
            resolution.ours_only.len() + resolution.theirs_only.len(),
            &[],
            true,
        );
        return Ok(0);
    }

    let _guard = BusyGuard::acquire(&ctx.root, ctx.config.lock_timeout_secs)?;
    let mut store = NodeStore::open(&ctx.root)?;
    let outcome = apply(&resolution, &mut store, Utc::now())?;
    report_outcome(&args, outcome.applied.len(), &outcome.applied, false);
    if !outcome.advisory.is_empty() {
        eprintln!(
            "{} change(s) were not auto-applied and need manual review (see --verbose)",
            outcome.advisory.len()
        );
    }
    Ok(0)
}

fn report_outcome(args: &MergeArgs, applied_count: usize, applied: &[crate::merge::AppliedChange], dry_run: bool) {
    if args.json {
        let payload = serde_json::json!({
            "clean": true,
            "dryRun": dry_run,
            "appliedCount": applied_count,
            "applied": applied.iter().map(|a| serde_json::json!({
                "logicalKey": a.logical_key,
                "description": a.description,
            })).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&payload).unwrap_or_default());
        return;
    }

    if dry_run {
        println!("merge is clean: {applied_count} change(s) would be applied");
    } else {
        println!("merge applied: {applied_count} change(s)");
    }
    if args.verbose {
        for a in applied {
            println!("  - {}: {}", a.logical_key, a.description);
        }
    }
}
