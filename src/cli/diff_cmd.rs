//! `archon diff` (§6, §4.2).

use clap::Args;

use crate::error::ArchonError;
use crate::model::diff::Change;

use super::common::Context;

/// Compare two revisions' node trees.
#[derive(Args)]
pub struct DiffArgs {
    /// Revision to compare from (`working`, an OID, a ref, or a snapshot name).
    from: String,
    /// Revision to compare to.
    to: String,

    /// Print only the aggregate summary, not individual changes.
    #[arg(long)]
    summary_only: bool,

    /// Emit machine-readable JSON instead of text.
    #[arg(long)]
    json: bool,

    /// Include `AttachmentChanged` and `PropertyChanged` categories (on by
    /// default; reserved for parity with the human-facing CLI description).
    #[arg(long)]
    semantic: bool,

    /// Restrict output to a comma-separated list of change kinds (e.g.
    /// `added,removed,renamed,moved,property,order,attachment`).
    #[arg(long, value_delimiter = ',')]
    only: Vec<String>,

    /// Print only the affected node/parent IDs, one per line.
    #[arg(long, conflicts_with = "name_status")]
    name_only: bool,

    /// Print `<kind>\t<id>` pairs, one per line.
    #[arg(long, conflicts_with = "name_only")]
    name_status: bool,

    /// Exit 1 if any changes were found, instead of 0.
    #[arg(long)]
    exit_code: bool,
}

pub fn run(args: DiffArgs) -> Result<i32, ArchonError> {
    let _ = args.semantic;
    let ctx = Context::discover()?;
    let result = crate::diff::diff_revisions(&ctx.repo, &ctx.root, &args.from, &args.to)?;

    let changes: Vec<&Change> = result
        .changes
        .iter()
        .filter(|c| matches_filter(c, &args.only))
        .collect();

    if args.json {
        let payload = serde_json::json!({
            "summary": result.summary,
            "changes": changes,
        });
        println!("{}", serde_json::to_string_pretty(&payload).unwrap_or_default());
    } else if args.name_only {
        for c in &changes {
            println!("{}", c.primary_key());
        }
    } else if args.name_status {
        for c in &changes {
            println!("{}\t{}", kind_label(c), c.primary_key());
        }
    } else if args.summary_only {
        print_summary(&result.summary);
    } else {
        print_summary(&result.summary);
        for c in &changes {
            println!("{}\t{}", kind_label(c), c.primary_key());
        }
    }

    if args.exit_code && !changes.is_empty() {
        return Ok(1);
    }
    Ok(0)
}

fn matches_filter(change: &Change, only: &[String]) -> bool {
    if only.is_empty() {
        return true;
    }
    only.iter().any(|kind| kind_label(change).eq_ignore_ascii_case(kind))
}

fn kind_label(change: &Change) -> &'static str {
    match change {
        Change::Added { .. } => "added",
        Change::Removed { .. } => "removed",
        Change::Renamed { .. } => "renamed",
        Change::Moved { .. } => "moved",
        Change::PropertyChanged { .. } => "property",
        Change::OrderChanged { .. } => "order",
        Change::AttachmentChanged { .. } => "attachment",
    }
}

fn print_summary(summary: &crate::model::diff::Summary) {
    println!(
        "{} change(s): +{} -{} renamed={} moved={} property={} order={} attachment={}",
        summary.total,
        summary.added,
        summary.removed,
        summary.renamed,
        summary.moved,
        summary.property_changed,
        summary.order_changed,
        summary.attachment_changed
    );
}
