//! The three-way merge engine (S3, §4.3): classifies divergent changes
//! against a common ancestor into auto-applicable and conflicting sets, and
//! replays the auto-applicable set into the Node Store.

pub mod apply;
pub mod classify;
pub mod logical_key;

use std::path::Path;

use archon_git::GitRepo;

use crate::diff::{load_nodes, resolve_revision};
use crate::error::ArchonError;
use crate::store::NodeStore;

pub use apply::{apply, AppliedChange, ApplyOutcome};
pub use classify::{classify, Resolution};
pub use logical_key::Entry;

/// Resolve `base`/`ours`/`theirs` revision specs, classify the three-way
/// diff, and return the resulting [`Resolution`] without touching the
/// working tree.
///
/// # Errors
/// Propagates any error resolving or loading one of the three revisions.
pub fn classify_revisions(
    repo: &dyn GitRepo,
    project_root: &Path,
    base: &str,
    ours: &str,
    theirs: &str,
) -> Result<Resolution, ArchonError> {
    let base_rev = resolve_revision(repo, base)?;
    let ours_rev = resolve_revision(repo, ours)?;
    let theirs_rev = resolve_revision(repo, theirs)?;

    let base_nodes = load_nodes(repo, project_root, base_rev)?;
    let ours_nodes = load_nodes(repo, project_root, ours_rev)?;
    let theirs_nodes = load_nodes(repo, project_root, theirs_rev)?;

    Ok(classify(&base_nodes, &ours_nodes, &theirs_nodes))
}

/// Classify `base`/`ours`/`theirs`, then apply the result to `store` if it
/// is clean.
///
/// # Errors
/// Returns [`ArchonError::MergeConflict`] if classification finds
/// conflicts; otherwise propagates any error from resolution or apply.
pub fn merge_revisions(
    repo: &dyn GitRepo,
    store: &mut NodeStore,
    base: &str,
    ours: &str,
    theirs: &str,
    now: chrono::DateTime<chrono::Utc>,
) -> Result<ApplyOutcome, ArchonError> {
    let resolution = classify_revisions(repo, store.root(), base, ours, theirs)?;
    apply(&resolution, store, now)
}
