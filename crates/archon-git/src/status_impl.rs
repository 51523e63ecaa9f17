//! gix-backed dirty-worktree detection.

use crate::error::GitError;
use crate::gix_repo::GixRepo;

pub fn is_dirty(repo: &GixRepo) -> Result<bool, GitError> {
    repo.repo.is_dirty().map_err(|e| GitError::BackendError {
        message: format!("failed to check worktree status: {e}"),
    })
}
