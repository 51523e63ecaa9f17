//! Shared CLI plumbing: locating the enclosing project and opening the git
//! and node-store handles every subcommand needs.

use std::path::{Path, PathBuf};

use archon_git::GixRepo;

use crate::config::ArchonConfig;
use crate::error::ArchonError;
use crate::lock;
use crate::model::layout;

/// Everything a subcommand needs once a project has been located.
pub struct Context {
    /// The project root (the directory containing `project.json`).
    pub root: PathBuf,
    /// The git repository backing this project.
    pub repo: GixRepo,
    /// The project's loaded configuration.
    pub config: ArchonConfig,
}

impl Context {
    /// Discover the enclosing project from the current directory and open
    /// its git repository and configuration.
    ///
    /// # Errors
    /// Returns [`ArchonError::NoProject`] if no `project.json` is found in
    /// the current directory or any ancestor, [`ArchonError::InvariantViolation`]
    /// if the project has a live busy marker (§5), or propagates any error
    /// opening the git repository or loading configuration.
    pub fn discover() -> Result<Self, ArchonError> {
        let cwd = std::env::current_dir()?;
        let root = find_project_root(&cwd).ok_or(ArchonError::NoProject)?;
        let repo = GixRepo::open(&root)?;
        let config = ArchonConfig::load(&layout::config_path(&root))?;
        lock::check_not_busy(&root, config.lock_timeout_secs)?;
        Ok(Self { root, repo, config })
    }
}

fn find_project_root(start: &Path) -> Option<PathBuf> {
    let mut dir = start;
    loop {
        if layout::project_path(dir).is_file() {
            return Some(dir.to_path_buf());
        }
        dir = dir.parent()?;
    }
}
