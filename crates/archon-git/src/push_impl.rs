//! Push operations via git CLI subprocess.
//!
//! Push is kept as a CLI subprocess rather than a gix-native call: it is the
//! one operation that routinely needs credential helpers, SSH agents, and
//! transport negotiation that gix does not yet reimplement end to end.
//! Everything else in this crate reads and writes objects directly against
//! the on-disk object database.

use std::process::{Command, Stdio};
use std::time::Duration;

use crate::cancel::CancelToken;
use crate::error::GitError;
use crate::gix_repo::GixRepo;

/// How often the push subprocess is polled for completion or cancellation.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

fn workdir_of(repo: &GixRepo) -> Result<&std::path::Path, GitError> {
    repo.workdir.as_deref().ok_or_else(|| GitError::BackendError {
        message: "push requires a working tree (bare repositories are not supported)".to_owned(),
    })
}

fn run_git(repo: &GixRepo, args: &[&str], cancel: &CancelToken, operation: &str) -> Result<(), GitError> {
    let dir = workdir_of(repo)?;
    let mut child = Command::new("git")
        .args(args)
        .current_dir(dir)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| GitError::BackendError {
            message: format!("failed to spawn git: {e}"),
        })?;

    loop {
        if let Some(status) = child.try_wait().map_err(|e| GitError::BackendError {
            message: format!("failed to poll git subprocess: {e}"),
        })? {
            let output = child.wait_with_output().map_err(|e| GitError::BackendError {
                message: format!("failed to collect git output: {e}"),
            })?;
            return if status.success() {
                Ok(())
            } else {
                Err(GitError::PushFailed {
                    remote: args.get(1).unwrap_or(&"").to_string(),
                    message: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
                })
            };
        }

        if cancel.is_cancelled() {
            let _ = child.kill();
            let _ = child.wait();
            return Err(GitError::Cancelled {
                operation: operation.to_owned(),
            });
        }

        std::thread::sleep(POLL_INTERVAL);
    }
}

pub fn push_branch(
    repo: &GixRepo,
    remote: &str,
    local_ref: &str,
    remote_ref: &str,
    force: bool,
    cancel: &CancelToken,
) -> Result<(), GitError> {
    let refspec = format!("{local_ref}:{remote_ref}");
    let mut args = vec!["push"];
    if force {
        args.push("--force");
    }
    args.push(remote);
    args.push(&refspec);
    run_git(repo, &args, cancel, &format!("push to {remote}"))
}

pub fn push_tag(repo: &GixRepo, remote: &str, tag: &str, cancel: &CancelToken) -> Result<(), GitError> {
    run_git(repo, &["push", remote, tag], cancel, &format!("push to {remote}"))
}
