//! Cooperative busy lock (§5): refuses to open a project whose `.archon/`
//! carries a busy marker younger than the configured timeout.
//!
//! The marker is advisory, not an OS file lock — it protects against two
//! Archon processes racing on the same working tree, not against a crashed
//! process holding a stale marker forever: once a marker is older than the
//! timeout it is treated as abandoned and ignored.

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::ArchonError;
use crate::model::layout;

/// Contents of `.archon/busy.json`.
#[derive(Clone, Debug, Serialize, Deserialize)]
struct BusyMarker {
    pid: u32,
    hostname: String,
    started_at: i64,
}

impl BusyMarker {
    fn now(hostname: String) -> Self {
        Self {
            pid: std::process::id(),
            hostname,
            started_at: unix_now(),
        }
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Best-effort local hostname, without pulling in a dedicated dependency.
fn local_hostname() -> String {
    std::env::var("HOSTNAME")
        .or_else(|_| std::env::var("COMPUTERNAME"))
        .unwrap_or_else(|_| "unknown-host".to_owned())
}

/// Refuse to proceed if `.archon/busy.json` exists and is younger than
/// `timeout_secs`.
///
/// A missing marker, or one that fails to parse, is not an error — it is
/// treated the same as "not busy" so a hand-edited or half-written marker
/// never wedges a project shut.
///
/// # Errors
/// Returns [`ArchonError::InvariantViolation`] if a live marker is found.
pub fn check_not_busy(root: &Path, timeout_secs: u64) -> Result<(), ArchonError> {
    let path = layout::busy_path(root);
    let raw = match std::fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(_) => return Ok(()),
    };
    let Ok(marker) = serde_json::from_str::<BusyMarker>(&raw) else {
        return Ok(());
    };

    let age = unix_now().saturating_sub(marker.started_at);
    if age >= 0 && (age as u64) < timeout_secs {
        return Err(ArchonError::InvariantViolation {
            detail: format!(
                "project is busy: locked by pid {} on {} {age}s ago (timeout {timeout_secs}s)",
                marker.pid, marker.hostname
            ),
        });
    }
    Ok(())
}

/// RAII guard for an exclusive-lock-holding operation (snapshot create or
/// restore, merge apply): writes `.archon/busy.json` on [`Self::acquire`] and
/// removes it on drop, including on an early return via `?`.
pub struct BusyGuard {
    path: std::path::PathBuf,
}

impl BusyGuard {
    /// Check the project is not already busy, then claim it.
    ///
    /// # Errors
    /// Returns [`ArchonError::InvariantViolation`] if another marker is
    /// already live, or an I/O error if the marker cannot be written.
    pub fn acquire(root: &Path, timeout_secs: u64) -> Result<Self, ArchonError> {
        check_not_busy(root, timeout_secs)?;
        let path = layout::busy_path(root);
        let marker = BusyMarker::now(local_hostname());
        let json = layout::to_sorted_pretty_json(&marker)
            .map_err(|e| ArchonError::StorageFailure { detail: e.to_string() })?;
        layout::atomic_write(&path, json.as_bytes())?;
        Ok(Self { path })
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}
