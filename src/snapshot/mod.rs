//! The Snapshot Manager (S4, §4.4): named, immutable points in project
//! history, recorded as git tags with a best-effort JSON sidecar.

pub mod manager;
pub mod sidecar;

pub use manager::SnapshotManager;
