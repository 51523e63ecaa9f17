//! Archon's on-disk directory layout and project initialization (§6).

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;

use super::ids::NodeId;
use super::node::ProjectManifest;

/// Archon metadata directory name.
pub const ARCHON_DIR: &str = ".archon";

/// Node JSON files live under `nodes/<id>.json` at the project root.
pub const NODES_DIR: &str = "nodes";

/// Content-addressed attachment store, sharded by the first two hex
/// characters of the hash.
pub const ATTACHMENTS_DIR: &str = "attachments";

/// Search index database directory, under `.archon/`.
pub const INDEX_DIR: &str = "index";

/// Search index database file name.
pub const INDEX_DB_FILE: &str = "archon.db";

/// Snapshot sidecar directory, under `.archon/`.
pub const SNAPSHOTS_DIR: &str = "snapshots";

/// Project manifest file name, at the project root.
pub const PROJECT_FILE: &str = "project.json";

/// Config file name, under `.archon/`.
pub const CONFIG_FILE: &str = "config.toml";

/// Busy-marker file name, under `.archon/` (§5).
pub const BUSY_FILE: &str = "busy.json";

/// Patterns appended to `.gitignore` so generated, rebuildable state is not
/// tracked by Git (the search index is a cache; truth lives in node JSON).
pub const GITIGNORE_PATTERNS: &[&str] = &[".archon/index/", ".archon/*.lock", ".archon/busy.json"];

/// Absolute path to `nodes/<id>.json` under `root`.
#[must_use]
pub fn node_path(root: &Path, id: &NodeId) -> PathBuf {
    root.join(NODES_DIR).join(format!("{id}.json"))
}

/// Absolute path to `project.json` under `root`.
#[must_use]
pub fn project_path(root: &Path) -> PathBuf {
    root.join(PROJECT_FILE)
}

/// Absolute path to the attachment store root under `root`.
#[must_use]
pub fn attachments_dir(root: &Path) -> PathBuf {
    root.join(ATTACHMENTS_DIR)
}

/// Absolute path to `attachments/<xx>/<hash>` under `root`.
///
/// # Panics
/// Panics if `hash` has fewer than two characters; callers are expected to
/// pass a validated 64-hex-char `AttachmentHash`.
#[must_use]
pub fn attachment_path(root: &Path, hash: &str) -> PathBuf {
    let prefix = &hash[..2];
    attachments_dir(root).join(prefix).join(hash)
}

/// Absolute path to the `.archon/` metadata directory under `root`.
#[must_use]
pub fn archon_dir(root: &Path) -> PathBuf {
    root.join(ARCHON_DIR)
}

/// Absolute path to the search index database under `root`.
#[must_use]
pub fn index_db_path(root: &Path) -> PathBuf {
    archon_dir(root).join(INDEX_DIR).join(INDEX_DB_FILE)
}

/// Absolute path to `.archon/snapshots/<name>.json` under `root`.
#[must_use]
pub fn snapshot_sidecar_path(root: &Path, name: &str) -> PathBuf {
    archon_dir(root).join(SNAPSHOTS_DIR).join(format!("{name}.json"))
}

/// Absolute path to `.archon/config.toml` under `root`.
#[must_use]
pub fn config_path(root: &Path) -> PathBuf {
    archon_dir(root).join(CONFIG_FILE)
}

/// Absolute path to `.archon/busy.json` under `root`.
#[must_use]
pub fn busy_path(root: &Path) -> PathBuf {
    archon_dir(root).join(BUSY_FILE)
}

/// Initialize a fresh Archon project under `root`.
///
/// Idempotent: existing directories and an existing `project.json` are left
/// untouched; `.gitignore` gains only the patterns it is missing. Returns
/// the manifest that is now guaranteed to be on disk (freshly written or
/// pre-existing).
///
/// # Errors
/// Returns an `io::Error` if any directory or file operation fails.
pub fn init_project(root: &Path, project_name: &str) -> io::Result<ProjectManifest> {
    create_dir_all_idempotent(root)?;
    create_dir_all_idempotent(&root.join(NODES_DIR))?;
    create_dir_all_idempotent(&attachments_dir(root))?;
    create_dir_all_idempotent(&archon_dir(root).join(INDEX_DIR))?;
    create_dir_all_idempotent(&archon_dir(root).join(SNAPSHOTS_DIR))?;

    let manifest = load_or_init_manifest(root, project_name)?;
    update_gitignore(root)?;
    Ok(manifest)
}

fn load_or_init_manifest(root: &Path, project_name: &str) -> io::Result<ProjectManifest> {
    let path = project_path(root);
    if path.exists() {
        let raw = fs::read_to_string(&path)?;
        let manifest: ProjectManifest = serde_json::from_str(&raw)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        return Ok(manifest);
    }

    let root_node = super::node::Node::new("Root".to_owned(), None, Utc::now());
    let node_json = to_sorted_pretty_json(&root_node)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    atomic_write(&node_path(root, &root_node.id), node_json.as_bytes())?;

    let manifest = ProjectManifest::new(project_name.to_owned(), root_node.id, Utc::now());
    let manifest_json = to_sorted_pretty_json(&manifest)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    atomic_write(&path, manifest_json.as_bytes())?;
    Ok(manifest)
}

/// Serialize `value` as pretty JSON with alphabetically sorted object keys
/// (§6: "sorted keys, 2-space indentation for diff quality"). Struct field
/// order follows declaration order when serialized directly, so this routes
/// through `serde_json::Value` first — its map type sorts by key — before
/// pretty-printing.
///
/// # Errors
/// Returns a `serde_json::Error` if `value` cannot be serialized.
pub fn to_sorted_pretty_json<T: serde::Serialize>(value: &T) -> serde_json::Result<String> {
    let canonical: serde_json::Value = serde_json::to_value(value)?;
    serde_json::to_string_pretty(&canonical)
}

/// Write `contents` to `path` atomically: write to a sibling temp file, then
/// rename. The rename is atomic on the same filesystem, so readers never
/// observe a partially written file (§4.1).
///
/// # Errors
/// Returns an `io::Error` if the temp file cannot be created, written, or
/// renamed into place.
pub fn atomic_write(path: &Path, contents: &[u8]) -> io::Result<()> {
    let dir = path.parent().ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, "path has no parent directory")
    })?;
    create_dir_all_idempotent(dir)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(contents)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

fn create_dir_all_idempotent(path: &Path) -> io::Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)?;
    }
    Ok(())
}

fn update_gitignore(root: &Path) -> io::Result<()> {
    let gitignore_path = root.join(".gitignore");
    let mut content = if gitignore_path.exists() {
        fs::read_to_string(&gitignore_path)?
    } else {
        String::new()
    };

    let existing_patterns: std::collections::HashSet<_> =
        content.lines().map(str::trim).collect();

    let missing: Vec<&str> = GITIGNORE_PATTERNS
        .iter()
        .filter(|p| !existing_patterns.contains(**p))
        .copied()
        .collect();

    if !missing.is_empty() {
        if !content.is_empty() && !content.ends_with('\n') {
            content.push('\n');
        }
        content.push_str("\n# Archon\n");
        for p in missing {
            content.push_str(p);
            content.push('\n');
        }
        fs::write(gitignore_path, content)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn init_project_creates_expected_layout() {
        let dir = tempdir().unwrap();
        let root = dir.path();

        let manifest = init_project(root, "demo").unwrap();

        assert!(root.join(NODES_DIR).is_dir());
        assert!(attachments_dir(root).is_dir());
        assert!(archon_dir(root).join(INDEX_DIR).is_dir());
        assert!(archon_dir(root).join(SNAPSHOTS_DIR).is_dir());
        assert!(project_path(root).is_file());
        assert!(node_path(root, &manifest.root_id).is_file());
        assert!(root.join(".gitignore").is_file());
    }

    #[test]
    fn init_project_is_idempotent() {
        let dir = tempdir().unwrap();
        let root = dir.path();

        let first = init_project(root, "demo").unwrap();
        let second = init_project(root, "demo").unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn attachment_path_shards_by_prefix() {
        let root = Path::new("/proj");
        let hash = "ab".to_owned() + &"0".repeat(62);
        let path = attachment_path(root, &hash);
        assert_eq!(path, root.join("attachments").join("ab").join(&hash));
    }

    #[test]
    fn node_and_manifest_files_have_alphabetically_sorted_keys() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        let manifest = init_project(root, "demo").unwrap();

        let node_raw = fs::read_to_string(node_path(root, &manifest.root_id)).unwrap();
        let node_value: serde_json::Value = serde_json::from_str(&node_raw).unwrap();
        let node_keys: Vec<&String> = node_value.as_object().unwrap().keys().collect();
        let mut sorted_node_keys = node_keys.clone();
        sorted_node_keys.sort();
        assert_eq!(node_keys, sorted_node_keys);

        let manifest_raw = fs::read_to_string(project_path(root)).unwrap();
        let manifest_value: serde_json::Value = serde_json::from_str(&manifest_raw).unwrap();
        let manifest_keys: Vec<&String> = manifest_value.as_object().unwrap().keys().collect();
        let mut sorted_manifest_keys = manifest_keys.clone();
        sorted_manifest_keys.sort();
        assert_eq!(manifest_keys, sorted_manifest_keys);
    }

    #[test]
    fn atomic_write_then_read_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nodes").join("x.json");
        atomic_write(&path, b"{}").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "{}");
    }

    #[test]
    fn gitignore_gains_only_missing_patterns() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join(".gitignore"), ".archon/index/\n").unwrap();

        init_project(root, "demo").unwrap();

        let gitignore = fs::read_to_string(root.join(".gitignore")).unwrap();
        assert_eq!(gitignore.matches(".archon/index/").count(), 1);
        assert!(gitignore.contains(".archon/*.lock"));
    }
}
