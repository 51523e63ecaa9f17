//! The Snapshot Manager (S4, §4.4): named, immutable points in project
//! history, recorded as annotated git tags with a best-effort sidecar.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use archon_git::{EntryMode, GitOid, GitRepo, RefName, TreeEntry};

use crate::config::ArchonConfig;
use crate::error::ArchonError;
use crate::model::ids::SnapshotName;
use crate::model::layout;
use crate::model::snapshot::{CreateSnapshotRequest, SnapshotRecord};

use super::sidecar;

/// Directory entries never included in a snapshot's tree: git's own
/// metadata, and the paths `.gitignore`'d as rebuildable/generated (§6).
const SKIP_TOP_LEVEL: &[&str] = &[".git"];

/// Trailer line written into every snapshot tag's message, so a snapshot
/// tag renamed away from the `snapshot-` prefix is still recognized (§6
/// "tag object carries a recognized snapshot marker").
const SNAPSHOT_MARKER_PREFIX: &str = "Archon-Snapshot: ";

/// Build the annotated tag message for a snapshot: a human-readable
/// summary followed by the marker trailer `list`/`get` fall back to when a
/// tag no longer matches the `snapshot-<name>` convention.
fn build_tag_message(name: &str, description: Option<&str>) -> String {
    format!(
        "Snapshot: {name}\n\n{}\n\n{SNAPSHOT_MARKER_PREFIX}{name}\n",
        description.unwrap_or("")
    )
}

/// Extract the snapshot name from a tag message's `Archon-Snapshot:`
/// trailer, if present.
fn snapshot_marker(message: &str) -> Option<&str> {
    message.lines().find_map(|line| line.strip_prefix(SNAPSHOT_MARKER_PREFIX)).map(str::trim)
}

/// Recover the human-authored description from a tag message, stopping
/// before the marker trailer so it never leaks into a reconstructed record.
fn description_from_message(message: &str) -> Option<String> {
    let body = message.splitn(2, "\n\n").nth(1).unwrap_or("");
    let marker_start = format!("\n\n{SNAPSHOT_MARKER_PREFIX}");
    let body = body.split(marker_start.as_str()).next().unwrap_or(body).trim();
    (!body.is_empty()).then(|| body.to_owned())
}

/// Manages the lifecycle of snapshots for one project.
pub struct SnapshotManager<'a> {
    repo: &'a dyn GitRepo,
    root: PathBuf,
    branch_ref: RefName,
    default_author: Option<String>,
}

impl<'a> SnapshotManager<'a> {
    /// Create a manager bound to `repo` and `root`, using `config` for
    /// authorship defaults.
    #[must_use]
    pub fn new(repo: &'a dyn GitRepo, root: PathBuf, config: &ArchonConfig) -> Self {
        Self {
            repo,
            root,
            branch_ref: RefName::new("refs/heads/main").expect("literal ref name is valid"),
            default_author: config.snapshot.default_author.clone(),
        }
    }

    /// Create a new snapshot (§4.4 `Create`).
    ///
    /// Validates the name and message, commits the current working tree,
    /// tags the resulting commit, and writes a best-effort sidecar.
    ///
    /// # Errors
    /// Returns [`ArchonError::InvalidInput`] for an empty message,
    /// [`ArchonError::AlreadyExists`] if the name is already taken, or
    /// propagates any I/O or git failure.
    pub fn create(&self, request: CreateSnapshotRequest, now: DateTime<Utc>) -> Result<SnapshotRecord, ArchonError> {
        let name = SnapshotName::new(&request.name)?;
        if request.message.trim().is_empty() {
            return Err(ArchonError::InvalidInput {
                field: "message".to_owned(),
                reason: "snapshot message must not be empty".to_owned(),
            });
        }

        let tag_name = name.tag_name();
        if self.repo.read_tag(&tag_name)?.is_some() {
            return Err(ArchonError::AlreadyExists {
                kind: "snapshot",
                id: name.as_str().to_owned(),
            });
        }

        let tree_oid = build_tree(self.repo, &self.root, &self.root)?;
        let parent = self.repo.read_ref(&self.branch_ref)?;
        let parents: Vec<GitOid> = parent.into_iter().collect();
        let commit_oid = self.repo.create_commit(
            tree_oid,
            &parents,
            &request.message,
            Some(&self.branch_ref),
        )?;

        let author = request
            .author
            .or_else(|| self.default_author.clone())
            .unwrap_or_else(|| "Archon <archon@localhost>".to_owned());
        let tag_message = build_tag_message(name.as_str(), request.description.as_deref());
        self.repo.create_tag(&tag_name, commit_oid, &tag_message, &author)?;

        let record = SnapshotRecord {
            name,
            hash: commit_oid.to_string(),
            message: request.message,
            description: request.description,
            labels: request.labels,
            metadata: request.metadata.unwrap_or_else(|| serde_json::json!({})),
            created_at: now,
            author,
        };
        sidecar::write(&self.root, &record)?;
        Ok(record)
    }

    /// List all snapshots, most recently created first.
    ///
    /// Hydrates each from its sidecar when present; falls back to
    /// reconstructing a best-effort record from the tag and its target
    /// commit when the sidecar is missing (§4.4 `List`). A tag qualifies as
    /// a snapshot if its name matches the `snapshot-` prefix convention or
    /// its message carries the `Archon-Snapshot:` marker (§6), so a
    /// renamed tag is still discovered.
    ///
    /// # Errors
    /// Propagates any git failure.
    pub fn list(&self) -> Result<Vec<SnapshotRecord>, ArchonError> {
        let tags = self.repo.list_tags("")?;
        let mut names = Vec::with_capacity(tags.len());
        for (tag_name, _tag_oid) in tags {
            if let Some(short_name) = tag_name.strip_prefix("snapshot-") {
                names.push(short_name.to_owned());
                continue;
            }
            if let Some(tag_info) = self.repo.read_tag(&tag_name)? {
                if let Some(marker_name) = snapshot_marker(&tag_info.message) {
                    names.push(marker_name.to_owned());
                }
            }
        }

        let mut records = Vec::with_capacity(names.len());
        for name in names {
            if let Some(record) = self.load_record(&name)? {
                records.push(record);
            }
        }
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    /// Look up a single snapshot by name.
    ///
    /// # Errors
    /// Propagates any git failure.
    pub fn get(&self, name: &str) -> Result<Option<SnapshotRecord>, ArchonError> {
        self.load_record(name)
    }

    /// Restore the working tree to a snapshot's commit (§4.4 `Restore`).
    ///
    /// Requires a clean working tree; advances the tracked branch to the
    /// snapshot's commit.
    ///
    /// # Errors
    /// Returns [`ArchonError::NotFound`] if no such snapshot exists,
    /// [`ArchonError::InvariantViolation`] if the working tree is dirty, or
    /// propagates any git failure.
    pub fn restore(&self, name: &str) -> Result<(), ArchonError> {
        let tag_name = SnapshotName::new(name)?.tag_name();
        let tag_info = match self.repo.read_tag(&tag_name)? {
            Some(info) => info,
            None => self.find_tag_by_marker(name)?.ok_or_else(|| ArchonError::NotFound {
                kind: "snapshot",
                id: name.to_owned(),
            })?,
        };

        if self.repo.is_dirty()? {
            return Err(ArchonError::InvariantViolation {
                detail: "working tree has uncommitted changes; commit or discard them before restoring a snapshot".to_owned(),
            });
        }

        let commit = self.repo.read_commit(tag_info.target)?;
        self.repo.checkout_tree(commit.tree_oid, &self.root)?;
        self.repo.write_ref(&self.branch_ref, tag_info.target, &format!("restore snapshot {name}"))?;
        Ok(())
    }

    /// Delete a snapshot's sidecar. The tag itself is never removed — a
    /// snapshot's git tag is permanent once created (§4.4 immutability).
    ///
    /// # Errors
    /// Returns [`ArchonError::NotFound`] if no such snapshot exists, or
    /// propagates any I/O failure.
    pub fn delete(&self, name: &str) -> Result<(), ArchonError> {
        let tag_name = SnapshotName::new(name)?.tag_name();
        let found = self.repo.read_tag(&tag_name)?.is_some() || self.find_tag_by_marker(name)?.is_some();
        if !found {
            return Err(ArchonError::NotFound {
                kind: "snapshot",
                id: name.to_owned(),
            });
        }
        sidecar::delete(&self.root, name)?;
        Ok(())
    }

    fn load_record(&self, name: &str) -> Result<Option<SnapshotRecord>, ArchonError> {
        let canonical = format!("snapshot-{name}");
        let tag_info = match self.repo.read_tag(&canonical)? {
            Some(info) => Some(info),
            None => self.find_tag_by_marker(name)?,
        };
        let Some(tag_info) = tag_info else {
            return Ok(None);
        };

        if let Some(record) = sidecar::read(&self.root, name) {
            return Ok(Some(record));
        }

        // No sidecar: reconstruct a best-effort record. The tag carries no
        // creation timestamp (§4.4), so `created_at` falls back to the Unix
        // epoch as an explicit "unknown" sentinel rather than `now()`, which
        // would fabricate a fresher time than the snapshot actually has.
        let commit = self.repo.read_commit(tag_info.target)?;
        let description = description_from_message(&tag_info.message);

        Ok(Some(SnapshotRecord {
            name: SnapshotName::new(name)?,
            hash: tag_info.target.to_string(),
            message: commit.message,
            description,
            labels: BTreeMap::new(),
            metadata: serde_json::json!({}),
            created_at: DateTime::UNIX_EPOCH,
            author: tag_info.tagger,
        }))
    }

    /// Scan every tag for one whose message carries the `Archon-Snapshot:
    /// <name>` marker, for the case where a snapshot's tag has been renamed
    /// away from the `snapshot-` prefix convention (§6).
    fn find_tag_by_marker(&self, name: &str) -> Result<Option<archon_git::TagInfo>, ArchonError> {
        for (tag_name, _tag_oid) in self.repo.list_tags("")? {
            if tag_name.starts_with("snapshot-") {
                continue;
            }
            let Some(tag_info) = self.repo.read_tag(&tag_name)? else {
                continue;
            };
            if snapshot_marker(&tag_info.message) == Some(name) {
                return Ok(Some(tag_info));
            }
        }
        Ok(None)
    }
}

/// Recursively build a git tree object mirroring the working-tree directory
/// at `dir`, relative to `root`, skipping git's own metadata and the paths
/// `.gitignore`'d as rebuildable (§6).
fn build_tree(repo: &dyn GitRepo, dir: &Path, root: &Path) -> Result<GitOid, ArchonError> {
    let mut entries: Vec<(String, std::fs::DirEntry)> = fs::read_dir(dir)?
        .filter_map(Result::ok)
        .map(|e| (e.file_name().to_string_lossy().into_owned(), e))
        .collect();
    entries.sort_by(|a, b| a.0.cmp(&b.0));

    let mut tree_entries = Vec::new();
    for (name, entry) in entries {
        let path = entry.path();
        let rel = path.strip_prefix(root).unwrap_or(&path);
        if should_skip(rel) {
            continue;
        }

        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            let sub_entries: Vec<_> = fs::read_dir(&path)?.collect();
            if sub_entries.is_empty() {
                continue;
            }
            let oid = build_tree(repo, &path, root)?;
            tree_entries.push(TreeEntry { name, mode: EntryMode::Tree, oid });
        } else if file_type.is_file() {
            let data = fs::read(&path)?;
            let oid = repo.write_blob(&data)?;
            tree_entries.push(TreeEntry { name, mode: EntryMode::Blob, oid });
        }
    }
    Ok(repo.write_tree(&tree_entries)?)
}

fn should_skip(rel: &Path) -> bool {
    let mut components = rel.components();
    let Some(first) = components.next() else {
        return false;
    };
    let first = first.as_os_str().to_string_lossy();
    if SKIP_TOP_LEVEL.contains(&first.as_ref()) {
        return true;
    }
    if first == ".archon" {
        let rest: PathBuf = components.collect();
        let rest = rest.to_string_lossy();
        return rest.starts_with("index") || rest.ends_with(".lock") || rest == layout::BUSY_FILE;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::layout::init_project;

    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeRepo {
        blobs: Mutex<BTreeMap<GitOid, Vec<u8>>>,
        trees: Mutex<BTreeMap<GitOid, Vec<TreeEntry>>>,
        commits: Mutex<BTreeMap<GitOid, archon_git::CommitInfo>>,
        tags: Mutex<BTreeMap<String, (GitOid, archon_git::TagInfo)>>,
        refs: Mutex<BTreeMap<String, GitOid>>,
        dirty: Mutex<bool>,
        next: Mutex<u8>,
    }

    impl FakeRepo {
        fn next_oid(&self) -> GitOid {
            let mut n = self.next.lock().unwrap();
            *n = n.wrapping_add(1);
            let mut bytes = [0u8; 20];
            bytes[0] = *n;
            GitOid::from_bytes(bytes)
        }
    }

    impl GitRepo for FakeRepo {
        fn read_ref(&self, name: &RefName) -> Result<Option<GitOid>, archon_git::GitError> {
            Ok(self.refs.lock().unwrap().get(name.as_str()).copied())
        }
        fn write_ref(&self, name: &RefName, oid: GitOid, _log_message: &str) -> Result<(), archon_git::GitError> {
            self.refs.lock().unwrap().insert(name.as_str().to_owned(), oid);
            Ok(())
        }
        fn delete_ref(&self, name: &RefName) -> Result<(), archon_git::GitError> {
            self.refs.lock().unwrap().remove(name.as_str());
            Ok(())
        }
        fn atomic_ref_update(&self, _edits: &[archon_git::RefEdit]) -> Result<(), archon_git::GitError> {
            Ok(())
        }
        fn list_refs(&self, _prefix: &str) -> Result<Vec<(RefName, GitOid)>, archon_git::GitError> {
            Ok(vec![])
        }
        fn rev_parse(&self, spec: &str) -> Result<GitOid, archon_git::GitError> {
            self.refs
                .lock()
                .unwrap()
                .get(spec)
                .copied()
                .ok_or_else(|| archon_git::GitError::NotFound { message: spec.to_owned() })
        }
        fn rev_parse_opt(&self, spec: &str) -> Result<Option<GitOid>, archon_git::GitError> {
            Ok(self.refs.lock().unwrap().get(spec).copied())
        }
        fn read_blob(&self, oid: GitOid) -> Result<Vec<u8>, archon_git::GitError> {
            Ok(self.blobs.lock().unwrap().get(&oid).cloned().unwrap_or_default())
        }
        fn read_tree(&self, oid: GitOid) -> Result<Vec<TreeEntry>, archon_git::GitError> {
            Ok(self.trees.lock().unwrap().get(&oid).cloned().unwrap_or_default())
        }
        fn read_commit(&self, oid: GitOid) -> Result<archon_git::CommitInfo, archon_git::GitError> {
            self.commits
                .lock()
                .unwrap()
                .get(&oid)
                .cloned()
                .ok_or_else(|| archon_git::GitError::NotFound { message: oid.to_string() })
        }
        fn write_blob(&self, data: &[u8]) -> Result<GitOid, archon_git::GitError> {
            let oid = self.next_oid();
            self.blobs.lock().unwrap().insert(oid, data.to_vec());
            Ok(oid)
        }
        fn write_tree(&self, entries: &[TreeEntry]) -> Result<GitOid, archon_git::GitError> {
            let oid = self.next_oid();
            self.trees.lock().unwrap().insert(oid, entries.to_vec());
            Ok(oid)
        }
        fn create_commit(
            &self,
            tree: GitOid,
            parents: &[GitOid],
            message: &str,
            update_ref: Option<&RefName>,
        ) -> Result<GitOid, archon_git::GitError> {
            let oid = self.next_oid();
            self.commits.lock().unwrap().insert(
                oid,
                archon_git::CommitInfo {
                    tree_oid: tree,
                    parents: parents.to_vec(),
                    message: message.to_owned(),
                    author: "Archon <archon@localhost>".to_owned(),
                    committer: "Archon <archon@localhost>".to_owned(),
                },
            );
            if let Some(r) = update_ref {
                self.refs.lock().unwrap().insert(r.as_str().to_owned(), oid);
            }
            Ok(oid)
        }
        fn edit_tree(&self, base: GitOid, _edits: &[archon_git::TreeEdit]) -> Result<GitOid, archon_git::GitError> {
            Ok(base)
        }
        fn checkout_tree(&self, _oid: GitOid, _workdir: &Path) -> Result<(), archon_git::GitError> {
            Ok(())
        }
        fn is_dirty(&self) -> Result<bool, archon_git::GitError> {
            Ok(*self.dirty.lock().unwrap())
        }
        fn create_tag(&self, name: &str, target: GitOid, message: &str, tagger: &str) -> Result<GitOid, archon_git::GitError> {
            if self.tags.lock().unwrap().contains_key(name) {
                return Err(archon_git::GitError::RefConflict {
                    ref_name: name.to_owned(),
                    message: "tag already exists".to_owned(),
                });
            }
            let oid = self.next_oid();
            self.tags.lock().unwrap().insert(
                name.to_owned(),
                (
                    oid,
                    archon_git::TagInfo {
                        target,
                        message: message.to_owned(),
                        tagger: tagger.to_owned(),
                    },
                ),
            );
            Ok(oid)
        }
        fn read_tag(&self, name: &str) -> Result<Option<archon_git::TagInfo>, archon_git::GitError> {
            Ok(self.tags.lock().unwrap().get(name).map(|(_, info)| info.clone()))
        }
        fn list_tags(&self, prefix: &str) -> Result<Vec<(String, GitOid)>, archon_git::GitError> {
            let mut out: Vec<_> = self
                .tags
                .lock()
                .unwrap()
                .iter()
                .filter(|(name, _)| name.starts_with(prefix))
                .map(|(name, (oid, _))| (name.clone(), *oid))
                .collect();
            out.sort_by(|a, b| a.0.cmp(&b.0));
            Ok(out)
        }
        fn push_branch(
            &self,
            _remote: &str,
            _local_ref: &str,
            _remote_ref: &str,
            _force: bool,
            _cancel: &archon_git::CancelToken,
        ) -> Result<(), archon_git::GitError> {
            Ok(())
        }
        fn push_tag(&self, _remote: &str, _tag: &str, _cancel: &archon_git::CancelToken) -> Result<(), archon_git::GitError> {
            Ok(())
        }
    }

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z").unwrap().with_timezone(&Utc)
    }

    fn request(name: &str) -> CreateSnapshotRequest {
        CreateSnapshotRequest {
            name: name.to_owned(),
            message: "a snapshot".to_owned(),
            description: Some("details".to_owned()),
            labels: BTreeMap::new(),
            metadata: None,
            author: Some("Alice <alice@example.com>".to_owned()),
        }
    }

    #[test]
    fn create_then_get_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        init_project(dir.path(), "demo").unwrap();
        let repo = FakeRepo::default();
        let manager = SnapshotManager::new(&repo, dir.path().to_owned(), &ArchonConfig::default());

        let created = manager.create(request("v1"), now()).unwrap();
        assert_eq!(created.name.as_str(), "v1");

        let fetched = manager.get("v1").unwrap().unwrap();
        assert_eq!(fetched, created);
    }

    #[test]
    fn create_rejects_duplicate_name() {
        let dir = tempfile::tempdir().unwrap();
        init_project(dir.path(), "demo").unwrap();
        let repo = FakeRepo::default();
        let manager = SnapshotManager::new(&repo, dir.path().to_owned(), &ArchonConfig::default());

        manager.create(request("v1"), now()).unwrap();
        let err = manager.create(request("v1"), now()).unwrap_err();
        assert!(matches!(err, ArchonError::AlreadyExists { kind: "snapshot", .. }));
    }

    #[test]
    fn list_sorts_by_created_at_descending() {
        let dir = tempfile::tempdir().unwrap();
        init_project(dir.path(), "demo").unwrap();
        let repo = FakeRepo::default();
        let manager = SnapshotManager::new(&repo, dir.path().to_owned(), &ArchonConfig::default());

        let earlier = now();
        let later = earlier + chrono::Duration::hours(1);
        manager.create(request("v1"), earlier).unwrap();
        manager.create(request("v2"), later).unwrap();

        let list = manager.list().unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].name.as_str(), "v2");
        assert_eq!(list[1].name.as_str(), "v1");
    }

    #[test]
    fn delete_removes_sidecar_but_keeps_tag() {
        let dir = tempfile::tempdir().unwrap();
        init_project(dir.path(), "demo").unwrap();
        let repo = FakeRepo::default();
        let manager = SnapshotManager::new(&repo, dir.path().to_owned(), &ArchonConfig::default());

        manager.create(request("v1"), now()).unwrap();
        manager.delete("v1").unwrap();

        assert!(sidecar::read(dir.path(), "v1").is_none());
        // The tag remains, so a fallback record is still reconstructible.
        let fallback = manager.get("v1").unwrap().unwrap();
        assert_eq!(fallback.hash, repo.read_tag("snapshot-v1").unwrap().unwrap().target.to_string());
    }

    #[test]
    fn restore_rejects_dirty_working_tree() {
        let dir = tempfile::tempdir().unwrap();
        init_project(dir.path(), "demo").unwrap();
        let repo = FakeRepo::default();
        let manager = SnapshotManager::new(&repo, dir.path().to_owned(), &ArchonConfig::default());

        manager.create(request("v1"), now()).unwrap();
        *repo.dirty.lock().unwrap() = true;

        let err = manager.restore("v1").unwrap_err();
        assert!(matches!(err, ArchonError::InvariantViolation { .. }));
    }

    #[test]
    fn restore_missing_snapshot_not_found() {
        let dir = tempfile::tempdir().unwrap();
        init_project(dir.path(), "demo").unwrap();
        let repo = FakeRepo::default();
        let manager = SnapshotManager::new(&repo, dir.path().to_owned(), &ArchonConfig::default());

        let err = manager.restore("nope").unwrap_err();
        assert!(matches!(err, ArchonError::NotFound { kind: "snapshot", .. }));
    }

    /// A tag renamed away from the `snapshot-` prefix is still discovered
    /// by `list`/`get`/`restore` through its `Archon-Snapshot:` marker (§6).
    #[test]
    fn marker_tag_without_prefix_is_discovered() {
        let dir = tempfile::tempdir().unwrap();
        init_project(dir.path(), "demo").unwrap();
        let repo = FakeRepo::default();
        let manager = SnapshotManager::new(&repo, dir.path().to_owned(), &ArchonConfig::default());

        let tree_oid = repo.write_tree(&[]).unwrap();
        let commit_oid = repo.create_commit(tree_oid, &[], "renamed snapshot commit", None).unwrap();
        let message = build_tag_message("v1", Some("details"));
        repo.create_tag("released/v1", commit_oid, &message, "Alice <alice@example.com>").unwrap();

        let fetched = manager.get("v1").unwrap().unwrap();
        assert_eq!(fetched.name.as_str(), "v1");
        assert_eq!(fetched.hash, commit_oid.to_string());
        assert_eq!(fetched.description.as_deref(), Some("details"));

        let list = manager.list().unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].name.as_str(), "v1");

        manager.restore("v1").unwrap();
    }
}
