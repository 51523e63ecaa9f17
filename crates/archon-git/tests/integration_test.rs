use tempfile::TempDir;

use archon_git::{EntryMode, GitOid, GitRepo, GixRepo, RefEdit, RefName, TreeEdit, TreeEntry};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn setup_repo() -> (TempDir, GixRepo) {
    let dir = TempDir::new().unwrap();
    std::process::Command::new("git")
        .args(["init", dir.path().to_str().unwrap()])
        .output()
        .unwrap();
    std::process::Command::new("git")
        .args(["config", "user.email", "test@test.com"])
        .current_dir(dir.path())
        .output()
        .unwrap();
    std::process::Command::new("git")
        .args(["config", "user.name", "Test User"])
        .current_dir(dir.path())
        .output()
        .unwrap();
    let repo = GixRepo::open(dir.path()).unwrap();
    (dir, repo)
}

/// Create an initial commit with a single file so HEAD exists.
/// Returns the commit OID and the tree OID.
fn setup_repo_with_commit() -> (TempDir, GixRepo, GitOid, GitOid) {
    let (dir, repo) = setup_repo();
    let blob_oid = repo.write_blob(b"hello world\n").unwrap();
    let tree_oid = repo
        .write_tree(&[TreeEntry {
            name: "hello.txt".to_string(),
            mode: EntryMode::Blob,
            oid: blob_oid,
        }])
        .unwrap();
    let head_ref = RefName::new("refs/heads/main").unwrap();
    let commit_oid = repo
        .create_commit(tree_oid, &[], "initial commit", Some(&head_ref))
        .unwrap();
    // Also point HEAD at refs/heads/main via symbolic ref so rev_parse("HEAD") works.
    std::process::Command::new("git")
        .args(["symbolic-ref", "HEAD", "refs/heads/main"])
        .current_dir(dir.path())
        .output()
        .unwrap();
    (dir, repo, commit_oid, tree_oid)
}

// ===========================================================================
// 1. Basic repo operations
// ===========================================================================

#[test]
fn open_repo() {
    let (_dir, _repo) = setup_repo();
    // If we got here, open succeeded.
}

#[test]
fn rev_parse_head() {
    let (_dir, repo, commit_oid, _tree_oid) = setup_repo_with_commit();
    let parsed = repo.rev_parse("HEAD").unwrap();
    assert_eq!(parsed, commit_oid);
}

#[test]
fn rev_parse_opt_missing() {
    let (_dir, repo) = setup_repo();
    let result = repo.rev_parse_opt("HEAD").unwrap();
    // Fresh repo with no commits — HEAD doesn't resolve.
    assert!(result.is_none());
}

#[test]
fn blob_roundtrip() {
    let (_dir, repo) = setup_repo();
    let data = b"some blob content";
    let oid = repo.write_blob(data).unwrap();
    let read_back = repo.read_blob(oid).unwrap();
    assert_eq!(read_back, data);
}

#[test]
fn tree_roundtrip() {
    let (_dir, repo) = setup_repo();
    let blob_oid = repo.write_blob(b"content").unwrap();
    let entries = vec![TreeEntry {
        name: "file.txt".to_string(),
        mode: EntryMode::Blob,
        oid: blob_oid,
    }];
    let tree_oid = repo.write_tree(&entries).unwrap();
    let read_back = repo.read_tree(tree_oid).unwrap();
    assert_eq!(read_back.len(), 1);
    assert_eq!(read_back[0].name, "file.txt");
    assert_eq!(read_back[0].mode, EntryMode::Blob);
    assert_eq!(read_back[0].oid, blob_oid);
}

#[test]
fn commit_roundtrip() {
    let (_dir, repo, commit_oid, tree_oid) = setup_repo_with_commit();
    let info = repo.read_commit(commit_oid).unwrap();
    assert_eq!(info.tree_oid, tree_oid);
    assert!(info.parents.is_empty());
    assert_eq!(info.message, "initial commit");
    assert!(info.author.contains("Test User"));
}

// ===========================================================================
// 2. Ref operations
// ===========================================================================

#[test]
fn write_read_ref_roundtrip() {
    let (_dir, repo, commit_oid, _) = setup_repo_with_commit();
    let refname = RefName::new("refs/heads/feature").unwrap();
    repo.write_ref(&refname, commit_oid, "create feature branch")
        .unwrap();
    let read_back = repo.read_ref(&refname).unwrap();
    assert_eq!(read_back, Some(commit_oid));
}

#[test]
fn read_ref_nonexistent() {
    let (_dir, repo) = setup_repo();
    let refname = RefName::new("refs/heads/nope").unwrap();
    let result = repo.read_ref(&refname).unwrap();
    assert_eq!(result, None);
}

#[test]
fn delete_ref() {
    let (_dir, repo, commit_oid, _) = setup_repo_with_commit();
    let refname = RefName::new("refs/heads/to-delete").unwrap();
    repo.write_ref(&refname, commit_oid, "temp").unwrap();
    assert!(repo.read_ref(&refname).unwrap().is_some());
    repo.delete_ref(&refname).unwrap();
    assert!(repo.read_ref(&refname).unwrap().is_none());
}

#[test]
fn list_refs_with_prefix() {
    let (_dir, repo, commit_oid, _) = setup_repo_with_commit();
    let r1 = RefName::new("refs/heads/alpha").unwrap();
    let r2 = RefName::new("refs/heads/beta").unwrap();
    let r3 = RefName::new("refs/tags/v1").unwrap();
    repo.write_ref(&r1, commit_oid, "a").unwrap();
    repo.write_ref(&r2, commit_oid, "b").unwrap();
    repo.write_ref(&r3, commit_oid, "t").unwrap();
    let heads = repo.list_refs("refs/heads/").unwrap();
    let head_names: Vec<&str> = heads.iter().map(|(r, _)| r.as_str()).collect();
    // Should include alpha, beta, main — but NOT refs/tags/v1
    assert!(head_names.contains(&"refs/heads/alpha"));
    assert!(head_names.contains(&"refs/heads/beta"));
    assert!(head_names.contains(&"refs/heads/main"));
    assert!(!head_names.contains(&"refs/tags/v1"));
}

#[test]
fn atomic_ref_update_success() {
    let (_dir, repo, commit_oid, _) = setup_repo_with_commit();
    let refname = RefName::new("refs/heads/atomic-test").unwrap();
    // Create: expected_old = ZERO (ref must not exist)
    let edits = vec![RefEdit {
        name: refname.clone(),
        new_oid: commit_oid,
        expected_old_oid: GitOid::ZERO,
    }];
    repo.atomic_ref_update(&edits).unwrap();
    assert_eq!(repo.read_ref(&refname).unwrap(), Some(commit_oid));
}

// ===========================================================================
// 3. Object operations
// ===========================================================================

#[test]
fn write_tree_multiple_entries() {
    let (_dir, repo) = setup_repo();
    let b1 = repo.write_blob(b"aaa").unwrap();
    let b2 = repo.write_blob(b"bbb").unwrap();
    let entries = vec![
        TreeEntry {
            name: "a.txt".to_string(),
            mode: EntryMode::Blob,
            oid: b1,
        },
        TreeEntry {
            name: "b.txt".to_string(),
            mode: EntryMode::Blob,
            oid: b2,
        },
    ];
    let tree_oid = repo.write_tree(&entries).unwrap();
    let read_back = repo.read_tree(tree_oid).unwrap();
    assert_eq!(read_back.len(), 2);
    let names: Vec<&str> = read_back.iter().map(|e| e.name.as_str()).collect();
    assert!(names.contains(&"a.txt"));
    assert!(names.contains(&"b.txt"));
}

#[test]
fn edit_tree_add_entry() {
    let (_dir, repo, _, tree_oid) = setup_repo_with_commit();
    let new_blob = repo.write_blob(b"new file").unwrap();
    let new_tree = repo
        .edit_tree(
            tree_oid,
            &[TreeEdit::Upsert {
                path: "new.txt".to_string(),
                mode: EntryMode::Blob,
                oid: new_blob,
            }],
        )
        .unwrap();
    let entries = repo.read_tree(new_tree).unwrap();
    let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
    assert!(names.contains(&"hello.txt")); // original
    assert!(names.contains(&"new.txt")); // added
}

#[test]
fn edit_tree_modify_entry() {
    let (_dir, repo, _, tree_oid) = setup_repo_with_commit();
    let updated_blob = repo.write_blob(b"updated content").unwrap();
    let new_tree = repo
        .edit_tree(
            tree_oid,
            &[TreeEdit::Upsert {
                path: "hello.txt".to_string(),
                mode: EntryMode::Blob,
                oid: updated_blob,
            }],
        )
        .unwrap();
    let entries = repo.read_tree(new_tree).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].oid, updated_blob);
}

#[test]
fn edit_tree_remove_entry() {
    let (_dir, repo, _, tree_oid) = setup_repo_with_commit();
    let new_tree = repo
        .edit_tree(
            tree_oid,
            &[TreeEdit::Remove {
                path: "hello.txt".to_string(),
            }],
        )
        .unwrap();
    let entries = repo.read_tree(new_tree).unwrap();
    assert!(entries.is_empty());
}

#[test]
fn create_commit_with_parent() {
    let (_dir, repo, first_commit, _) = setup_repo_with_commit();
    let blob = repo.write_blob(b"second").unwrap();
    let tree = repo
        .write_tree(&[TreeEntry {
            name: "second.txt".to_string(),
            mode: EntryMode::Blob,
            oid: blob,
        }])
        .unwrap();
    let head_ref = RefName::new("refs/heads/main").unwrap();
    let second_commit = repo
        .create_commit(tree, &[first_commit], "second commit", Some(&head_ref))
        .unwrap();
    let info = repo.read_commit(second_commit).unwrap();
    assert_eq!(info.parents, vec![first_commit]);
    assert_eq!(info.message, "second commit");
}

// ===========================================================================
// 4. Checkout and dirty detection
// ===========================================================================

#[test]
fn checkout_tree_creates_files() {
    let (dir, repo, _, tree_oid) = setup_repo_with_commit();
    let checkout_dir = dir.path().to_path_buf();
    repo.checkout_tree(tree_oid, &checkout_dir).unwrap();
    let file_path = checkout_dir.join("hello.txt");
    assert!(file_path.exists(), "hello.txt should exist after checkout");
    let contents = std::fs::read_to_string(&file_path).unwrap();
    assert_eq!(contents, "hello world\n");
}

#[test]
fn is_dirty_clean_repo_after_commit() {
    // Committing via `git commit` (not our checkout_tree) leaves the working
    // tree matching HEAD, so the repo should report clean.
    let dir = TempDir::new().unwrap();
    std::process::Command::new("git")
        .args(["init", dir.path().to_str().unwrap()])
        .output()
        .unwrap();
    std::process::Command::new("git")
        .args(["config", "user.email", "test@test.com"])
        .current_dir(dir.path())
        .output()
        .unwrap();
    std::process::Command::new("git")
        .args(["config", "user.name", "Test User"])
        .current_dir(dir.path())
        .output()
        .unwrap();
    std::fs::write(dir.path().join("hello.txt"), "hello world\n").unwrap();
    std::process::Command::new("git")
        .args(["add", "-A"])
        .current_dir(dir.path())
        .output()
        .unwrap();
    std::process::Command::new("git")
        .args(["commit", "-m", "initial"])
        .current_dir(dir.path())
        .output()
        .unwrap();
    let repo = GixRepo::open(dir.path()).unwrap();
    assert!(!repo.is_dirty().unwrap());
}

#[test]
fn is_dirty_with_modified_tracked_file() {
    let dir = TempDir::new().unwrap();
    std::process::Command::new("git")
        .args(["init", dir.path().to_str().unwrap()])
        .output()
        .unwrap();
    std::process::Command::new("git")
        .args(["config", "user.email", "test@test.com"])
        .current_dir(dir.path())
        .output()
        .unwrap();
    std::process::Command::new("git")
        .args(["config", "user.name", "Test User"])
        .current_dir(dir.path())
        .output()
        .unwrap();
    std::fs::write(dir.path().join("hello.txt"), "hello world\n").unwrap();
    std::process::Command::new("git")
        .args(["add", "-A"])
        .current_dir(dir.path())
        .output()
        .unwrap();
    std::process::Command::new("git")
        .args(["commit", "-m", "initial"])
        .current_dir(dir.path())
        .output()
        .unwrap();
    std::fs::write(dir.path().join("hello.txt"), "modified content").unwrap();
    let repo = GixRepo::open(dir.path()).unwrap();
    assert!(repo.is_dirty().unwrap());
}

// ===========================================================================
// 5. Annotated tags (snapshots)
// ===========================================================================

#[test]
fn create_and_read_tag() {
    let (_dir, repo, commit_oid, _) = setup_repo_with_commit();
    let tag_oid = repo
        .create_tag(
            "snapshot-v1",
            commit_oid,
            "Snapshot: v1\n\nfirst release",
            "Alice <alice@example.com>",
        )
        .unwrap();
    assert_ne!(tag_oid, commit_oid, "annotated tag is its own object");

    let info = repo.read_tag("snapshot-v1").unwrap().unwrap();
    assert_eq!(info.target, commit_oid);
    assert_eq!(info.message, "Snapshot: v1\n\nfirst release");
    assert!(info.tagger.contains("Alice"));
}

#[test]
fn read_tag_nonexistent() {
    let (_dir, repo) = setup_repo();
    assert!(repo.read_tag("snapshot-nope").unwrap().is_none());
}

#[test]
fn create_tag_rejects_duplicate_name() {
    let (_dir, repo, commit_oid, _) = setup_repo_with_commit();
    repo.create_tag("snapshot-dup", commit_oid, "first", "Bob <bob@example.com>")
        .unwrap();
    let result = repo.create_tag("snapshot-dup", commit_oid, "second", "Bob <bob@example.com>");
    assert!(result.is_err());
}

#[test]
fn list_tags_with_prefix() {
    let (_dir, repo, commit_oid, _) = setup_repo_with_commit();
    repo.create_tag("snapshot-alpha", commit_oid, "a", "Bob <bob@example.com>")
        .unwrap();
    repo.create_tag("snapshot-beta", commit_oid, "b", "Bob <bob@example.com>")
        .unwrap();
    let refname = RefName::new("refs/heads/other").unwrap();
    repo.write_ref(&refname, commit_oid, "unrelated").unwrap();

    let tags = repo.list_tags("snapshot-").unwrap();
    let names: Vec<&str> = tags.iter().map(|(n, _)| n.as_str()).collect();
    assert!(names.contains(&"snapshot-alpha"));
    assert!(names.contains(&"snapshot-beta"));
    assert_eq!(names.len(), 2);
}
