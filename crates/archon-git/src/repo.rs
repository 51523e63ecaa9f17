//! The [`GitRepo`] trait — the single abstraction boundary between Archon and git.
//!
//! All Archon crates interact with git exclusively through this trait. The
//! trait is object-safe so callers can use `dyn GitRepo` or `Box<dyn GitRepo>`.
//!
//! Archon's git usage is narrower than a general-purpose git porcelain: there
//! is no workspace isolation, no stash, and no generic tree-to-tree diff (the
//! semantic diff engine operates on node JSON, not git trees). The method
//! groups below cover exactly what the node store, snapshot manager, and diff
//! engine need:
//!
//! | Group        | Methods                                              |
//! |--------------|-------------------------------------------------------|
//! | Refs         | `read_ref`, `write_ref`, `delete_ref`, `atomic_ref_update`, `list_refs` |
//! | Rev-parse    | `rev_parse`, `rev_parse_opt`                         |
//! | Object read  | `read_blob`, `read_tree`, `read_commit`              |
//! | Object write | `write_blob`, `write_tree`, `create_commit`          |
//! | Tree editing | `edit_tree`                                          |
//! | Checkout     | `checkout_tree`, `is_dirty`                          |
//! | Tags         | `create_tag`, `read_tag`, `list_tags`                |
//! | Push         | `push_branch`, `push_tag`                            |

use std::path::Path;

use crate::cancel::CancelToken;
use crate::error::GitError;
use crate::types::{CommitInfo, GitOid, RefEdit, RefName, TagInfo, TreeEdit, TreeEntry};

/// The git abstraction trait used by all Archon crates.
///
/// Implementations may be backed by gix (the preferred backend), a git CLI
/// shim (used only for credential-bearing push), or a test double.
///
/// # Object safety
///
/// This trait is object-safe: no generic methods, no `Self` in return position
/// outside of `Result`. Callers may use `&dyn GitRepo` or `Box<dyn GitRepo>`.
pub trait GitRepo {
    // -----------------------------------------------------------------------
    // Refs
    //
    // Replaces: git rev-parse, git update-ref, git update-ref -d,
    //           git update-ref --stdin, git for-each-ref
    // -----------------------------------------------------------------------

    /// Resolve a ref to its OID, returning `None` if the ref does not exist.
    ///
    /// Replaces: `git rev-parse <ref>` (when used to resolve a known ref name).
    fn read_ref(&self, name: &RefName) -> Result<Option<GitOid>, GitError>;

    /// Create or overwrite a ref unconditionally.
    ///
    /// Replaces: `git update-ref <name> <oid>`.
    ///
    /// `log_message` is written to the reflog entry. Pass an empty string if
    /// no reflog message is needed.
    fn write_ref(&self, name: &RefName, oid: GitOid, log_message: &str) -> Result<(), GitError>;

    /// Delete a ref. No-op if the ref does not exist.
    ///
    /// Replaces: `git update-ref -d <name>`.
    fn delete_ref(&self, name: &RefName) -> Result<(), GitError>;

    /// Atomically apply a batch of ref updates with compare-and-swap semantics.
    ///
    /// All updates succeed or all fail. Each [`RefEdit`] carries an expected
    /// old OID; if any ref's current value differs, the entire transaction is
    /// aborted and [`GitError::RefConflict`] is returned.
    ///
    /// Replaces: `git update-ref --stdin` with `start`/`prepare`/`commit`.
    fn atomic_ref_update(&self, edits: &[RefEdit]) -> Result<(), GitError>;

    /// List refs matching a prefix (e.g., `"refs/tags/snapshot-"`, `"refs/heads/"`).
    ///
    /// Returns `(ref_name, oid)` pairs sorted by ref name. The prefix is
    /// matched literally.
    ///
    /// Replaces: `git for-each-ref --format=... refs/some/prefix/`.
    fn list_refs(&self, prefix: &str) -> Result<Vec<(RefName, GitOid)>, GitError>;

    // -----------------------------------------------------------------------
    // Rev-parse
    //
    // Replaces: git rev-parse <spec>
    // -----------------------------------------------------------------------

    /// Resolve a revision specification to an OID.
    ///
    /// Supports the same syntax as `git rev-parse`: commit-ish references,
    /// `HEAD~3`, tag names, etc.
    ///
    /// Returns [`GitError::NotFound`] if the spec cannot be resolved.
    ///
    /// Replaces: `git rev-parse <spec>` (general revspec resolution).
    fn rev_parse(&self, spec: &str) -> Result<GitOid, GitError>;

    /// Like [`rev_parse`](Self::rev_parse) but returns `None` instead of an
    /// error when the spec cannot be resolved.
    fn rev_parse_opt(&self, spec: &str) -> Result<Option<GitOid>, GitError>;

    // -----------------------------------------------------------------------
    // Object read
    //
    // Replaces: git cat-file blob, git ls-tree, git cat-file commit
    // -----------------------------------------------------------------------

    /// Read the contents of a blob object.
    ///
    /// Returns the raw byte content.
    ///
    /// Replaces: `git cat-file blob <oid>`.
    fn read_blob(&self, oid: GitOid) -> Result<Vec<u8>, GitError>;

    /// Read the entries of a tree object.
    ///
    /// Returns the flat list of entries (one level deep, not recursive).
    ///
    /// Replaces: `git ls-tree <oid>`.
    fn read_tree(&self, oid: GitOid) -> Result<Vec<TreeEntry>, GitError>;

    /// Read a commit object's metadata.
    ///
    /// Replaces: `git cat-file commit <oid>` / `git log -1 --format=...`.
    fn read_commit(&self, oid: GitOid) -> Result<CommitInfo, GitError>;

    // -----------------------------------------------------------------------
    // Object write
    //
    // Replaces: git hash-object -w, git mktree, git commit-tree
    // -----------------------------------------------------------------------

    /// Write a blob to the object store and return its OID.
    ///
    /// Replaces: `git hash-object -w --stdin` / writing a blob via the
    /// object database.
    fn write_blob(&self, data: &[u8]) -> Result<GitOid, GitError>;

    /// Write a tree object from a list of entries and return its OID.
    ///
    /// Replaces: `git mktree`.
    fn write_tree(&self, entries: &[TreeEntry]) -> Result<GitOid, GitError>;

    /// Create a commit object and optionally update a ref to point to it.
    ///
    /// If `update_ref` is `Some`, the given ref is updated to the new commit
    /// OID after the commit is written.
    ///
    /// Replaces: `git commit-tree` + optional `git update-ref`.
    fn create_commit(
        &self,
        tree: GitOid,
        parents: &[GitOid],
        message: &str,
        update_ref: Option<&RefName>,
    ) -> Result<GitOid, GitError>;

    // -----------------------------------------------------------------------
    // Tree editing
    //
    // Replaces: sequences of git ls-tree + git mktree for path-based edits
    // -----------------------------------------------------------------------

    /// Apply a set of edits to an existing tree and return the OID of the new tree.
    ///
    /// Edits may insert, update, or remove entries at arbitrary paths
    /// (including nested paths like `"nodes/<id>.json"`). Intermediate trees
    /// are created or updated as needed.
    ///
    /// Replaces: manual tree traversal + `git mktree` pipelines.
    fn edit_tree(&self, base: GitOid, edits: &[TreeEdit]) -> Result<GitOid, GitError>;

    // -----------------------------------------------------------------------
    // Checkout
    //
    // Replaces: git checkout <oid> -- ., git read-tree -u <oid>
    // -----------------------------------------------------------------------

    /// Check out a tree into the working directory.
    ///
    /// Materializes the tree at `oid` into `workdir`. Existing working-tree
    /// files not in the tree are removed (excluding `.git`).
    ///
    /// Replaces: `git checkout <oid> -- .` / `git read-tree -u <oid>`.
    fn checkout_tree(&self, oid: GitOid, workdir: &Path) -> Result<(), GitError>;

    /// Returns `true` if the working tree has uncommitted changes.
    ///
    /// Used to enforce the "clean working tree required" precondition on
    /// snapshot restore.
    ///
    /// Replaces: `git diff --quiet && git diff --cached --quiet` (exit code check).
    fn is_dirty(&self) -> Result<bool, GitError>;

    // -----------------------------------------------------------------------
    // Tags
    //
    // Replaces: git tag -a, git cat-file tag, git for-each-ref refs/tags/
    //
    // Snapshots are recorded as annotated tags named `snapshot-<name>`.
    // -----------------------------------------------------------------------

    /// Create an annotated tag pointing at `target`.
    ///
    /// Fails with [`GitError::RefConflict`] if a tag with this name already
    /// exists (snapshot names must be unique, §4.4).
    ///
    /// Replaces: `git tag -a <name> -m <message> <target>`.
    fn create_tag(&self, name: &str, target: GitOid, message: &str, tagger: &str) -> Result<GitOid, GitError>;

    /// Read an annotated tag's metadata by name.
    ///
    /// Returns `None` if no tag with this name exists.
    ///
    /// Replaces: `git cat-file tag <name>`.
    fn read_tag(&self, name: &str) -> Result<Option<TagInfo>, GitError>;

    /// List all annotated tags whose name starts with `prefix`.
    ///
    /// Returns `(name, tag_oid)` pairs sorted by name.
    ///
    /// Replaces: `git for-each-ref --format=... refs/tags/<prefix>*`.
    fn list_tags(&self, prefix: &str) -> Result<Vec<(String, GitOid)>, GitError>;

    // -----------------------------------------------------------------------
    // Push
    //
    // Replaces: git push origin <branch>, git push origin <tag>
    // -----------------------------------------------------------------------

    /// Push a local ref to a remote.
    ///
    /// If `force` is true, the push is a force-push (`git push --force`).
    /// `cancel` is polled while the push subprocess runs; a cancelled token
    /// (explicit or via its deadline) aborts the push and returns
    /// [`GitError::Cancelled`].
    ///
    /// Replaces: `git push <remote> <local_ref>:<remote_ref>` (or `--force`).
    fn push_branch(
        &self,
        remote: &str,
        local_ref: &str,
        remote_ref: &str,
        force: bool,
        cancel: &CancelToken,
    ) -> Result<(), GitError>;

    /// Push a single tag to a remote.
    ///
    /// `cancel` is polled the same way as in [`push_branch`](Self::push_branch).
    ///
    /// Replaces: `git push <remote> <tag>`.
    fn push_tag(&self, remote: &str, tag: &str, cancel: &CancelToken) -> Result<(), GitError>;
}
