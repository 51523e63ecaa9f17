//! gix-backed ref and rev-parse operations.

use gix::refs::transaction::{Change, LogChange, PreviousValue, RefEdit as GixRefEdit, RefLog};
use gix::refs::Target;

use crate::error::GitError;
use crate::gix_repo::GixRepo;
use crate::types::*;

fn to_gix_oid(oid: GitOid) -> gix::ObjectId {
    gix::ObjectId::from_bytes_or_panic(oid.as_bytes())
}

fn from_gix_oid(oid: gix::ObjectId) -> GitOid {
    let bytes: [u8; 20] = oid.as_bytes().try_into().expect("SHA1 is 20 bytes");
    GitOid::from_bytes(bytes)
}

fn target_to_oid(repo: &GixRepo, target: &Target) -> Result<GitOid, GitError> {
    match target {
        Target::Object(id) => Ok(from_gix_oid(*id)),
        Target::Symbolic(name) => {
            let reference =
                repo.repo
                    .try_find_reference(name.as_bstr())
                    .map_err(|e| GitError::BackendError {
                        message: format!("failed to resolve symbolic ref {name}: {e}"),
                    })?
                    .ok_or_else(|| GitError::NotFound {
                        message: format!("symbolic ref target '{name}' does not exist"),
                    })?;
            target_to_oid(repo, &reference.target())
        }
    }
}

pub fn read_ref(repo: &GixRepo, name: &RefName) -> Result<Option<GitOid>, GitError> {
    let found = repo
        .repo
        .try_find_reference(name.as_str())
        .map_err(|e| GitError::BackendError {
            message: format!("failed to look up ref '{name}': {e}"),
        })?;
    match found {
        Some(reference) => Ok(Some(target_to_oid(repo, &reference.target())?)),
        None => Ok(None),
    }
}

pub fn write_ref(repo: &GixRepo, name: &RefName, oid: GitOid, log_message: &str) -> Result<(), GitError> {
    repo.repo
        .reference(name.as_str(), to_gix_oid(oid), PreviousValue::Any, log_message)
        .map_err(|e| GitError::BackendError {
            message: format!("failed to write ref '{name}': {e}"),
        })?;
    Ok(())
}

pub fn delete_ref(repo: &GixRepo, name: &RefName) -> Result<(), GitError> {
    let found = repo
        .repo
        .try_find_reference(name.as_str())
        .map_err(|e| GitError::BackendError {
            message: format!("failed to look up ref '{name}': {e}"),
        })?;
    if let Some(reference) = found {
        reference.delete().map_err(|e| GitError::BackendError {
            message: format!("failed to delete ref '{name}': {e}"),
        })?;
    }
    Ok(())
}

pub fn atomic_ref_update(repo: &GixRepo, edits: &[RefEdit]) -> Result<(), GitError> {
    let gix_edits: Vec<GixRefEdit> = edits
        .iter()
        .map(|edit| {
            let expected = if edit.expected_old_oid.is_zero() {
                PreviousValue::MustNotExist
            } else {
                PreviousValue::MustExistAndMatch(Target::Object(to_gix_oid(edit.expected_old_oid)))
            };
            GixRefEdit {
                change: Change::Update {
                    log: LogChange {
                        mode: RefLog::AndReference,
                        force_create_reflog: false,
                        message: "archon: atomic ref update".into(),
                    },
                    expected,
                    new: Target::Object(to_gix_oid(edit.new_oid)),
                },
                name: edit.name.as_str().try_into().expect("validated RefName"),
                deref: false,
            }
        })
        .collect();

    repo.repo
        .edit_references(gix_edits)
        .map_err(|e| GitError::RefConflict {
            ref_name: edits
                .first()
                .map(|e| e.name.as_str().to_owned())
                .unwrap_or_default(),
            message: e.to_string(),
        })?;
    Ok(())
}

pub fn list_refs(repo: &GixRepo, prefix: &str) -> Result<Vec<(RefName, GitOid)>, GitError> {
    let platform = repo.repo.references().map_err(|e| GitError::BackendError {
        message: format!("failed to open references: {e}"),
    })?;

    let iter = platform.prefixed(prefix).map_err(|e| GitError::BackendError {
        message: format!("failed to iterate refs with prefix '{prefix}': {e}"),
    })?;

    let mut out = Vec::new();
    for result in iter {
        let mut reference = result.map_err(|e| GitError::BackendError {
            message: format!("failed to read ref entry: {e}"),
        })?;
        let full_name = reference.name().as_bstr().to_string();
        let oid = target_to_oid(repo, &reference.target())?;
        let name = RefName::new(&full_name).map_err(|e| GitError::BackendError {
            message: format!("backend returned unparseable ref name: {e}"),
        })?;
        out.push((name, oid));
    }
    out.sort_by(|a, b| a.0.as_str().cmp(b.0.as_str()));
    Ok(out)
}

pub fn rev_parse(repo: &GixRepo, spec: &str) -> Result<GitOid, GitError> {
    rev_parse_opt(repo, spec)?.ok_or_else(|| GitError::NotFound {
        message: format!("revision '{spec}' could not be resolved"),
    })
}

pub fn rev_parse_opt(repo: &GixRepo, spec: &str) -> Result<Option<GitOid>, GitError> {
    match repo.repo.rev_parse_single(spec) {
        Ok(id) => Ok(Some(from_gix_oid(id.detach()))),
        Err(_) => Ok(None),
    }
}
