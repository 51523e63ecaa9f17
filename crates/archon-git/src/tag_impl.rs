//! gix-backed annotated tag operations.
//!
//! Archon snapshots (§4.4) are recorded as annotated tags named
//! `snapshot-<name>` under `refs/tags/`. Unlike lightweight tags, an
//! annotated tag is its own object carrying a message and tagger identity,
//! which is where the snapshot's description and author live.

use gix::refs::transaction::PreviousValue;

use crate::error::GitError;
use crate::gix_repo::GixRepo;
use crate::types::{GitOid, TagInfo};

fn to_gix_oid(oid: GitOid) -> gix::ObjectId {
    gix::ObjectId::from_bytes_or_panic(oid.as_bytes())
}

fn from_gix_oid(oid: gix::ObjectId) -> GitOid {
    let bytes: [u8; 20] = oid.as_bytes().try_into().expect("SHA1 is 20 bytes");
    GitOid::from_bytes(bytes)
}

/// Parse a `"Name <email>"` tagger string into a gix actor signature,
/// stamped with the current time.
fn parse_tagger(tagger: &str) -> gix::actor::Signature {
    let (name, email) = match tagger.rsplit_once('<') {
        Some((name, rest)) => (name.trim().to_owned(), rest.trim_end_matches('>').to_owned()),
        None => (tagger.trim().to_owned(), String::new()),
    };
    gix::actor::Signature {
        name: name.into(),
        email: email.into(),
        time: gix::date::Time::now_local_or_utc(),
    }
}

fn tag_ref_name(name: &str) -> String {
    format!("refs/tags/{name}")
}

pub fn create_tag(
    repo: &GixRepo,
    name: &str,
    target: GitOid,
    message: &str,
    tagger: &str,
) -> Result<GitOid, GitError> {
    let ref_name = tag_ref_name(name);

    let existing = repo
        .repo
        .try_find_reference(ref_name.as_str())
        .map_err(|e| GitError::BackendError {
            message: format!("failed to check for existing tag '{name}': {e}"),
        })?;
    if existing.is_some() {
        return Err(GitError::RefConflict {
            ref_name,
            message: format!("a tag named '{name}' already exists"),
        });
    }

    let target_oid = to_gix_oid(target);
    let target_kind = repo
        .repo
        .find_object(target_oid)
        .map_err(|e| GitError::NotFound {
            message: format!("tag target {target}: {e}"),
        })?
        .kind;

    let tag = gix::objs::Tag {
        target: target_oid,
        target_kind,
        name: name.into(),
        tagger: Some(parse_tagger(tagger)),
        message: message.into(),
        pgp_signature: None,
    };

    let tag_oid = repo
        .repo
        .write_object(&tag)
        .map_err(|e| GitError::BackendError {
            message: format!("failed to write tag object: {e}"),
        })?
        .detach();

    repo.repo
        .reference(
            ref_name.as_str(),
            tag_oid,
            PreviousValue::MustNotExist,
            format!("tag: created snapshot tag '{name}'"),
        )
        .map_err(|e| GitError::BackendError {
            message: format!("failed to create tag ref '{ref_name}': {e}"),
        })?;

    Ok(from_gix_oid(tag_oid))
}

pub fn read_tag(repo: &GixRepo, name: &str) -> Result<Option<TagInfo>, GitError> {
    let ref_name = tag_ref_name(name);
    let reference = repo
        .repo
        .try_find_reference(ref_name.as_str())
        .map_err(|e| GitError::BackendError {
            message: format!("failed to look up tag '{name}': {e}"),
        })?;
    let Some(mut reference) = reference else {
        return Ok(None);
    };

    let tag_oid = reference
        .peel_to_id_in_place()
        .map_err(|e| GitError::BackendError {
            message: format!("failed to peel tag ref '{ref_name}': {e}"),
        })?
        .detach();

    let tag_obj = repo
        .repo
        .find_object(tag_oid)
        .map_err(|e| GitError::NotFound {
            message: format!("tag object {name}: {e}"),
        })?;

    if tag_obj.kind != gix::object::Kind::Tag {
        // Lightweight tag (ref points straight at the target, no tag object).
        return Ok(Some(TagInfo {
            target: from_gix_oid(tag_oid),
            message: String::new(),
            tagger: String::new(),
        }));
    }

    let tag = tag_obj.try_into_tag().map_err(|e| GitError::BackendError {
        message: format!("failed to interpret tag object '{name}': {e}"),
    })?;
    let decoded = tag.decode().map_err(|e| GitError::BackendError {
        message: format!("failed to decode tag object '{name}': {e}"),
    })?;

    let tagger = decoded
        .tagger
        .map(|t| format!("{} <{}>", t.name, t.email))
        .unwrap_or_default();

    Ok(Some(TagInfo {
        target: from_gix_oid(decoded.target()),
        message: decoded.message.to_string(),
        tagger,
    }))
}

pub fn list_tags(repo: &GixRepo, prefix: &str) -> Result<Vec<(String, GitOid)>, GitError> {
    let full_prefix = tag_ref_name(prefix);
    let platform = repo.repo.references().map_err(|e| GitError::BackendError {
        message: format!("failed to open references: {e}"),
    })?;
    let iter = platform
        .prefixed(full_prefix.as_str())
        .map_err(|e| GitError::BackendError {
            message: format!("failed to iterate tag refs with prefix '{prefix}': {e}"),
        })?;

    let mut out = Vec::new();
    for result in iter {
        let mut reference = result.map_err(|e| GitError::BackendError {
            message: format!("failed to read tag ref entry: {e}"),
        })?;
        let full_name = reference.name().as_bstr().to_string();
        let short_name = full_name.strip_prefix("refs/tags/").unwrap_or(&full_name).to_owned();
        let oid = reference
            .peel_to_id_in_place()
            .map_err(|e| GitError::BackendError {
                message: format!("failed to peel tag ref '{full_name}': {e}"),
            })?
            .detach();
        out.push((short_name, from_gix_oid(oid)));
    }
    out.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(out)
}
