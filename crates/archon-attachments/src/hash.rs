//! Attachment hash computation and validation.
//!
//! Attachment identity is a lowercase-hex SHA-256 digest, validated as
//! `^[0-9a-fA-F]{64}$` on input and normalized to lowercase on storage.

use sha2::{Digest, Sha256};

use crate::error::AttachmentError;

/// Expected length of a hex-encoded SHA-256 digest.
pub const HASH_LEN: usize = 64;

/// Compute the lowercase-hex SHA-256 digest of `data`.
#[must_use]
pub fn digest(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let bytes = hasher.finalize();
    let mut out = String::with_capacity(HASH_LEN);
    for byte in bytes {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

/// Validate and normalize a hash string to lowercase hex.
///
/// # Errors
/// Returns [`AttachmentError::InvalidHash`] if `raw` is not exactly 64 hex
/// characters.
pub fn normalize(raw: &str) -> Result<String, AttachmentError> {
    if raw.len() != HASH_LEN {
        return Err(AttachmentError::InvalidHash {
            value: raw.to_owned(),
            reason: format!("expected {HASH_LEN} hex characters, got {}", raw.len()),
        });
    }
    if !raw.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(AttachmentError::InvalidHash {
            value: raw.to_owned(),
            reason: "not all characters are hex digits".to_owned(),
        });
    }
    Ok(raw.to_ascii_lowercase())
}

/// The 2-hex-char shard prefix for a normalized hash.
#[must_use]
pub fn shard_prefix(hash: &str) -> &str {
    &hash[..2]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_64_lowercase_hex_chars() {
        let h = digest(b"hello world");
        assert_eq!(h.len(), HASH_LEN);
        assert!(h.bytes().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase()));
    }

    #[test]
    fn digest_is_deterministic() {
        assert_eq!(digest(b"abc"), digest(b"abc"));
    }

    #[test]
    fn normalize_lowercases_uppercase_hex() {
        let upper = "A".repeat(64);
        assert_eq!(normalize(&upper).unwrap(), "a".repeat(64));
    }

    #[test]
    fn normalize_rejects_wrong_length() {
        assert!(normalize("abc").is_err());
    }

    #[test]
    fn normalize_rejects_non_hex() {
        let bad = "g".repeat(64);
        assert!(normalize(&bad).is_err());
    }

    #[test]
    fn shard_prefix_is_first_two_chars() {
        let hash = "ab".to_owned() + &"0".repeat(62);
        assert_eq!(shard_prefix(&hash), "ab");
    }
}
