//! Archon project configuration (`.archon/config.toml`).
//!
//! Defines the typed configuration for a project's `.archon/config.toml`:
//! attachment storage, snapshot authorship, search indexing, and Git remote
//! behavior. Missing file → all defaults (no error).

use std::fmt;
use std::path::Path;

use serde::Deserialize;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level Archon project configuration.
///
/// Parsed from `.archon/config.toml`. Missing fields use sensible defaults.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArchonConfig {
    /// Attachment store settings.
    #[serde(default)]
    pub attachments: AttachmentsConfig,

    /// Snapshot settings.
    #[serde(default)]
    pub snapshot: SnapshotConfig,

    /// Search index settings.
    #[serde(default)]
    pub search: SearchConfig,

    /// Git remote settings.
    #[serde(default)]
    pub remote: RemoteConfig,

    /// Seconds to wait for the cooperative write lock before refusing a
    /// mutation (§5 scheduling model).
    #[serde(default = "default_lock_timeout_secs")]
    pub lock_timeout_secs: u64,
}

const fn default_lock_timeout_secs() -> u64 {
    300
}

// ---------------------------------------------------------------------------
// AttachmentsConfig
// ---------------------------------------------------------------------------

/// Attachment store settings.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AttachmentsConfig {
    /// Size in bytes at or above which a stored attachment is considered
    /// LFS-class (`isLFS` derived field, §3).
    #[serde(default = "default_lfs_threshold_bytes")]
    pub lfs_threshold_bytes: u64,
}

impl Default for AttachmentsConfig {
    fn default() -> Self {
        Self {
            lfs_threshold_bytes: default_lfs_threshold_bytes(),
        }
    }
}

const fn default_lfs_threshold_bytes() -> u64 {
    1024 * 1024
}

// ---------------------------------------------------------------------------
// SnapshotConfig
// ---------------------------------------------------------------------------

/// Snapshot authoring settings.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SnapshotConfig {
    /// Default author identity recorded on a snapshot when the caller does
    /// not supply one explicitly (§4.4 `Create`).
    #[serde(default)]
    pub default_author: Option<String>,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self { default_author: None }
    }
}

// ---------------------------------------------------------------------------
// SearchConfig
// ---------------------------------------------------------------------------

/// Search index settings.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SearchConfig {
    /// Whether the search index is maintained at all. Disabled in tests and
    /// CI environments where the index adds no value (§4.6: "it may be
    /// disabled; all writers become no-ops").
    #[serde(default = "default_search_enabled")]
    pub enabled: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            enabled: default_search_enabled(),
        }
    }
}

const fn default_search_enabled() -> bool {
    true
}

// ---------------------------------------------------------------------------
// RemoteConfig
// ---------------------------------------------------------------------------

/// Git remote interaction settings.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RemoteConfig {
    /// Seconds to wait for a fetch/pull/push before the operation is
    /// cancelled (§5 suspension/blocking points).
    #[serde(default = "default_remote_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_remote_timeout_secs(),
        }
    }
}

const fn default_remote_timeout_secs() -> u64 {
    60
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Error loading an Archon configuration file.
#[derive(Debug)]
pub struct ConfigError {
    /// The path that was being loaded (if available).
    pub path: Option<std::path::PathBuf>,
    /// Human-readable message with line-level detail when possible.
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(p) = &self.path {
            write!(f, "{}: {}", p.display(), self.message)
        } else {
            write!(f, "config error: {}", self.message)
        }
    }
}

impl std::error::Error for ConfigError {}

impl ArchonConfig {
    /// Load configuration from a TOML file.
    ///
    /// - If the file does not exist, returns all defaults (not an error).
    /// - If the file exists but contains invalid TOML or unknown fields,
    ///   returns a [`ConfigError`] with line-level detail.
    ///
    /// # Errors
    /// Returns `ConfigError` on I/O errors (other than not-found) or parse
    /// errors.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(ConfigError {
                    path: Some(path.to_owned()),
                    message: format!("could not read file: {e}"),
                });
            }
        };
        Self::parse(&contents).map_err(|mut e| {
            e.path = Some(path.to_owned());
            e
        })
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `ConfigError` on invalid TOML or unknown fields.
    pub fn parse(toml_str: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml_str).map_err(|e| {
            let mut message = e.message().to_owned();
            if let Some(span) = e.span() {
                let line = toml_str[..span.start]
                    .chars()
                    .filter(|&c| c == '\n')
                    .count()
                    + 1;
                message = format!("line {line}: {message}");
            }
            ConfigError { path: None, message }
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_all_fields() {
        let cfg = ArchonConfig::default();
        assert_eq!(cfg.attachments.lfs_threshold_bytes, 1024 * 1024);
        assert_eq!(cfg.snapshot.default_author, None);
        assert!(cfg.search.enabled);
        assert_eq!(cfg.remote.timeout_secs, 60);
        assert_eq!(cfg.lock_timeout_secs, 300);
    }

    #[test]
    fn parse_empty_string() {
        let cfg = ArchonConfig::parse("").unwrap();
        assert_eq!(cfg, ArchonConfig::default());
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
lock_timeout_secs = 120

[attachments]
lfs_threshold_bytes = 2048

[snapshot]
default_author = "alice@example.com"

[search]
enabled = false

[remote]
timeout_secs = 30
"#;
        let cfg = ArchonConfig::parse(toml).unwrap();
        assert_eq!(cfg.attachments.lfs_threshold_bytes, 2048);
        assert_eq!(cfg.snapshot.default_author.as_deref(), Some("alice@example.com"));
        assert!(!cfg.search.enabled);
        assert_eq!(cfg.remote.timeout_secs, 30);
        assert_eq!(cfg.lock_timeout_secs, 120);
    }

    #[test]
    fn parse_partial_config_uses_defaults() {
        let toml = r#"
[attachments]
lfs_threshold_bytes = 500
"#;
        let cfg = ArchonConfig::parse(toml).unwrap();
        assert_eq!(cfg.attachments.lfs_threshold_bytes, 500);
        assert!(cfg.search.enabled);
        assert_eq!(cfg.remote.timeout_secs, 60);
    }

    #[test]
    fn parse_rejects_unknown_top_level_field() {
        let toml = "unknown_field = true\n";
        let err = ArchonConfig::parse(toml).unwrap_err();
        assert!(err.message.contains("unknown field"), "{}", err.message);
    }

    #[test]
    fn parse_rejects_unknown_nested_field() {
        let toml = "[attachments]\nbogus = 1\n";
        let err = ArchonConfig::parse(toml).unwrap_err();
        assert!(err.message.contains("unknown field"), "{}", err.message);
    }

    #[test]
    fn parse_includes_line_number_on_error() {
        let toml = "good = 1\n[attachments]\nlfs_threshold_bytes = \"nope\"\n";
        let err = ArchonConfig::parse(toml).unwrap_err();
        assert!(err.message.contains("line"), "{}", err.message);
    }

    #[test]
    fn load_missing_file_returns_defaults() {
        let cfg = ArchonConfig::load(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(cfg, ArchonConfig::default());
    }

    #[test]
    fn load_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[search]\nenabled = false\n").unwrap();
        let cfg = ArchonConfig::load(&path).unwrap();
        assert!(!cfg.search.enabled);
    }

    #[test]
    fn load_invalid_file_shows_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "not valid [[[toml").unwrap();
        let err = ArchonConfig::load(&path).unwrap_err();
        assert_eq!(err.path.as_deref(), Some(path.as_path()));
        assert!(!err.message.is_empty());
    }

    #[test]
    fn config_error_display_with_path() {
        let err = ConfigError {
            path: Some(std::path::PathBuf::from("/repo/.archon/config.toml")),
            message: "bad field".to_owned(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("/repo/.archon/config.toml"));
        assert!(msg.contains("bad field"));
    }

    #[test]
    fn config_error_display_without_path() {
        let err = ConfigError {
            path: None,
            message: "parse error".to_owned(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("config error"));
        assert!(msg.contains("parse error"));
    }
}
