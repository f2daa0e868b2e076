//! Store configuration with environment variable and file-based loading.
//!
//! A `StoreConfig` is an explicit instance value: it is handed to a
//! `BlobStore` at construction and never changes afterwards. Multiple
//! stores with different configs can coexist in one process.
//!
//! Environment variables:
//! - `BLOBCAS_PATH`: storage root directory
//! - `BLOBCAS_MAX_SIZE_MB`: size ceiling in MiB
//! - `BLOBCAS_DEDUP`: set to "false" or "0" to disable deduplication
//!
//! Default root: `~/.blobcas/store`

use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

/// Configuration for a blob store instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory holding content, metadata, and the dedup map.
    pub storage_root: PathBuf,

    /// Upload size ceiling in MiB.
    #[serde(default = "default_max_size_mb")]
    pub max_size_mb: u64,

    /// MIME allow-list patterns (`type/subtype` or `type/*`).
    /// Empty means every MIME type is accepted.
    #[serde(default)]
    pub allowed_mime_types: Vec<String>,

    /// Whether identical uploads resolve to one stored copy.
    #[serde(default = "default_true")]
    pub enable_deduplication: bool,

    /// TTL hint applied when an upload doesn't supply one. Advisory only.
    #[serde(default = "default_ttl_hours")]
    pub default_ttl_hours: u32,
}

fn default_max_size_mb() -> u64 {
    100
}

fn default_true() -> bool {
    true
}

fn default_ttl_hours() -> u32 {
    24
}

/// Get the default storage root (~/.blobcas/store).
fn default_storage_root() -> PathBuf {
    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().join(".blobcas").join("store"))
        .unwrap_or_else(|| PathBuf::from(".blobcas/store"))
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            storage_root: default_storage_root(),
            max_size_mb: default_max_size_mb(),
            allowed_mime_types: Vec::new(),
            enable_deduplication: true,
            default_ttl_hours: default_ttl_hours(),
        }
    }
}

impl StoreConfig {
    /// Create a config with a specific storage root and defaults elsewhere.
    pub fn with_root(path: impl Into<PathBuf>) -> Self {
        Self {
            storage_root: path.into(),
            ..Self::default()
        }
    }

    /// Load configuration from environment variables, falling back to
    /// defaults.
    pub fn from_env() -> Self {
        let storage_root = env::var("BLOBCAS_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_storage_root());

        let max_size_mb = env::var("BLOBCAS_MAX_SIZE_MB")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(default_max_size_mb);

        let enable_deduplication = env::var("BLOBCAS_DEDUP")
            .map(|v| !(v.eq_ignore_ascii_case("false") || v == "0"))
            .unwrap_or(true);

        Self {
            storage_root,
            max_size_mb,
            enable_deduplication,
            ..Self::default()
        }
    }

    /// Load configuration from a TOML file's `[store]` section, falling
    /// back to environment loading when the section is absent.
    ///
    /// ```toml
    /// [store]
    /// storage_root = "/var/lib/blobcas"
    /// max_size_mb = 100
    /// allowed_mime_types = ["image/*", "application/pdf"]
    /// enable_deduplication = true
    /// default_ttl_hours = 24
    /// ```
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        let table: toml::Table = contents.parse().map_err(|e: toml::de::Error| {
            ConfigError::Parse {
                path: path.to_path_buf(),
                message: e.to_string(),
            }
        })?;

        if let Some(section) = table.get("store") {
            section
                .clone()
                .try_into()
                .map_err(|e: toml::de::Error| ConfigError::Parse {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })
        } else {
            Ok(Self::from_env())
        }
    }

    /// Size ceiling in bytes.
    pub fn max_size_bytes(&self) -> u64 {
        self.max_size_mb * 1024 * 1024
    }

    /// Directory holding content files.
    pub fn blobs_dir(&self) -> PathBuf {
        self.storage_root.join("blobs")
    }

    /// Directory holding metadata sidecar records.
    pub fn meta_dir(&self) -> PathBuf {
        self.storage_root.join("meta")
    }

    /// Directory holding the hash-to-id dedup map.
    pub fn dedup_dir(&self) -> PathBuf {
        self.storage_root.join("dedup")
    }

    /// Directory for in-flight temporary files. Lives under the root so a
    /// rename into any sibling directory stays on one filesystem.
    pub fn staging_dir(&self) -> PathBuf {
        self.storage_root.join("staging")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = StoreConfig::default();
        assert!(config.storage_root.to_string_lossy().contains(".blobcas"));
        assert_eq!(config.max_size_mb, 100);
        assert!(config.allowed_mime_types.is_empty());
        assert!(config.enable_deduplication);
        assert_eq!(config.default_ttl_hours, 24);
    }

    #[test]
    fn test_with_root() {
        let config = StoreConfig::with_root("/custom/path");
        assert_eq!(config.storage_root, PathBuf::from("/custom/path"));
        assert!(config.enable_deduplication);
    }

    #[test]
    fn test_max_size_bytes() {
        let mut config = StoreConfig::with_root("/x");
        config.max_size_mb = 2;
        assert_eq!(config.max_size_bytes(), 2 * 1024 * 1024);
    }

    #[test]
    fn test_directory_layout() {
        let config = StoreConfig::with_root("/test/store");
        assert_eq!(config.blobs_dir(), PathBuf::from("/test/store/blobs"));
        assert_eq!(config.meta_dir(), PathBuf::from("/test/store/meta"));
        assert_eq!(config.dedup_dir(), PathBuf::from("/test/store/dedup"));
        assert_eq!(config.staging_dir(), PathBuf::from("/test/store/staging"));
    }

    #[test]
    fn test_from_file_store_section() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blobcas.toml");
        std::fs::write(
            &path,
            r#"
[store]
storage_root = "/var/lib/blobcas"
max_size_mb = 50
allowed_mime_types = ["image/*"]
enable_deduplication = false
default_ttl_hours = 48
"#,
        )
        .unwrap();

        let config = StoreConfig::from_file(&path).unwrap();
        assert_eq!(config.storage_root, PathBuf::from("/var/lib/blobcas"));
        assert_eq!(config.max_size_mb, 50);
        assert_eq!(config.allowed_mime_types, vec!["image/*".to_string()]);
        assert!(!config.enable_deduplication);
        assert_eq!(config.default_ttl_hours, 48);
    }

    #[test]
    fn test_from_file_section_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blobcas.toml");
        std::fs::write(&path, "[store]\nstorage_root = \"/tank/blobs\"\n").unwrap();

        let config = StoreConfig::from_file(&path).unwrap();
        assert_eq!(config.storage_root, PathBuf::from("/tank/blobs"));
        assert_eq!(config.max_size_mb, 100);
        assert!(config.enable_deduplication);
    }

    #[test]
    fn test_serde_roundtrip() {
        let config = StoreConfig {
            storage_root: PathBuf::from("/custom"),
            max_size_mb: 10,
            allowed_mime_types: vec!["text/plain".to_string()],
            enable_deduplication: false,
            default_ttl_hours: 1,
        };
        let json = serde_json::to_string(&config).unwrap();
        let restored: StoreConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.storage_root, config.storage_root);
        assert_eq!(restored.max_size_mb, 10);
        assert!(!restored.enable_deduplication);
    }
}
