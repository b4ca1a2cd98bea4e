//! Typed configuration models.
//!
//! # Design
//! - Pure data carriers; IO lives in `loader.rs` and checks in `validate.rs`.
//! - Backends are selected by the `kind` tag, one variant per backend adapter.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::defaults::{DEFAULT_LOG_LEVEL, DEFAULT_REGION, REDACTED};

/// Complete description of one migration: where to read, where to write and
/// how to name each item on either side.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MigrationConfig {
    /// Backend items are fetched from.
    pub source: BackendConfig,
    /// Backend items are stored to.
    pub destination: BackendConfig,
    /// Path templates rendered per item.
    pub paths: PathTemplates,
    /// Optional cap on concurrently running transfers; unbounded when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_concurrency: Option<usize>,
    /// Logging preferences for binaries driving the migration.
    #[serde(default)]
    pub logging: LoggingSettings,
}

impl MigrationConfig {
    /// Copy of the configuration with credentials replaced by a placeholder.
    #[must_use]
    pub fn redacted(&self) -> Self {
        Self {
            source: self.source.redacted(),
            destination: self.destination.redacted(),
            ..self.clone()
        }
    }
}

/// Backend selection, tagged by `kind`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackendConfig {
    /// Local filesystem rooted at an absolute directory.
    Filesystem(FilesystemConfig),
    /// S3-compatible object storage bucket.
    ObjectStorage(ObjectStorageConfig),
    /// Process-local in-memory store (dry runs and tests).
    Memory,
}

impl BackendConfig {
    /// Stable identifier of the backend kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Filesystem(_) => "filesystem",
            Self::ObjectStorage(_) => "object_storage",
            Self::Memory => "memory",
        }
    }

    /// Copy of the backend configuration with secrets replaced.
    #[must_use]
    pub fn redacted(&self) -> Self {
        match self {
            Self::ObjectStorage(config) => Self::ObjectStorage(ObjectStorageConfig {
                secret_access_key: REDACTED.to_string(),
                ..config.clone()
            }),
            other => other.clone(),
        }
    }
}

/// Filesystem backend settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FilesystemConfig {
    /// Absolute base directory; item paths are joined onto it.
    pub absolute_path: PathBuf,
}

/// Object storage backend settings.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ObjectStorageConfig {
    /// Access key with read (source) or write (destination) permission.
    pub access_key_id: String,
    /// Secret paired with `access_key_id`.
    pub secret_access_key: String,
    /// Bucket region; defaults to [`DEFAULT_REGION`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Bucket to fetch from or upload to.
    pub bucket: String,
    /// Custom endpoint for S3-compatible services (path-style addressing).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

impl ObjectStorageConfig {
    /// Configured region or the default.
    #[must_use]
    pub fn region_or_default(&self) -> &str {
        self.region.as_deref().unwrap_or(DEFAULT_REGION)
    }
}

impl fmt::Debug for ObjectStorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectStorageConfig")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &REDACTED)
            .field("region", &self.region)
            .field("bucket", &self.bucket)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

/// Templates used to derive the source and destination path of each item.
///
/// Placeholders use `{name}` syntax and are filled from the item's fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PathTemplates {
    /// Template for the path read from the source backend.
    pub source: String,
    /// Template for the path written to the destination backend.
    pub destination: String,
}

/// Logging preferences.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoggingSettings {
    /// Level directive handed to the tracing filter.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// `json` or `pretty`; inferred from the build when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: None,
        }
    }
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}
