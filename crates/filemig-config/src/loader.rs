//! Reading configuration documents from disk.
//!
//! # Design
//! - Format is chosen from the file extension (`.yaml`/`.yml`/`.json`).
//! - `${VAR}` references are expanded after parsing, inside backend string
//!   fields only. Substituted values are never re-read as YAML or JSON, and
//!   references in comments or other fields are left alone.
//! - Every loaded document is validated before it is handed out.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::model::{BackendConfig, MigrationConfig};
use crate::validate::validate_config;

/// Serialization formats accepted for configuration documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// YAML document.
    Yaml,
    /// JSON document.
    Json,
}

impl ConfigFormat {
    /// Infer the format from a file extension.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "yaml" | "yml" => Some(Self::Yaml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    /// Lowercase name of the format.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Yaml => "yaml",
            Self::Json => "json",
        }
    }
}

/// Load, expand and validate a migration configuration file.
///
/// # Errors
///
/// Returns an error if the file cannot be read, has an unsupported extension,
/// references an unset environment variable, fails to parse, or fails
/// validation.
pub fn load_config(path: &Path) -> ConfigResult<MigrationConfig> {
    let format = ConfigFormat::from_path(path).ok_or_else(|| ConfigError::UnsupportedFormat {
        path: path.to_path_buf(),
    })?;
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        operation: "config.read",
        path: path.to_path_buf(),
        source,
    })?;
    let mut config = parse_config(&raw, format)?;
    resolve_env_refs(&mut config, |name| env::var(name).ok())?;
    validate_config(&config)?;
    debug!(
        path = %path.display(),
        format = format.as_str(),
        source_kind = config.source.kind(),
        destination_kind = config.destination.kind(),
        "loaded migration configuration"
    );
    Ok(config)
}

/// Parse a configuration document without validating it.
///
/// # Errors
///
/// Returns an error if the text is not a well-formed document of the given
/// format or does not match the configuration model.
pub fn parse_config(text: &str, format: ConfigFormat) -> ConfigResult<MigrationConfig> {
    match format {
        ConfigFormat::Yaml => {
            serde_yaml::from_str(text).map_err(|source| ConfigError::Yaml { source })
        }
        ConfigFormat::Json => {
            serde_json::from_str(text).map_err(|source| ConfigError::Json { source })
        }
    }
}

/// Expand `${NAME}` references in the string fields of both backends.
///
/// Covers object storage credentials, region, bucket and endpoint, and the
/// filesystem root. Path templates and logging settings are taken verbatim.
///
/// # Errors
///
/// Returns the first expansion error, see [`expand_env_refs`].
pub fn resolve_env_refs<F>(config: &mut MigrationConfig, lookup: F) -> ConfigResult<()>
where
    F: Fn(&str) -> Option<String>,
{
    for backend in [&mut config.source, &mut config.destination] {
        match backend {
            BackendConfig::Filesystem(filesystem) => {
                // Non-UTF-8 paths cannot carry references.
                if let Some(raw) = filesystem.absolute_path.to_str() {
                    let expanded = expand_env_refs(raw, &lookup)?;
                    filesystem.absolute_path = PathBuf::from(expanded);
                }
            }
            BackendConfig::ObjectStorage(storage) => {
                expand_in_place(&mut storage.access_key_id, &lookup)?;
                expand_in_place(&mut storage.secret_access_key, &lookup)?;
                expand_in_place(&mut storage.bucket, &lookup)?;
                if let Some(region) = storage.region.as_mut() {
                    expand_in_place(region, &lookup)?;
                }
                if let Some(endpoint) = storage.endpoint.as_mut() {
                    expand_in_place(endpoint, &lookup)?;
                }
            }
            BackendConfig::Memory => {}
        }
    }
    Ok(())
}

fn expand_in_place<F>(value: &mut String, lookup: F) -> ConfigResult<()>
where
    F: Fn(&str) -> Option<String>,
{
    if value.contains("${") {
        *value = expand_env_refs(value, lookup)?;
    }
    Ok(())
}

/// Replace every `${NAME}` in `text` with the value returned by `lookup`.
///
/// # Errors
///
/// Returns an error if a reference is unterminated, empty, or names a
/// variable `lookup` cannot resolve.
pub fn expand_env_refs<F>(text: &str, lookup: F) -> ConfigResult<String>
where
    F: Fn(&str) -> Option<String>,
{
    let mut expanded = String::with_capacity(text.len());
    let mut rest = text;
    let mut consumed = 0;

    while let Some(start) = rest.find("${") {
        expanded.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after.find('}').ok_or(ConfigError::UnterminatedEnvRef {
            offset: consumed + start,
        })?;
        let name = after[..end].trim();
        if name.is_empty() {
            return Err(ConfigError::invalid("env", "reference", "empty", None));
        }
        let value = lookup(name).ok_or_else(|| ConfigError::MissingEnvVar {
            name: name.to_string(),
        })?;
        expanded.push_str(&value);

        let advance = start + 2 + end + 1;
        consumed += advance;
        rest = &rest[advance..];
    }
    expanded.push_str(rest);
    Ok(expanded)
}
