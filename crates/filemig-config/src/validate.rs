//! Validation helpers for configuration documents.

use crate::error::{ConfigError, ConfigResult};
use crate::model::{BackendConfig, MigrationConfig, ObjectStorageConfig};

/// Check a parsed configuration for values the backends cannot work with.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] describing the first offending field.
pub fn validate_config(config: &MigrationConfig) -> ConfigResult<()> {
    validate_backend("source", &config.source)?;
    validate_backend("destination", &config.destination)?;

    require_non_empty("paths", "source", &config.paths.source)?;
    require_non_empty("paths", "destination", &config.paths.destination)?;

    if config.max_concurrency == Some(0) {
        return Err(ConfigError::invalid(
            "migration",
            "max_concurrency",
            "must be positive",
            Some("0".to_string()),
        ));
    }

    require_non_empty("logging", "level", &config.logging.level)?;
    if let Some(format) = config.logging.format.as_deref() {
        if !matches!(format, "json" | "pretty" | "text") {
            return Err(ConfigError::invalid(
                "logging",
                "format",
                "must be json or pretty",
                Some(format.to_string()),
            ));
        }
    }
    Ok(())
}

fn validate_backend(section: &'static str, backend: &BackendConfig) -> ConfigResult<()> {
    match backend {
        BackendConfig::Filesystem(fs) => {
            if !fs.absolute_path.is_absolute() {
                return Err(ConfigError::invalid(
                    section,
                    "absolute_path",
                    "must be absolute",
                    Some(fs.absolute_path.display().to_string()),
                ));
            }
            Ok(())
        }
        BackendConfig::ObjectStorage(object) => validate_object_storage(section, object),
        BackendConfig::Memory => Ok(()),
    }
}

fn validate_object_storage(section: &'static str, config: &ObjectStorageConfig) -> ConfigResult<()> {
    require_non_empty(section, "access_key_id", &config.access_key_id)?;
    require_non_empty(section, "secret_access_key", &config.secret_access_key)?;
    require_non_empty(section, "bucket", &config.bucket)?;
    if let Some(region) = config.region.as_deref() {
        require_non_empty(section, "region", region)?;
    }
    if let Some(endpoint) = config.endpoint.as_deref() {
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(ConfigError::invalid(
                section,
                "endpoint",
                "must be an http(s) URL",
                Some(endpoint.to_string()),
            ));
        }
    }
    Ok(())
}

fn require_non_empty(section: &'static str, field: &'static str, value: &str) -> ConfigResult<()> {
    if value.trim().is_empty() {
        return Err(ConfigError::invalid(section, field, "empty", None));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FilesystemConfig, LoggingSettings, PathTemplates};
    use std::path::PathBuf;

    fn base() -> MigrationConfig {
        MigrationConfig {
            source: BackendConfig::Filesystem(FilesystemConfig {
                absolute_path: PathBuf::from("/srv/uploads"),
            }),
            destination: BackendConfig::ObjectStorage(ObjectStorageConfig {
                access_key_id: "AKID".to_string(),
                secret_access_key: "secret".to_string(),
                region: None,
                bucket: "bucket".to_string(),
                endpoint: Some("http://127.0.0.1:9000".to_string()),
            }),
            paths: PathTemplates {
                source: "{item}".to_string(),
                destination: "{item}".to_string(),
            },
            max_concurrency: None,
            logging: LoggingSettings::default(),
        }
    }

    fn invalid_field(config: &MigrationConfig) -> Option<(&'static str, &'static str)> {
        match validate_config(config) {
            Err(ConfigError::InvalidField { section, field, .. }) => Some((section, field)),
            _ => None,
        }
    }

    #[test]
    fn accepts_complete_configuration() {
        assert!(validate_config(&base()).is_ok());
    }

    #[test]
    fn rejects_relative_filesystem_root() {
        let mut config = base();
        config.source = BackendConfig::Filesystem(FilesystemConfig {
            absolute_path: PathBuf::from("relative/dir"),
        });
        assert_eq!(invalid_field(&config), Some(("source", "absolute_path")));
    }

    #[test]
    fn rejects_blank_object_storage_fields() {
        let mut config = base();
        if let BackendConfig::ObjectStorage(object) = &mut config.destination {
            object.bucket = "  ".to_string();
        }
        assert_eq!(invalid_field(&config), Some(("destination", "bucket")));

        let mut config = base();
        if let BackendConfig::ObjectStorage(object) = &mut config.destination {
            object.endpoint = Some("ftp://example".to_string());
        }
        assert_eq!(invalid_field(&config), Some(("destination", "endpoint")));
    }

    #[test]
    fn rejects_zero_concurrency_and_empty_templates() {
        let mut config = base();
        config.max_concurrency = Some(0);
        assert_eq!(
            invalid_field(&config),
            Some(("migration", "max_concurrency"))
        );

        let mut config = base();
        config.paths.destination = String::new();
        assert_eq!(invalid_field(&config), Some(("paths", "destination")));
    }

    #[test]
    fn rejects_unknown_log_format() {
        let mut config = base();
        config.logging.format = Some("xml".to_string());
        assert_eq!(invalid_field(&config), Some(("logging", "format")));
    }
}
