//! Error types for configuration loading and validation.
//!
//! # Design
//! - Constant messages; context lives in structured fields.
//! - Source errors are preserved rather than interpolated into messages.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Primary error type for configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reading the configuration file failed.
    #[error("failed to read configuration file")]
    Io {
        /// Operation identifier.
        operation: &'static str,
        /// File involved in the failure.
        path: PathBuf,
        /// Source IO error.
        source: io::Error,
    },
    /// The file extension did not map to a supported format.
    #[error("unsupported configuration format")]
    UnsupportedFormat {
        /// File whose format could not be determined.
        path: PathBuf,
    },
    /// YAML document could not be parsed into the configuration model.
    #[error("invalid YAML configuration")]
    Yaml {
        /// Source YAML error.
        source: serde_yaml::Error,
    },
    /// JSON document could not be parsed into the configuration model.
    #[error("invalid JSON configuration")]
    Json {
        /// Source JSON error.
        source: serde_json::Error,
    },
    /// A `${VAR}` reference named an unset environment variable.
    #[error("environment variable referenced by configuration is not set")]
    MissingEnvVar {
        /// Name of the missing variable.
        name: String,
    },
    /// A `${` sequence was never closed.
    #[error("unterminated environment reference")]
    UnterminatedEnvRef {
        /// Byte offset of the opening `${`.
        offset: usize,
    },
    /// Field contained an invalid value.
    #[error("invalid configuration field")]
    InvalidField {
        /// Section that failed validation.
        section: &'static str,
        /// Field that failed validation.
        field: &'static str,
        /// Machine-readable reason for the failure.
        reason: &'static str,
        /// Offending value when available.
        value: Option<String>,
    },
}

/// Convenience alias for configuration results.
pub type ConfigResult<T> = Result<T, ConfigError>;

impl ConfigError {
    pub(crate) fn invalid(
        section: &'static str,
        field: &'static str,
        reason: &'static str,
        value: Option<String>,
    ) -> Self {
        Self::InvalidField {
            section,
            field,
            reason,
            value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn messages_are_constant_and_sources_chain() {
        let io_err = ConfigError::Io {
            operation: "config.read",
            path: PathBuf::from("migration.yaml"),
            source: io::Error::other("io"),
        };
        assert_eq!(io_err.to_string(), "failed to read configuration file");
        assert!(io_err.source().is_some());

        let invalid = ConfigError::invalid("paths", "source", "empty", None);
        assert_eq!(invalid.to_string(), "invalid configuration field");
        assert!(invalid.source().is_none());

        let missing = ConfigError::MissingEnvVar {
            name: "AWS_SECRET".to_string(),
        };
        assert_eq!(
            missing.to_string(),
            "environment variable referenced by configuration is not set"
        );
    }
}
