//! CLI error type and exit codes.

use std::fmt::{self, Display, Formatter};

use filemig_config::ConfigError;

/// CLI-level error type separating bad input from operational failures.
#[derive(Debug)]
pub(crate) enum CliError {
    /// Invalid configuration, manifest or template (exit code 2).
    Validation(String),
    /// Backend construction, IO or other runtime failures (exit code 3).
    Failure(anyhow::Error),
    /// The run completed but some items failed (exit code 4).
    ItemsFailed { failed: usize, total: usize },
}

/// Convenience alias for functions returning a `CliError`.
pub(crate) type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn failure(error: impl Into<anyhow::Error>) -> Self {
        Self::Failure(error.into())
    }

    pub(crate) const fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => 2,
            Self::Failure(_) => 3,
            Self::ItemsFailed { .. } => 4,
        }
    }

    pub(crate) fn display_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::Failure(error) => format!("{error:#}"),
            Self::ItemsFailed { failed, total } => {
                format!("{failed} of {total} items failed to migrate")
            }
        }
    }
}

impl Display for CliError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str("cli error")
    }
}

impl std::error::Error for CliError {}

/// Unreadable files are operational failures; everything else the loader
/// rejects is a problem with the document itself.
pub(crate) fn classify_config_error(error: ConfigError) -> CliError {
    let detail = match &error {
        ConfigError::Io { path, .. } => {
            let context = format!("failed to read {}", path.display());
            return CliError::failure(anyhow::Error::new(error).context(context));
        }
        ConfigError::MissingEnvVar { name } => {
            format!("environment variable `{name}` is not set")
        }
        ConfigError::UnsupportedFormat { path } => format!(
            "{} is not a .yaml, .yml or .json file",
            path.display()
        ),
        ConfigError::InvalidField {
            section,
            field,
            reason,
            value,
        } => value.as_ref().map_or_else(
            || format!("{section}.{field}: {reason}"),
            |value| format!("{section}.{field}: {reason} (got `{value}`)"),
        ),
        ConfigError::UnterminatedEnvRef { .. }
        | ConfigError::Yaml { .. }
        | ConfigError::Json { .. } => filemig_core::error_chain(&error),
    };
    CliError::validation(format!("invalid configuration: {detail}"))
}
