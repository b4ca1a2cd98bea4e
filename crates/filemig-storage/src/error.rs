//! # Design
//!
//! - Provide structured, constant-message errors for backend operations.
//! - Capture operation context (backend, path, status) so callers can report
//!   exactly which object failed.
//! - Preserve source errors without interpolating context into messages.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors produced by storage backends.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Nothing is stored at the requested path.
    #[error("object not found")]
    NotFound {
        /// Backend kind that was queried.
        backend: &'static str,
        /// Path that was requested.
        path: String,
    },
    /// The path cannot be used with this backend.
    #[error("storage path rejected")]
    InvalidPath {
        /// Offending path.
        path: String,
        /// Static reason for the rejection.
        reason: &'static str,
    },
    /// IO failures while interacting with the filesystem.
    #[error("storage io failure")]
    Io {
        /// Operation that triggered the IO failure.
        operation: &'static str,
        /// Path involved in the IO failure.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// The request never produced a service answer (connection, timeout,
    /// request construction or response decoding).
    #[error("storage transport failure")]
    Transport {
        /// Operation that triggered the failure.
        operation: &'static str,
        /// Object key involved.
        key: String,
        /// Underlying client error.
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },
    /// The service answered with a non-success status.
    #[error("storage request rejected")]
    Status {
        /// Operation that triggered the failure.
        operation: &'static str,
        /// Object key involved.
        key: String,
        /// HTTP status code returned.
        status: u16,
        /// Leading part of the response body, when one was returned.
        body: Option<String>,
    },
    /// The digest reported after a successful write did not match the payload.
    #[error("checksum mismatch after write")]
    IntegrityMismatch {
        /// Path that was written.
        path: String,
        /// Digest computed locally from the payload.
        expected: String,
        /// Digest reported by the backend, if any.
        actual: Option<String>,
    },
    /// Backend configuration could not be turned into a working client.
    #[error("invalid backend configuration")]
    InvalidConfig {
        /// Field that failed validation.
        field: &'static str,
        /// Static reason for the failure.
        reason: &'static str,
        /// Offending value when available.
        value: Option<String>,
    },
}

impl StorageError {
    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn invalid_path(path: &str, reason: &'static str) -> Self {
        Self::InvalidPath {
            path: path.to_string(),
            reason,
        }
    }

    /// `true` when the error means the object does not exist.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// `true` when the write succeeded but verification failed.
    #[must_use]
    pub const fn is_integrity_mismatch(&self) -> bool {
        matches!(self, Self::IntegrityMismatch { .. })
    }
}
