//! # Design
//!
//! - Per-item failures (`TransferError`) are isolated values shared via `Arc`
//!   between the completion notifier and the batch result.
//! - Run-level failures (`RunError`) distinguish a fatal enumeration failure
//!   from a completed pass in which some items failed.
//! - Messages are constant; context lives in fields and chained sources.

use std::error::Error as StdError;
use std::sync::Arc;

use filemig_storage::StorageError;
use thiserror::Error;

use crate::transfer::TransferStage;

/// Boxed error returned by caller-provided item sources and path policies.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Result type for a whole migration run.
pub type RunResult<T> = Result<T, RunError>;

/// Failure of a single item's fetch-then-store pipeline.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The path policy could not produce a path for the item.
    #[error("failed to resolve item path")]
    PathResolution {
        /// Stage whose path could not be resolved.
        stage: TransferStage,
        /// Error returned by the path policy.
        source: BoxError,
    },
    /// Reading the payload from the source backend failed.
    #[error("failed to fetch item from source")]
    Fetch {
        /// Source path that was read.
        path: String,
        /// Backend error.
        source: StorageError,
    },
    /// Writing the payload to the destination backend failed.
    #[error("failed to store item at destination")]
    Store {
        /// Destination path that was written.
        path: String,
        /// Backend error, including integrity mismatches.
        source: StorageError,
    },
}

impl TransferError {
    /// Pipeline stage the failure happened in.
    #[must_use]
    pub const fn stage(&self) -> TransferStage {
        match self {
            Self::PathResolution { stage, .. } => *stage,
            Self::Fetch { .. } => TransferStage::Fetch,
            Self::Store { .. } => TransferStage::Store,
        }
    }

    /// `true` when the item failed before anything was written.
    #[must_use]
    pub const fn is_fetch_side(&self) -> bool {
        matches!(
            self.stage(),
            TransferStage::ResolveSource | TransferStage::Fetch
        )
    }

    /// Underlying storage error, when a backend call failed.
    #[must_use]
    pub const fn storage_error(&self) -> Option<&StorageError> {
        match self {
            Self::Fetch { source, .. } | Self::Store { source, .. } => Some(source),
            Self::PathResolution { .. } => None,
        }
    }
}

/// Terminal failure of a migration run.
#[derive(Debug, Error)]
pub enum RunError {
    /// The item source could not list items; nothing was transferred.
    #[error("failed to enumerate items")]
    Enumeration {
        /// Error returned by the item source.
        source: BoxError,
    },
    /// Every item was attempted and at least one failed.
    #[error("one or more items failed to migrate")]
    ItemsFailed {
        /// Number of failed items.
        failed: usize,
        /// Number of items attempted.
        total: usize,
        /// First failure observed by the driver; the same value the notifier
        /// received for that item.
        #[source]
        first: Arc<TransferError>,
    },
    /// Some transfer units were cancelled by the runtime before reporting.
    /// Their items reached neither the notifier nor the tally.
    #[error("transfer units were cancelled before finishing")]
    Cancelled {
        /// Number of items without an outcome.
        unfinished: usize,
        /// Number of items enumerated.
        total: usize,
    },
}

impl RunError {
    /// Representative per-item failure, if the run got past enumeration.
    #[must_use]
    pub fn first_item_error(&self) -> Option<&Arc<TransferError>> {
        match self {
            Self::ItemsFailed { first, .. } => Some(first),
            Self::Enumeration { .. } | Self::Cancelled { .. } => None,
        }
    }
}

/// Render an error and its source chain as `outer: inner: root`.
#[must_use]
pub fn error_chain(error: &(dyn StdError + 'static)) -> String {
    let mut rendered = error.to_string();
    let mut current = error.source();
    while let Some(cause) = current {
        rendered.push_str(": ");
        rendered.push_str(&cause.to_string());
        current = cause.source();
    }
    rendered
}
