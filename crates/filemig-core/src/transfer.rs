//! The per-item fetch-then-store pipeline.

use std::fmt;
use std::sync::Arc;

use filemig_storage::StorageBackend;
use tracing::debug;

use crate::error::TransferError;
use crate::notify::ItemReport;
use crate::policy::PathPolicy;

/// Steps of a single item transfer, in execution order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TransferStage {
    /// Computing the source path.
    ResolveSource,
    /// Reading the payload from the source backend.
    Fetch,
    /// Computing the destination path.
    ResolveDestination,
    /// Writing the payload to the destination backend.
    Store,
}

impl TransferStage {
    /// Stable identifier used in logs and reports.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ResolveSource => "resolve_source",
            Self::Fetch => "fetch",
            Self::ResolveDestination => "resolve_destination",
            Self::Store => "store",
        }
    }
}

impl fmt::Display for TransferStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared, read-only inputs every transfer unit of a run works with.
pub(crate) struct TransferContext<I> {
    pub(crate) policy: Arc<dyn PathPolicy<I>>,
    pub(crate) source: Arc<dyn StorageBackend>,
    pub(crate) destination: Arc<dyn StorageBackend>,
}

impl<I> Clone for TransferContext<I> {
    fn clone(&self) -> Self {
        Self {
            policy: Arc::clone(&self.policy),
            source: Arc::clone(&self.source),
            destination: Arc::clone(&self.destination),
        }
    }
}

/// Event a transfer unit yields exactly once, consumed by the notifier and
/// the batch tally.
#[derive(Debug)]
pub(crate) struct ItemFinished<I> {
    pub(crate) report: ItemReport<I>,
    pub(crate) bytes: u64,
}

impl<I> ItemFinished<I> {
    fn failed(
        item: I,
        error: TransferError,
        source_path: Option<String>,
        destination_path: Option<String>,
    ) -> Self {
        Self {
            report: ItemReport {
                error: Some(Arc::new(error)),
                item,
                source_path,
                destination_path,
            },
            bytes: 0,
        }
    }
}

/// Move one item from the source to the destination backend.
///
/// The destination path is resolved and the store attempted only after the
/// fetch succeeded. Never fails: every outcome is captured in the event.
pub(crate) async fn transfer<I>(item: I, ctx: TransferContext<I>) -> ItemFinished<I>
where
    I: Send + 'static,
{
    let source_path = match ctx.policy.source_path(&item) {
        Ok(path) => path,
        Err(source) => {
            let error = TransferError::PathResolution {
                stage: TransferStage::ResolveSource,
                source,
            };
            return ItemFinished::failed(item, error, None, None);
        }
    };

    let payload = match ctx.source.fetch(&source_path).await {
        Ok(payload) => payload,
        Err(source) => {
            let error = TransferError::Fetch {
                path: source_path.clone(),
                source,
            };
            return ItemFinished::failed(item, error, Some(source_path), None);
        }
    };

    let destination_path = match ctx.policy.destination_path(&item) {
        Ok(path) => path,
        Err(source) => {
            let error = TransferError::PathResolution {
                stage: TransferStage::ResolveDestination,
                source,
            };
            return ItemFinished::failed(item, error, Some(source_path), None);
        }
    };

    if let Err(source) = ctx.destination.store(&destination_path, &payload).await {
        let error = TransferError::Store {
            path: destination_path.clone(),
            source,
        };
        return ItemFinished::failed(item, error, Some(source_path), Some(destination_path));
    }

    debug!(
        source = %source_path,
        destination = %destination_path,
        bytes = payload.len(),
        "item transferred"
    );
    ItemFinished {
        report: ItemReport {
            error: None,
            item,
            source_path: Some(source_path),
            destination_path: Some(destination_path),
        },
        bytes: u64::try_from(payload.len()).unwrap_or(u64::MAX),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::FnPathPolicy;
    use filemig_storage::{MemoryBackend, StorageError};

    fn context(
        source: &MemoryBackend,
        destination: &MemoryBackend,
        policy: impl PathPolicy<String> + 'static,
    ) -> TransferContext<String> {
        TransferContext {
            policy: Arc::new(policy),
            source: Arc::new(source.clone()),
            destination: Arc::new(destination.clone()),
        }
    }

    fn prefixing_policy() -> impl PathPolicy<String> {
        FnPathPolicy::new(
            |item: &String| Ok(item.clone()),
            |item: &String| Ok(format!("copied/{item}")),
        )
    }

    #[test]
    fn stage_names_are_stable() {
        assert_eq!(TransferStage::ResolveSource.as_str(), "resolve_source");
        assert_eq!(TransferStage::Store.to_string(), "store");
    }

    #[tokio::test]
    async fn successful_transfer_reports_both_paths() {
        let source = MemoryBackend::with_objects([("a.txt", b"alpha".to_vec())]);
        let destination = MemoryBackend::new();
        let ctx = context(&source, &destination, prefixing_policy());

        let finished = transfer("a.txt".to_string(), ctx).await;
        assert!(finished.report.error.is_none());
        assert_eq!(finished.report.source_path.as_deref(), Some("a.txt"));
        assert_eq!(
            finished.report.destination_path.as_deref(),
            Some("copied/a.txt")
        );
        assert_eq!(finished.bytes, 5);
        assert_eq!(destination.get("copied/a.txt"), Some(b"alpha".to_vec()));
    }

    #[tokio::test]
    async fn fetch_failure_skips_destination_entirely() {
        let source = MemoryBackend::new();
        let destination = MemoryBackend::new();
        let ctx = context(&source, &destination, prefixing_policy());

        let finished = transfer("missing".to_string(), ctx).await;
        let error = finished.report.error.expect("fetch should fail");
        assert!(matches!(
            error.as_ref(),
            TransferError::Fetch {
                source: StorageError::NotFound { .. },
                ..
            }
        ));
        assert_eq!(finished.report.source_path.as_deref(), Some("missing"));
        assert!(finished.report.destination_path.is_none());
        assert!(destination.is_empty());
    }

    #[tokio::test]
    async fn source_resolution_failure_reports_no_paths() {
        let source = MemoryBackend::with_objects([("a", b"x".to_vec())]);
        let destination = MemoryBackend::new();
        let policy = FnPathPolicy::new(
            |_: &String| Err("no source".into()),
            |item: &String| Ok(item.clone()),
        );
        let ctx = context(&source, &destination, policy);

        let finished = transfer("a".to_string(), ctx).await;
        let error = finished.report.error.expect("resolution should fail");
        assert_eq!(error.stage(), TransferStage::ResolveSource);
        assert!(finished.report.source_path.is_none());
        assert!(finished.report.destination_path.is_none());
    }

    #[tokio::test]
    async fn destination_resolution_failure_keeps_source_path() {
        let source = MemoryBackend::with_objects([("a", b"x".to_vec())]);
        let destination = MemoryBackend::new();
        let policy = FnPathPolicy::new(
            |item: &String| Ok(item.clone()),
            |_: &String| Err("no destination".into()),
        );
        let ctx = context(&source, &destination, policy);

        let finished = transfer("a".to_string(), ctx).await;
        let error = finished.report.error.expect("resolution should fail");
        assert_eq!(error.stage(), TransferStage::ResolveDestination);
        assert_eq!(finished.report.source_path.as_deref(), Some("a"));
        assert!(finished.report.destination_path.is_none());
        assert!(destination.is_empty());
    }

    #[tokio::test]
    async fn store_failure_reports_both_paths() {
        let source = MemoryBackend::with_objects([("a", b"x".to_vec())]);
        let destination = MemoryBackend::new();
        let policy = FnPathPolicy::new(|item: &String| Ok(item.clone()), |_: &String| {
            Ok(String::new())
        });
        let ctx = context(&source, &destination, policy);

        let finished = transfer("a".to_string(), ctx).await;
        let error = finished.report.error.expect("empty path should be rejected");
        assert_eq!(error.stage(), TransferStage::Store);
        assert_eq!(finished.report.destination_path.as_deref(), Some(""));
        assert_eq!(finished.bytes, 0);
    }
}
