//! Per-item completion reporting.

use std::sync::Arc;

use crate::error::TransferError;

/// Outcome of one item, delivered to the completion notifier exactly once.
#[derive(Debug, Clone)]
pub struct ItemReport<I> {
    /// Failure, or `None` when the item was stored.
    pub error: Option<Arc<TransferError>>,
    /// The item as produced by the item source.
    pub item: I,
    /// Resolved source path; `None` when resolution itself failed.
    pub source_path: Option<String>,
    /// Resolved destination path; `None` unless a store was attempted.
    pub destination_path: Option<String>,
}

impl<I> ItemReport<I> {
    /// `true` when the item was fetched and stored.
    #[must_use]
    pub const fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Receives one report per enumerated item.
///
/// Calls are made from the driver as units finish, in completion order.
/// Implementations should return quickly; slow notifiers delay the
/// collection of later results but never the transfers themselves.
pub trait CompletionNotifier<I>: Send + Sync {
    /// Handle the outcome of a single item.
    fn notify(&self, report: &ItemReport<I>);
}

impl<I, F> CompletionNotifier<I> for F
where
    F: Fn(&ItemReport<I>) + Send + Sync,
{
    fn notify(&self, report: &ItemReport<I>) {
        self(report);
    }
}

/// Notifier that ignores every report.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl<I> CompletionNotifier<I> for NoopNotifier {
    fn notify(&self, _report: &ItemReport<I>) {}
}
