//! Run driver: enumerate, fan out one transfer unit per item, collect.
//!
//! # Design
//! - Every item gets its own task in a `JoinSet`; concurrency is unbounded
//!   unless a limit is attached, in which case a semaphore gates the units.
//! - Units never fail. Each yields one `ItemFinished` event that the driver
//!   forwards to the notifier and the batch tally as it is joined, so the
//!   notifier sees items in completion order.
//! - The first failure joined becomes the run's representative error.
//! - A panicking unit is resumed on the driver; it is a bug, not an item
//!   failure.
//! - A unit cancelled by the runtime has lost its item. The driver keeps
//!   draining the rest, then fails the run with `RunError::Cancelled`.

use std::num::NonZeroUsize;
use std::panic;
use std::sync::Arc;
use std::time::{Duration, Instant};

use filemig_storage::StorageBackend;
use filemig_telemetry::{ItemOutcome, Metrics, RunOutcome};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use crate::error::{RunError, RunResult, error_chain};
use crate::notify::CompletionNotifier;
use crate::policy::PathPolicy;
use crate::source::ItemSource;
use crate::tally::{BatchTally, RunSummary};
use crate::transfer::{ItemFinished, TransferContext, transfer};

/// A configured migration: what to move, how to name it, where it goes.
///
/// A `Migration` can be run more than once; every run enumerates afresh.
pub struct Migration<I> {
    items: Arc<dyn ItemSource<I>>,
    context: TransferContext<I>,
    notifier: Arc<dyn CompletionNotifier<I>>,
    metrics: Option<Metrics>,
    max_concurrency: Option<NonZeroUsize>,
}

impl<I> Migration<I>
where
    I: Send + 'static,
{
    /// Assemble a migration from its collaborators.
    pub fn new(
        items: impl ItemSource<I> + 'static,
        policy: impl PathPolicy<I> + 'static,
        source: Arc<dyn StorageBackend>,
        destination: Arc<dyn StorageBackend>,
        notifier: impl CompletionNotifier<I> + 'static,
    ) -> Self {
        Self {
            items: Arc::new(items),
            context: TransferContext {
                policy: Arc::new(policy),
                source,
                destination,
            },
            notifier: Arc::new(notifier),
            metrics: None,
            max_concurrency: None,
        }
    }

    /// Record item, byte and run counters into `metrics`.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Cap the number of transfer units in flight. `0` keeps the default of
    /// one concurrent unit per item.
    #[must_use]
    pub fn with_max_concurrency(mut self, limit: usize) -> Self {
        self.max_concurrency = NonZeroUsize::new(limit);
        self
    }

    /// Currently configured concurrency cap, if any.
    #[must_use]
    pub const fn max_concurrency(&self) -> Option<NonZeroUsize> {
        self.max_concurrency
    }

    /// Migrate every item the source lists.
    ///
    /// Individual item failures never stop the pass; the call returns only
    /// after every unit has finished and the notifier has seen every item.
    ///
    /// # Errors
    ///
    /// - [`RunError::Enumeration`] when listing fails. No backend is touched
    ///   and the notifier is never called.
    /// - [`RunError::ItemsFailed`] when at least one item failed, carrying
    ///   the first failure the driver observed.
    /// - [`RunError::Cancelled`] when the runtime cancelled a unit before it
    ///   reported; those items have no outcome.
    ///
    /// # Panics
    ///
    /// Re-raises a panic from a transfer unit.
    pub async fn run(&self) -> RunResult<RunSummary> {
        let run_id = Uuid::new_v4();
        let span = info_span!(
            "migration",
            run_id = %run_id,
            source = self.context.source.kind(),
            destination = self.context.destination.kind(),
        );
        self.drive(run_id).instrument(span).await
    }

    async fn drive(&self, run_id: Uuid) -> RunResult<RunSummary> {
        let started = Instant::now();
        let items = match self.items.list_items().await {
            Ok(items) => items,
            Err(source) => {
                warn!(error = %error_chain(&*source), "item enumeration failed");
                self.record_run(RunOutcome::EnumerationFailed, started.elapsed());
                return Err(RunError::Enumeration { source });
            }
        };

        let total = items.len();
        info!(
            items = total,
            max_concurrency = self.max_concurrency.map(NonZeroUsize::get),
            "migration started"
        );

        let limiter = self
            .max_concurrency
            .map(|limit| Arc::new(Semaphore::new(limit.get().min(Semaphore::MAX_PERMITS))));
        let mut units = JoinSet::new();
        for item in items {
            let ctx = self.context.clone();
            let limiter = limiter.clone();
            let metrics = self.metrics.clone();
            units.spawn(
                async move {
                    let _permit = match limiter {
                        Some(limiter) => limiter.acquire_owned().await.ok(),
                        None => None,
                    };
                    if let Some(metrics) = &metrics {
                        metrics.transfer_started();
                    }
                    let finished = transfer(item, ctx).await;
                    if let Some(metrics) = &metrics {
                        metrics.transfer_finished();
                    }
                    finished
                }
                .in_current_span(),
            );
        }

        let mut tally = BatchTally::new(total);
        while let Some(joined) = units.join_next().await {
            match joined {
                Ok(finished) => {
                    self.observe(&finished);
                    self.notifier.notify(&finished.report);
                    tally.record(&finished);
                }
                Err(err) if err.is_panic() => panic::resume_unwind(err.into_panic()),
                // Not recorded; `finish` turns the gap into `RunError::Cancelled`.
                Err(err) => warn!(error = %err, "transfer unit cancelled"),
            }
        }

        let elapsed = started.elapsed();
        let (succeeded, failed) = (tally.succeeded(), tally.failed());
        let result = tally.finish(run_id, elapsed);
        match &result {
            Ok(summary) => {
                info!(
                    items = summary.items,
                    bytes = summary.bytes_transferred,
                    elapsed_ms = duration_ms(elapsed),
                    "migration completed"
                );
                self.record_run(RunOutcome::Succeeded, elapsed);
            }
            Err(_) => {
                warn!(
                    succeeded,
                    failed,
                    elapsed_ms = duration_ms(elapsed),
                    "migration completed with failures"
                );
                self.record_run(RunOutcome::ItemsFailed, elapsed);
            }
        }
        result
    }

    fn observe(&self, finished: &ItemFinished<I>) {
        let report = &finished.report;
        match &report.error {
            None => {
                debug!(
                    source_path = report.source_path.as_deref(),
                    destination_path = report.destination_path.as_deref(),
                    "item migrated"
                );
                if let Some(metrics) = &self.metrics {
                    metrics.record_item(ItemOutcome::Succeeded);
                    metrics.add_bytes_transferred(finished.bytes);
                }
            }
            Some(error) => {
                warn!(
                    stage = error.stage().as_str(),
                    source_path = report.source_path.as_deref(),
                    destination_path = report.destination_path.as_deref(),
                    error = %error_chain(&**error),
                    "item failed"
                );
                if let Some(metrics) = &self.metrics {
                    let outcome = if error.is_fetch_side() {
                        ItemOutcome::FetchFailed
                    } else {
                        ItemOutcome::StoreFailed
                    };
                    metrics.record_item(outcome);
                }
            }
        }
    }

    fn record_run(&self, outcome: RunOutcome, elapsed: Duration) {
        if let Some(metrics) = &self.metrics {
            metrics.record_run(outcome, elapsed);
        }
    }
}

fn duration_ms(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}
