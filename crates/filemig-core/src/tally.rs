//! Batch-level aggregation of item outcomes.

use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::error::{RunError, RunResult, TransferError};
use crate::transfer::ItemFinished;

/// Summary of a run in which every item was migrated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Identifier attached to every log event of the run.
    pub run_id: Uuid,
    /// Number of items enumerated and migrated.
    pub items: usize,
    /// Sum of payload sizes written to the destination.
    pub bytes_transferred: u64,
    /// Wall time from enumeration to the last finished unit.
    pub elapsed: Duration,
}

/// Counts outcomes as units finish and keeps the first failure seen.
///
/// A tally that recorded fewer outcomes than items never finishes as a
/// summary or as a plain item failure.
#[derive(Debug)]
pub(crate) struct BatchTally {
    total: usize,
    succeeded: usize,
    failed: usize,
    bytes: u64,
    first_error: Option<Arc<TransferError>>,
}

impl BatchTally {
    pub(crate) const fn new(total: usize) -> Self {
        Self {
            total,
            succeeded: 0,
            failed: 0,
            bytes: 0,
            first_error: None,
        }
    }

    pub(crate) fn record<I>(&mut self, finished: &ItemFinished<I>) {
        match &finished.report.error {
            None => {
                self.succeeded += 1;
                self.bytes = self.bytes.saturating_add(finished.bytes);
            }
            Some(error) => {
                self.failed += 1;
                if self.first_error.is_none() {
                    self.first_error = Some(Arc::clone(error));
                }
            }
        }
    }

    pub(crate) const fn failed(&self) -> usize {
        self.failed
    }

    pub(crate) const fn succeeded(&self) -> usize {
        self.succeeded
    }

    pub(crate) fn finish(self, run_id: Uuid, elapsed: Duration) -> RunResult<RunSummary> {
        let recorded = self.succeeded + self.failed;
        if recorded < self.total {
            return Err(RunError::Cancelled {
                unfinished: self.total - recorded,
                total: self.total,
            });
        }
        match self.first_error {
            Some(first) => Err(RunError::ItemsFailed {
                failed: self.failed,
                total: self.total,
                first,
            }),
            None => Ok(RunSummary {
                run_id,
                items: self.total,
                bytes_transferred: self.bytes,
                elapsed,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::ItemReport;
    use crate::transfer::TransferStage;

    fn finished(error: Option<Arc<TransferError>>, bytes: u64) -> ItemFinished<()> {
        ItemFinished {
            report: ItemReport {
                error,
                item: (),
                source_path: None,
                destination_path: None,
            },
            bytes,
        }
    }

    fn resolution_error() -> Arc<TransferError> {
        Arc::new(TransferError::PathResolution {
            stage: TransferStage::ResolveSource,
            source: "missing".into(),
        })
    }

    #[test]
    fn all_successes_produce_summary() {
        let mut tally = BatchTally::new(2);
        tally.record(&finished(None, 3));
        tally.record(&finished(None, 4));
        assert_eq!(tally.succeeded(), 2);

        let id = Uuid::new_v4();
        let summary = tally
            .finish(id, Duration::from_millis(5))
            .expect("no failures recorded");
        assert_eq!(summary.items, 2);
        assert_eq!(summary.bytes_transferred, 7);
        assert_eq!(summary.run_id, id);
    }

    #[test]
    fn first_recorded_failure_wins() {
        let first = resolution_error();
        let second = resolution_error();
        let mut tally = BatchTally::new(3);
        tally.record(&finished(None, 1));
        tally.record(&finished(Some(Arc::clone(&first)), 0));
        tally.record(&finished(Some(Arc::clone(&second)), 0));
        assert_eq!(tally.failed(), 2);

        match tally.finish(Uuid::new_v4(), Duration::ZERO) {
            Err(RunError::ItemsFailed {
                failed,
                total,
                first: reported,
            }) => {
                assert_eq!((failed, total), (2, 3));
                assert!(Arc::ptr_eq(&reported, &first));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn missing_outcomes_are_reported_as_cancelled() {
        let mut tally = BatchTally::new(3);
        tally.record(&finished(None, 1));
        tally.record(&finished(Some(resolution_error()), 0));

        match tally.finish(Uuid::new_v4(), Duration::ZERO) {
            Err(RunError::Cancelled { unfinished, total }) => {
                assert_eq!((unfinished, total), (1, 3));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn empty_batch_succeeds() {
        let summary = BatchTally::new(0)
            .finish(Uuid::new_v4(), Duration::ZERO)
            .expect("empty batch succeeds");
        assert_eq!(summary.items, 0);
    }
}
