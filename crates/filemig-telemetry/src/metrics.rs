//! Prometheus-backed metrics registry and snapshot helpers.
//!
//! # Design
//! - Encapsulates collector registration to keep the public API small.
//! - Exposes only the counters a migration run produces.

use std::convert::TryFrom;
use std::sync::Arc;
use std::time::Duration;

use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use serde::Serialize;

use crate::error::{Result, TelemetryError};

/// Terminal state of a single item transfer, used as a metric label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOutcome {
    /// Fetch and store both completed.
    Succeeded,
    /// The item failed before a payload was read (path resolution or fetch).
    FetchFailed,
    /// The payload was read but could not be written or verified.
    StoreFailed,
}

impl ItemOutcome {
    /// Label value recorded for this outcome.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::FetchFailed => "fetch_failed",
            Self::StoreFailed => "store_failed",
        }
    }
}

/// Terminal state of a whole run, used as a metric label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every item transferred.
    Succeeded,
    /// At least one item failed.
    ItemsFailed,
    /// Item enumeration failed before any transfer started.
    EnumerationFailed,
}

impl RunOutcome {
    /// Label value recorded for this outcome.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::ItemsFailed => "items_failed",
            Self::EnumerationFailed => "enumeration_failed",
        }
    }
}

/// Prometheus-backed metrics registry shared by migration runs.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    items_total: IntCounterVec,
    runs_total: IntCounterVec,
    bytes_transferred_total: IntCounter,
    transfers_in_flight: IntGauge,
    last_run_duration_ms: IntGauge,
}

/// Snapshot of the migration counters for reporting.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Items transferred successfully.
    pub items_succeeded: u64,
    /// Items that failed while resolving the source path or fetching.
    pub items_fetch_failed: u64,
    /// Items that failed while resolving the destination path or storing.
    pub items_store_failed: u64,
    /// Payload bytes written to destination backends.
    pub bytes_transferred: u64,
    /// Transfer units currently running.
    pub transfers_in_flight: i64,
    /// Wall-clock duration of the most recent run (ms).
    pub last_run_duration_ms: i64,
}

impl Metrics {
    /// Construct a new metrics registry with the migration collectors registered.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the Prometheus collectors cannot be
    /// built or registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let items_total = IntCounterVec::new(
            Opts::new("filemig_items_total", "Item transfers completed by outcome"),
            &["outcome"],
        )
        .map_err(collector_error("filemig_items_total"))?;
        let runs_total = IntCounterVec::new(
            Opts::new("filemig_runs_total", "Migration runs completed by outcome"),
            &["outcome"],
        )
        .map_err(collector_error("filemig_runs_total"))?;
        let bytes_transferred_total = IntCounter::with_opts(Opts::new(
            "filemig_bytes_transferred_total",
            "Payload bytes written to destination backends",
        ))
        .map_err(collector_error("filemig_bytes_transferred_total"))?;
        let transfers_in_flight = IntGauge::with_opts(Opts::new(
            "filemig_transfers_in_flight",
            "Transfer units currently running",
        ))
        .map_err(collector_error("filemig_transfers_in_flight"))?;
        let last_run_duration_ms = IntGauge::with_opts(Opts::new(
            "filemig_last_run_duration_ms",
            "Wall-clock duration of the most recent run (ms)",
        ))
        .map_err(collector_error("filemig_last_run_duration_ms"))?;

        register(&registry, "filemig_items_total", items_total.clone())?;
        register(&registry, "filemig_runs_total", runs_total.clone())?;
        register(
            &registry,
            "filemig_bytes_transferred_total",
            bytes_transferred_total.clone(),
        )?;
        register(
            &registry,
            "filemig_transfers_in_flight",
            transfers_in_flight.clone(),
        )?;
        register(
            &registry,
            "filemig_last_run_duration_ms",
            last_run_duration_ms.clone(),
        )?;

        Ok(Self {
            inner: Arc::new(MetricsInner {
                registry,
                items_total,
                runs_total,
                bytes_transferred_total,
                transfers_in_flight,
                last_run_duration_ms,
            }),
        })
    }

    /// Record the outcome of one item transfer.
    pub fn record_item(&self, outcome: ItemOutcome) {
        self.inner
            .items_total
            .with_label_values(&[outcome.as_str()])
            .inc();
    }

    /// Add written payload bytes to the transfer counter.
    pub fn add_bytes_transferred(&self, bytes: u64) {
        self.inner.bytes_transferred_total.inc_by(bytes);
    }

    /// Mark a transfer unit as started.
    pub fn transfer_started(&self) {
        self.inner.transfers_in_flight.inc();
    }

    /// Mark a transfer unit as finished.
    pub fn transfer_finished(&self) {
        self.inner.transfers_in_flight.dec();
    }

    /// Record the outcome and duration of a run.
    pub fn record_run(&self, outcome: RunOutcome, elapsed: Duration) {
        self.inner
            .runs_total
            .with_label_values(&[outcome.as_str()])
            .inc();
        self.inner
            .last_run_duration_ms
            .set(Self::duration_to_ms(elapsed));
    }

    /// Render the metrics registry using the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if the metrics cannot be encoded or if the encoded
    /// buffer is not valid UTF-8.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|source| TelemetryError::MetricsEncode { source })?;
        String::from_utf8(buffer).map_err(|source| TelemetryError::MetricsUtf8 { source })
    }

    /// Take a point-in-time snapshot of the migration counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        let item = |outcome: ItemOutcome| {
            self.inner
                .items_total
                .with_label_values(&[outcome.as_str()])
                .get()
        };
        MetricsSnapshot {
            items_succeeded: item(ItemOutcome::Succeeded),
            items_fetch_failed: item(ItemOutcome::FetchFailed),
            items_store_failed: item(ItemOutcome::StoreFailed),
            bytes_transferred: self.inner.bytes_transferred_total.get(),
            transfers_in_flight: self.inner.transfers_in_flight.get(),
            last_run_duration_ms: self.inner.last_run_duration_ms.get(),
        }
    }

    /// Convert a duration to milliseconds saturating at `i64::MAX`.
    pub(crate) fn duration_to_ms(duration: Duration) -> i64 {
        i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
    }
}

fn collector_error(name: &'static str) -> impl FnOnce(prometheus::Error) -> TelemetryError {
    move |source| TelemetryError::MetricsCollector { name, source }
}

fn register<C>(registry: &Registry, name: &'static str, collector: C) -> Result<()>
where
    C: prometheus::core::Collector + 'static,
{
    registry
        .register(Box::new(collector))
        .map_err(|source| TelemetryError::MetricsRegister { name, source })
}
