//! Error types for logging and metrics setup.
//!
//! Messages are constant; the offending metric or value lives in fields.

use prometheus::Error as PrometheusError;
use thiserror::Error;
use tracing_subscriber::util::TryInitError;

/// Result alias for telemetry operations.
pub type Result<T> = std::result::Result<T, TelemetryError>;

/// Failures while installing logging or maintaining run metrics.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// A global subscriber was already installed, or installation failed.
    #[error("failed to install tracing subscriber")]
    SubscriberInstall {
        /// Error returned by `try_init`.
        source: TryInitError,
    },
    /// `logging.format` named neither `pretty` nor `json`.
    #[error("unknown log format")]
    UnknownLogFormat {
        /// Value found in the configuration.
        value: String,
    },
    /// A counter, gauge or histogram definition was rejected.
    #[error("failed to build metric")]
    MetricsCollector {
        /// Metric name.
        name: &'static str,
        /// Error from the prometheus crate.
        source: PrometheusError,
    },
    /// A metric clashed with one already in the run's registry.
    #[error("failed to register metric")]
    MetricsRegister {
        /// Metric name.
        name: &'static str,
        /// Error from the prometheus crate.
        source: PrometheusError,
    },
    /// The registry could not be written in text exposition format.
    #[error("failed to encode metrics")]
    MetricsEncode {
        /// Error from the prometheus text encoder.
        source: PrometheusError,
    },
    /// The text encoder produced bytes that are not UTF-8.
    #[error("encoded metrics were not utf-8")]
    MetricsUtf8 {
        /// Conversion error.
        source: std::string::FromUtf8Error,
    },
}

impl TelemetryError {
    /// Metric the failure is tied to, if any.
    #[must_use]
    pub const fn metric_name(&self) -> Option<&'static str> {
        match self {
            Self::MetricsCollector { name, .. } | Self::MetricsRegister { name, .. } => Some(*name),
            _ => None,
        }
    }
}
