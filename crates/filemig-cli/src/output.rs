//! Output renderers for CLI commands.

use std::time::Duration;

use anyhow::anyhow;
use filemig_config::MigrationConfig;
use filemig_core::{ItemReport, error_chain};
use filemig_telemetry::MetricsSnapshot;
use serde::Serialize;

use crate::cli::OutputFormat;
use crate::error::{CliError, CliResult};
use crate::manifest::ManifestItem;

const MISSING: &str = "-";

#[derive(Debug, Serialize)]
struct ItemLine<'a> {
    line: usize,
    status: &'static str,
    source_path: Option<&'a str>,
    destination_path: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stage: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Final counters of a run as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct RunReport {
    pub(crate) total: usize,
    pub(crate) succeeded: u64,
    pub(crate) failed: u64,
    pub(crate) bytes_transferred: u64,
    pub(crate) elapsed_ms: u64,
}

impl RunReport {
    pub(crate) fn from_snapshot(total: usize, snapshot: &MetricsSnapshot, elapsed: Duration) -> Self {
        Self {
            total,
            succeeded: snapshot.items_succeeded,
            failed: snapshot.items_fetch_failed + snapshot.items_store_failed,
            bytes_transferred: snapshot.bytes_transferred,
            elapsed_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

pub(crate) fn format_item_line(
    report: &ItemReport<ManifestItem>,
    format: OutputFormat,
) -> CliResult<String> {
    let source = report.source_path.as_deref();
    let destination = report.destination_path.as_deref();
    match format {
        OutputFormat::Json => {
            let line = ItemLine {
                line: report.item.line,
                status: if report.succeeded() { "ok" } else { "failed" },
                source_path: source,
                destination_path: destination,
                stage: report.error.as_ref().map(|error| error.stage().as_str()),
                error: report.error.as_ref().map(|error| error_chain(&**error)),
            };
            serde_json::to_string(&line)
                .map_err(|err| CliError::failure(anyhow!("failed to format JSON: {err}")))
        }
        OutputFormat::Table => Ok(match &report.error {
            None => format!(
                "ok     {} -> {}",
                source.unwrap_or(MISSING),
                destination.unwrap_or(MISSING)
            ),
            Some(error) => format!(
                "FAILED {} ({}) [{}] {}",
                report.item,
                source.unwrap_or(MISSING),
                error.stage(),
                error_chain(&**error)
            ),
        }),
    }
}

pub(crate) fn render_run_report(report: &RunReport, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => {
            let text = serde_json::to_string(report)
                .map_err(|err| CliError::failure(anyhow!("failed to format JSON: {err}")))?;
            println!("{text}");
        }
        OutputFormat::Table => {
            println!(
                "migrated {}/{} items ({}) in {} ms; {} failed",
                report.succeeded,
                report.total,
                format_bytes(report.bytes_transferred),
                report.elapsed_ms,
                report.failed
            );
        }
    }
    Ok(())
}

pub(crate) fn format_config(config: &MigrationConfig, format: OutputFormat) -> CliResult<String> {
    let redacted = config.redacted();
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(&redacted)
            .map_err(|err| CliError::failure(anyhow!("failed to format JSON: {err}"))),
        OutputFormat::Table => serde_yaml::to_string(&redacted)
            .map_err(|err| CliError::failure(anyhow!("failed to format YAML: {err}"))),
    }
}

#[allow(clippy::cast_precision_loss)]
pub(crate) fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}
