use std::fs;
use std::path::Path;
use std::time::Instant;

use anyhow::anyhow;
use filemig_config::MigrationConfig;
use filemig_core::{ItemReport, Migration, RunError, StaticItems, error_chain};
use filemig_storage::build_backend;
use filemig_telemetry::Metrics;
use tracing::{info, warn};

use crate::cli::{OutputFormat, RunArgs};
use crate::error::{CliError, CliResult};
use crate::manifest::{ManifestError, ManifestItem, load_manifest};
use crate::output::{RunReport, format_item_line, render_run_report};
use crate::template::TemplatePolicy;

pub(crate) async fn handle_run(
    config: &MigrationConfig,
    args: &RunArgs,
    format: OutputFormat,
) -> CliResult<RunReport> {
    let policy = TemplatePolicy::from_config(&config.paths)
        .map_err(|err| CliError::validation(format!("invalid path template: {err}")))?;
    let items = load_manifest(&args.manifest).map_err(classify_manifest_error)?;
    let total = items.len();

    let source = build_backend(&config.source).map_err(|err| {
        CliError::failure(anyhow::Error::new(err).context("failed to build source backend"))
    })?;
    let destination = build_backend(&config.destination).map_err(|err| {
        CliError::failure(anyhow::Error::new(err).context("failed to build destination backend"))
    })?;
    let metrics = Metrics::new()
        .map_err(|err| CliError::failure(anyhow!("failed to initialise metrics: {err}")))?;

    let notifier = move |report: &ItemReport<ManifestItem>| {
        match format_item_line(report, format) {
            Ok(line) => println!("{line}"),
            Err(err) => warn!(
                item = %report.item,
                error = %err.display_message(),
                "failed to print item line"
            ),
        }
    };

    let migration = Migration::new(
        items.into_iter().collect::<StaticItems<_>>(),
        policy,
        source,
        destination,
        notifier,
    )
    .with_metrics(metrics.clone())
    .with_max_concurrency(args.max_concurrency.or(config.max_concurrency).unwrap_or(0));

    let started = Instant::now();
    let outcome = migration.run().await;
    let report = RunReport::from_snapshot(total, &metrics.snapshot(), started.elapsed());
    render_run_report(&report, format)?;
    if let Some(path) = &args.metrics_file {
        write_metrics(&metrics, path)?;
    }

    match outcome {
        Ok(summary) => {
            info!(run_id = %summary.run_id, items = summary.items, "migration finished");
            Ok(report)
        }
        Err(RunError::ItemsFailed { failed, total, .. }) => {
            Err(CliError::ItemsFailed { failed, total })
        }
        Err(err @ (RunError::Enumeration { .. } | RunError::Cancelled { .. })) => {
            Err(CliError::failure(anyhow::Error::new(err)))
        }
    }
}

/// Unreadable manifests are operational failures; malformed lines are
/// validation errors naming the line.
fn classify_manifest_error(error: ManifestError) -> CliError {
    match &error {
        ManifestError::Io { path, .. } => {
            let context = path.display().to_string();
            CliError::failure(anyhow::Error::new(error).context(context))
        }
        ManifestError::InvalidJson { line, source } => {
            CliError::validation(format!("manifest line {line}: {}", error_chain(source)))
        }
    }
}

fn write_metrics(metrics: &Metrics, path: &Path) -> CliResult<()> {
    let exposition = metrics.render().map_err(|err| {
        CliError::failure(anyhow::Error::new(err).context("failed to render metrics"))
    })?;
    fs::write(path, exposition).map_err(|err| {
        CliError::failure(
            anyhow::Error::new(err)
                .context(format!("failed to write metrics to {}", path.display())),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::{Path, PathBuf};

    use filemig_config::{
        BackendConfig, FilesystemConfig, LoggingSettings, ObjectStorageConfig, PathTemplates,
    };
    use filemig_storage::ObjectStorageBackend;
    use httpmock::Method::PUT;
    use httpmock::MockServer;

    fn filesystem(root: &Path) -> BackendConfig {
        BackendConfig::Filesystem(FilesystemConfig {
            absolute_path: root.to_path_buf(),
        })
    }

    fn config(source: BackendConfig, destination: BackendConfig, paths: (&str, &str)) -> MigrationConfig {
        MigrationConfig {
            source,
            destination,
            paths: PathTemplates {
                source: paths.0.to_string(),
                destination: paths.1.to_string(),
            },
            max_concurrency: None,
            logging: LoggingSettings::default(),
        }
    }

    fn args(manifest: PathBuf, max_concurrency: Option<usize>) -> RunArgs {
        RunArgs {
            config: PathBuf::from("unused.yaml"),
            manifest,
            max_concurrency,
            metrics_file: None,
        }
    }

    #[tokio::test]
    async fn copies_manifest_items_between_directories() -> anyhow::Result<()> {
        let source = tempfile::tempdir()?;
        let destination = tempfile::tempdir()?;
        fs::create_dir_all(source.path().join("2024"))?;
        fs::write(source.path().join("2024/a.jpg"), b"jpeg")?;
        fs::write(source.path().join("b.txt"), b"text!")?;
        let manifest = source.path().join("manifest.txt");
        fs::write(&manifest, "# exported\n2024/a.jpg\n\nb.txt\n")?;

        let config = config(
            filesystem(source.path()),
            filesystem(destination.path()),
            ("{item}", "copied/{item}"),
        );
        let report = handle_run(&config, &args(manifest, Some(1)), OutputFormat::Table)
            .await
            .map_err(|err| anyhow!(err.display_message()))?;

        assert_eq!(report.total, 2);
        assert_eq!(report.succeeded, 2);
        assert_eq!(report.failed, 0);
        assert_eq!(report.bytes_transferred, 9);
        assert_eq!(fs::read(destination.path().join("copied/2024/a.jpg"))?, b"jpeg");
        assert_eq!(fs::read(destination.path().join("copied/b.txt"))?, b"text!");
        Ok(())
    }

    #[tokio::test]
    async fn failed_items_exit_with_partial_failure_code() -> anyhow::Result<()> {
        let source = tempfile::tempdir()?;
        let destination = tempfile::tempdir()?;
        fs::write(source.path().join("present.txt"), b"here")?;
        let manifest = source.path().join("manifest.txt");
        fs::write(&manifest, "present.txt\nabsent.txt\n")?;

        let config = config(
            filesystem(source.path()),
            filesystem(destination.path()),
            ("{item}", "{item}"),
        );
        let err = handle_run(&config, &args(manifest, None), OutputFormat::Json)
            .await
            .expect_err("one item is missing");

        assert_eq!(err.exit_code(), 4);
        assert_eq!(err.display_message(), "1 of 2 items failed to migrate");
        assert_eq!(fs::read(destination.path().join("present.txt"))?, b"here");
        assert!(!destination.path().join("absent.txt").exists());
        Ok(())
    }

    #[tokio::test]
    async fn metrics_file_receives_prometheus_exposition() -> anyhow::Result<()> {
        let source = tempfile::tempdir()?;
        let destination = tempfile::tempdir()?;
        fs::write(source.path().join("present.txt"), b"here")?;
        let manifest = source.path().join("manifest.txt");
        fs::write(&manifest, "present.txt
absent.txt
")?;
        let metrics_file = destination.path().join("run.prom");

        let config = config(
            filesystem(source.path()),
            filesystem(destination.path()),
            ("{item}", "{item}"),
        );
        let run_args = RunArgs {
            metrics_file: Some(metrics_file.clone()),
            ..args(manifest, None)
        };
        let err = handle_run(&config, &run_args, OutputFormat::Table)
            .await
            .expect_err("one item is missing");
        assert_eq!(err.exit_code(), 4);

        let exposition = fs::read_to_string(&metrics_file)?;
        assert!(exposition.contains("filemig_items_total{outcome=\"succeeded\"} 1"));
        assert!(exposition.contains("filemig_items_total{outcome=\"fetch_failed\"} 1"));
        assert!(exposition.contains("filemig_bytes_transferred_total 4"));
        assert!(exposition.contains("filemig_runs_total{outcome=\"items_failed\"} 1"));
        Ok(())
    }

    #[tokio::test]
    async fn malformed_manifest_is_a_validation_error() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let manifest = dir.path().join("manifest.txt");
        fs::write(&manifest, "{\"id\": 1\n")?;

        let config = config(BackendConfig::Memory, BackendConfig::Memory, ("{id}", "{id}"));
        let err = handle_run(&config, &args(manifest, None), OutputFormat::Table)
            .await
            .expect_err("manifest is not JSON");
        assert_eq!(err.exit_code(), 2);
        assert!(err.display_message().starts_with("manifest line 1"));
        Ok(())
    }

    #[tokio::test]
    async fn missing_manifest_is_an_operational_failure_naming_the_path() {
        let config = config(BackendConfig::Memory, BackendConfig::Memory, ("{id}", "{id}"));
        let err = handle_run(
            &config,
            &args(PathBuf::from("/definitely/missing/manifest.txt"), None),
            OutputFormat::Table,
        )
        .await
        .expect_err("manifest is missing");
        assert_eq!(err.exit_code(), 3);
        assert!(
            err.display_message()
                .starts_with("/definitely/missing/manifest.txt: failed to read manifest: ")
        );
    }

    #[tokio::test]
    async fn invalid_template_is_rejected_before_touching_backends() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let config = config(BackendConfig::Memory, BackendConfig::Memory, ("{id", "{id}"));
        let err = handle_run(
            &config,
            &args(dir.path().join("never-read.txt"), None),
            OutputFormat::Table,
        )
        .await
        .expect_err("template is unterminated");
        assert_eq!(err.exit_code(), 2);
        assert_eq!(
            err.display_message(),
            "invalid path template: unterminated placeholder starting at offset 0"
        );
        Ok(())
    }

    #[tokio::test]
    async fn uploads_json_manifest_items_to_object_storage() -> anyhow::Result<()> {
        let source = tempfile::tempdir()?;
        fs::write(source.path().join("report.pdf"), b"somefiledata")?;
        let manifest = source.path().join("manifest.jsonl");
        fs::write(&manifest, "{\"id\": 42, \"file_name\": \"report.pdf\"}\n")?;

        let server = MockServer::start_async().await;
        let etag = ObjectStorageBackend::expected_etag(b"somefiledata");
        let upload = server.mock(move |when, then| {
            when.method(PUT)
                .path("/bucket/attachments/42/report.pdf")
                .header("content-md5", "/1kyCG0MRhLwybmPSrb01Q==")
                .body("somefiledata");
            then.status(200).header("etag", etag.as_str());
        });

        let config = config(
            filesystem(source.path()),
            BackendConfig::ObjectStorage(ObjectStorageConfig {
                access_key_id: "AKIDEXAMPLE".to_string(),
                secret_access_key: "secret".to_string(),
                region: Some("us-west-2".to_string()),
                bucket: "bucket".to_string(),
                endpoint: Some(server.base_url()),
            }),
            ("{file_name}", "attachments/{id}/{file_name}"),
        );
        let report = handle_run(&config, &args(manifest, None), OutputFormat::Json)
            .await
            .map_err(|err| anyhow!(err.display_message()))?;

        upload.assert();
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.bytes_transferred, 12);
        Ok(())
    }
}
