//! Command-line entry point for running and checking migrations.

use std::path::{Path, PathBuf};

use anyhow::anyhow;
use clap::{Args, Parser, Subcommand, ValueEnum};
use filemig_config::{LoggingSettings, MigrationConfig, load_config};
use filemig_telemetry::{LogFormat, LoggingConfig, init_logging};

use crate::commands::{handle_run, handle_validate};
use crate::error::{CliError, CliResult, classify_config_error};

/// Parses CLI arguments, executes the requested command and reports errors
/// on stderr. Returns the process exit code.
pub async fn run() -> i32 {
    let cli = Cli::parse();
    match dispatch(cli).await {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("error: {}", err.display_message());
            err.exit_code()
        }
    }
}

async fn dispatch(cli: Cli) -> CliResult<()> {
    match cli.command {
        Command::Run(args) => {
            let config = read_config(&args.config)?;
            install_logging(&config.logging)?;
            handle_run(&config, &args, cli.output).await.map(|_| ())
        }
        Command::Validate(args) => handle_validate(&args, cli.output),
    }
}

pub(crate) fn read_config(path: &Path) -> CliResult<MigrationConfig> {
    load_config(path).map_err(classify_config_error)
}

fn install_logging(settings: &LoggingSettings) -> CliResult<()> {
    let config = LoggingConfig {
        level: &settings.level,
        format: LogFormat::from_setting(settings.format.as_deref()),
    };
    init_logging(&config)
        .map_err(|err| CliError::failure(anyhow!("failed to initialise logging: {err}")))
}

#[derive(Parser)]
#[command(
    name = "filemig",
    about = "Copy items between storage backends",
    version
)]
struct Cli {
    #[arg(
        long = "output",
        alias = "format",
        global = true,
        value_enum,
        default_value_t = OutputFormat::Table,
        help = "Select output format for per-item lines and summaries"
    )]
    output: OutputFormat,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Migrate every item listed in a manifest.
    Run(RunArgs),
    /// Load a configuration file and print it with secrets redacted.
    Validate(ValidateArgs),
}

#[derive(Args, Debug, Clone)]
pub(crate) struct RunArgs {
    #[arg(long, env = "FILEMIG_CONFIG", help = "Migration configuration (.yaml, .yml or .json)")]
    pub(crate) config: PathBuf,
    #[arg(long, help = "Item manifest, one item per line")]
    pub(crate) manifest: PathBuf,
    #[arg(
        long,
        help = "Override max_concurrency from the configuration (0 for unbounded)"
    )]
    pub(crate) max_concurrency: Option<usize>,
    #[arg(
        long,
        help = "Write run metrics in Prometheus text format to this file"
    )]
    pub(crate) metrics_file: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub(crate) struct ValidateArgs {
    #[arg(long, env = "FILEMIG_CONFIG", help = "Migration configuration (.yaml, .yml or .json)")]
    pub(crate) config: PathBuf,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    #[default]
    Table,
    Json,
}
