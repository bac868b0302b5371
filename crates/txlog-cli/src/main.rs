//! txlog: transaction-scoped structured logging from the command line.
//!
//! Replays JSONL log records into per-transaction logs and exports them
//! through one of the built-in exporters.

mod replay;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use txlog::{ConsoleExporter, Exporter, JsonFileExporter, Level, Logger, TextFileExporter};

/// Default configuration file name written by `txlog init`.
const DEFAULT_CONFIG_FILE: &str = "txlog.json";

/// Transaction-scoped structured logging
#[derive(Parser)]
#[command(name = "txlog")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to a JSON configuration file
    #[arg(long, global = true, env = "TXLOG_CONFIG")]
    config: Option<PathBuf>,

    /// Write diagnostics to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a JSONL file of log records and flush every transaction
    Replay {
        /// Input file, one JSON record per line
        input: PathBuf,

        /// Where to export transactions
        #[arg(long, value_enum, default_value_t = ExporterKind::Console)]
        exporter: ExporterKind,

        /// Minimum level to record (overrides the config file)
        #[arg(long, value_parser = parse_level)]
        level: Option<Level>,
    },

    /// Write a starter configuration file
    Init {
        /// Destination path
        #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ExporterKind {
    Console,
    Json,
    Text,
}

impl ExporterKind {
    fn build(self) -> Arc<dyn Exporter> {
        match self {
            ExporterKind::Console => Arc::new(ConsoleExporter::new()),
            ExporterKind::Json => Arc::new(JsonFileExporter::new()),
            ExporterKind::Text => Arc::new(TextFileExporter::new()),
        }
    }
}

fn parse_level(s: &str) -> std::result::Result<Level, String> {
    s.parse::<Level>().map_err(|e| e.to_string())
}

/// Initialize logging to stderr; stdout is reserved for console exports.
fn init_logging(verbose: bool) {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(env_filter(verbose))
        .init();
}

/// Initialize logging to a single file.
fn init_file_logging(log_path: &Path, verbose: bool) {
    use std::fs::OpenOptions;

    let file = match OpenOptions::new().create(true).append(true).open(log_path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Warning: Failed to open log file: {}", e);
            init_logging(verbose);
            return;
        }
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    // Dropping the guard would stop the background writer.
    static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
        std::sync::OnceLock::new();
    let _ = GUARD.set(guard);

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .with(env_filter(verbose))
        .init();
}

fn env_filter(verbose: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

/// Build a logger from CLI options and the optional config file.
fn build_logger(
    config: Option<&Path>,
    exporter: ExporterKind,
    level: Option<Level>,
) -> Result<Logger> {
    let mut logger = Logger::new(Level::Info);
    if let Some(path) = config {
        logger = logger
            .with_config_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?;
    }

    logger.set_exporter(exporter.build());
    if let Some(level) = level {
        logger.set_level(level);
    }
    Ok(logger)
}

fn write_starter_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }

    let starter: BTreeMap<String, String> = txlog::config::starter().into_iter().collect();
    let mut body = serde_json::to_string_pretty(&starter)?;
    body.push('\n');
    std::fs::write(path, body).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match &cli.log_file {
        Some(path) => init_file_logging(path, cli.verbose),
        None => init_logging(cli.verbose),
    }

    match cli.command {
        Commands::Replay {
            input,
            exporter,
            level,
        } => {
            let logger = build_logger(cli.config.as_deref(), exporter, level)?;
            let content = tokio::fs::read_to_string(&input)
                .await
                .with_context(|| format!("failed to read {}", input.display()))?;
            let records = replay::parse(&content)?;

            let summary = replay::replay(&logger, records).await?;
            info!(
                transactions = summary.transactions,
                records = summary.records,
                exporter = ?exporter,
                "Replay complete"
            );
        }
        Commands::Init { path, force } => {
            write_starter_config(&path, force)?;
            println!("Wrote {}", path.display());
        }
    }

    Ok(())
}
