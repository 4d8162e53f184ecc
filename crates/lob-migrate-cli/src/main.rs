//! lob-migrate CLI - convert LONGTEXT/CLOB columns to VARCHAR(4000).

use clap::{Parser, Subcommand};
use lob_migrate::drivers::{self, DatabaseHandle};
use lob_migrate::error::EXIT_CANCELLED;
use lob_migrate::{Config, MigrateError, MigrationDriver, RunMode, RunReport};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

#[derive(Parser)]
#[command(name = "lob-migrate")]
#[command(about = "Convert LONGTEXT/CLOB columns to VARCHAR(4000) where the data fits")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Output JSON result to stdout instead of report lines
    #[arg(long)]
    output_json: bool,

    /// Also write the JSON run report to this file
    #[arg(long)]
    report_file: Option<PathBuf>,

    /// Log format: text or json
    #[arg(long, default_value = "text", value_parser = ["text", "json"])]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info", value_parser = ["debug", "info", "warn", "error"])]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every long-text column with its data length and whether it fits
    List,

    /// Print the data length of long-text columns
    CheckSize {
        /// Include columns holding no data
        #[arg(long)]
        all: bool,
    },

    /// Convert long-text columns whose data fits into VARCHAR(4000)
    Migrate {
        /// Convert even when data is longer than 4000 (truncates it)
        #[arg(long)]
        force: bool,

        /// Only tables matching this glob (repeatable)
        #[arg(long = "include", value_name = "GLOB")]
        include: Vec<String>,

        /// Skip tables matching this glob (repeatable)
        #[arg(long = "exclude", value_name = "GLOB")]
        exclude: Vec<String>,
    },

    /// Test the database connection
    HealthCheck,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<u8, MigrateError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format);

    let mut config = Config::load(&cli.config)?;
    info!("Loaded configuration from {:?}", cli.config);

    let mode = match &cli.command {
        Commands::List => RunMode::List,
        Commands::CheckSize { all } => RunMode::CheckSize { all: *all },
        Commands::Migrate {
            force,
            include,
            exclude,
        } => {
            config.migration.include_tables.extend(include.iter().cloned());
            config.migration.exclude_tables.extend(exclude.iter().cloned());
            RunMode::Migrate {
                force: *force || config.migration.force,
            }
        }
        Commands::HealthCheck => {
            health_check(&config, cli.output_json).await?;
            return Ok(0);
        }
    };

    // Re-check filters after command-line patterns were merged in.
    let filter = config.table_filter()?;

    // Setup signal handling for graceful shutdown (SIGINT and SIGTERM)
    let cancel_token = setup_signal_handler()?;

    let db = drivers::connect(&config).await?;
    let driver = MigrationDriver::new(db.catalog.clone(), db.backend.clone())
        .with_filter(filter)
        .with_cancellation(cancel_token);

    let output_json = cli.output_json;
    if !output_json {
        println!("{}", mode.heading(db.kind()));
    }
    let result = driver
        .run(mode, |report| {
            if !output_json {
                println!("{}", report);
            }
            if report.outcome().is_some_and(|o| o.is_inconsistent()) {
                eprintln!(
                    "WARNING: {}.{} was left in an inconsistent state and needs manual repair",
                    report.table, report.column
                );
            }
        })
        .await;
    db.close().await;
    let report = result?;

    if let Some(path) = &cli.report_file {
        write_report(path, &report)?;
    }

    if output_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    let code = report.exit_code();
    if code == EXIT_CANCELLED {
        eprintln!(
            "Run cancelled after {} of {} columns",
            report.columns.len(),
            report.summary.columns_total
        );
        return Err(MigrateError::Cancelled);
    }

    Ok(code)
}

fn write_report(path: &Path, report: &RunReport) -> Result<(), MigrateError> {
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json)?;
    info!("Wrote run report to {:?}", path);
    Ok(())
}

async fn health_check(config: &Config, output_json: bool) -> Result<(), MigrateError> {
    let start = Instant::now();
    let db: DatabaseHandle = drivers::connect(config).await?;
    let pinged = db.session.ping().await;
    let latency_ms = start.elapsed().as_millis() as u64;
    let backend = db.session.db_type().to_string();
    db.close().await;

    if output_json {
        let result = serde_json::json!({
            "backend": backend,
            "connected": pinged.is_ok(),
            "latency_ms": latency_ms,
            "error": pinged.as_ref().err().map(|e| e.to_string()),
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("Health Check Results:");
        println!(
            "  Database ({}): {} ({}ms)",
            backend,
            if pinged.is_ok() { "OK" } else { "FAILED" },
            latency_ms
        );
        if let Err(ref err) = pinged {
            println!("    Error: {}", err);
        }
    }

    pinged
}

fn setup_logging(verbosity: &str, format: &str) {
    // RUST_LOG wins over --verbosity when set.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(verbosity));

    // Logs go to stderr; stdout carries the report.
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

/// Setup signal handlers for graceful shutdown.
///
/// The column being converted always finishes; no further column is
/// started once a signal arrives.
#[cfg(unix)]
fn setup_signal_handler() -> Result<CancellationToken, MigrateError> {
    let cancel_token = CancellationToken::new();

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    let token = cancel_token.clone();
    tokio::spawn(async move {
        let name = tokio::select! {
            _ = sigint.recv() => "SIGINT",
            _ = sigterm.recv() => "SIGTERM",
        };
        eprintln!("\nReceived {}. Finishing the current column, then stopping...", name);
        warn!("{} received, cancelling run", name);
        token.cancel();
    });

    Ok(cancel_token)
}

/// Setup signal handler for Windows (only Ctrl-C)
#[cfg(not(unix))]
fn setup_signal_handler() -> Result<CancellationToken, MigrateError> {
    let cancel_token = CancellationToken::new();
    let token = cancel_token.clone();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nReceived Ctrl-C. Finishing the current column, then stopping...");
            token.cancel();
        }
    });

    Ok(cancel_token)
}
