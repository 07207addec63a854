//! CLI entry point for the Rio bus feed proxy.
//!
//! Runs the HTTP server by default, or processes a single feed snapshot from a
//! file or URL.

use anyhow::Result;
use clap::{Parser, Subcommand};
use rio_bus_proxy::{
    config::{
        DEFAULT_MAX_CONCURRENT_FETCHES, DEFAULT_TIMEOUT_SECS, DEFAULT_UPSTREAM_URL, ServerConfig,
    },
    envelope::EnvelopeUnwrapper,
    limit::Limit,
    output::{print_stats, write_records, write_records_to_file},
    pipeline::{load_source, process_payload},
    server,
};
use std::ffi::OsStr;
use std::path::Path;
use std::time::Duration;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "rio_bus_proxy")]
#[command(about = "Cleans up the Rio bus GPS feed and serves it as JSON", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve processed bus positions over HTTP (port from $PORT)
    Serve {
        /// Upstream feed URL
        #[arg(long, default_value = DEFAULT_UPSTREAM_URL)]
        upstream_url: String,

        /// Upstream request timeout in seconds
        #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
        timeout_secs: u64,

        /// Maximum number of concurrent upstream fetches
        #[arg(short, long, default_value_t = DEFAULT_MAX_CONCURRENT_FETCHES)]
        concurrency: usize,
    },
    /// Process one feed snapshot from a file or URL and print the records
    Process {
        /// Path to file or URL to fetch
        #[arg(value_name = "FILE_OR_URL", default_value = DEFAULT_UPSTREAM_URL)]
        source: String,

        /// Keep only the first N records
        #[arg(short, long)]
        limit: Option<String>,

        /// Write the JSON array here instead of stdout
        #[arg(short, long)]
        output: Option<String>,

        /// Upstream request timeout in seconds
        #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
        timeout_secs: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    let _file_guard = init_tracing()?;

    let cli = Cli::parse();

    match cli.command {
        None => server::run(&ServerConfig::from_env()?).await?,
        Some(Commands::Serve {
            upstream_url,
            timeout_secs,
            concurrency,
        }) => {
            let config = ServerConfig {
                upstream_url,
                timeout: Duration::from_secs(timeout_secs),
                max_concurrent_fetches: concurrency,
                ..ServerConfig::from_env()?
            };
            server::run(&config).await?;
        }
        Some(Commands::Process {
            source,
            limit,
            output,
            timeout_secs,
        }) => {
            let payload = load_source(&source, Duration::from_secs(timeout_secs)).await?;
            let (records, stats) = process_payload(&EnvelopeUnwrapper::default(), payload)?;
            print_stats(&stats)?;

            let records = Limit::parse(limit.as_deref()).apply(records);
            match output {
                Some(path) => {
                    write_records_to_file(&path, &records)?;
                    info!(path = %path, count = records.len(), "Records written");
                }
                None => write_records(std::io::stdout().lock(), &records)?,
            }
        }
    }

    Ok(())
}

/// Logging setup: colored stderr + JSON rolling log file.
fn init_tracing() -> Result<WorkerGuard> {
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/rio_bus_proxy.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("rio_bus_proxy.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    Ok(file_guard)
}
