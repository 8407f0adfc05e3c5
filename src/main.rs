//! Naver Finance Crawler main entry point
//!
//! This is the command-line interface for the batch crawl engine. One process
//! run is one invocation: resolve the request, crawl the symbol universe, export
//! the CSV and print the status-coded response as JSON.

use anyhow::{Context, Result};
use clap::Parser;
use naver_finance_crawler::browser::ChromiumEngine;
use naver_finance_crawler::config::{
    load_config_with_hash, load_event, resolve_request, ConfigSources, FileConfig,
    InvocationEvent, ENV_CRAWLER_TYPE, ENV_S3_BUCKET,
};
use naver_finance_crawler::report::print_summary;
use naver_finance_crawler::storage::{LocalStore, ObjectStore, S3Settings, S3Store};
use naver_finance_crawler::{Dispatcher, InvocationResponse, SymbolUniverse};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Symbol universe used when neither the CLI nor the config file names one
const DEFAULT_SYMBOLS_PATH: &str = "stocks.json";

/// Naver Finance Crawler: batch crawl of stock indicators
///
/// Drives one headless Chromium session through a list of stock symbols,
/// normalizes the scraped indicators and writes a partitioned CSV to S3 (or a
/// local directory).
#[derive(Parser, Debug)]
#[command(name = "naver-finance-crawler")]
#[command(version)]
#[command(about = "Batch crawler for Naver Finance stock indicators", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Invocation event JSON file, or `-` to read it from stdin
    #[arg(short, long, value_name = "FILE")]
    event: Option<PathBuf>,

    /// Symbol universe JSON file
    #[arg(short, long, value_name = "FILE")]
    symbols: Option<PathBuf>,

    /// Data category (daily, quarter, annual); overrides every other source
    #[arg(long)]
    category: Option<String>,

    /// Destination bucket; overrides every other source
    #[arg(long)]
    bucket: Option<String>,

    /// Write the export below this directory instead of S3
    #[arg(long, value_name = "DIR")]
    local_dir: Option<PathBuf>,

    /// Custom S3-compatible endpoint
    #[arg(long, value_name = "URL")]
    s3_endpoint: Option<String>,

    /// Cancel the run after this many seconds
    #[arg(long, value_name = "SECS")]
    deadline_secs: Option<u64>,

    /// Resolve the request and symbol universe, then exit without crawling
    #[arg(long)]
    dry_run: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet, cli.json_logs);

    let file = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("Failed to load configuration {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            Some(config)
        }
        None => None,
    };

    let event = read_event(cli.event.as_deref())?;
    let mut sources = ConfigSources::from_process_env(event, file.clone());
    if let Some(category) = &cli.category {
        sources.env.insert(ENV_CRAWLER_TYPE.to_string(), category.clone());
    }
    if let Some(bucket) = &cli.bucket {
        sources.env.insert(ENV_S3_BUCKET.to_string(), bucket.clone());
    }

    let symbols_path = cli
        .symbols
        .clone()
        .or_else(|| file.as_ref().and_then(|f| f.crawl.symbols.clone()))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SYMBOLS_PATH));
    let universe = SymbolUniverse::load(&symbols_path)
        .with_context(|| format!("Failed to load symbols from {}", symbols_path.display()))?;
    tracing::info!("Loaded {} symbols from {}", universe.len(), symbols_path.display());

    if cli.dry_run {
        handle_dry_run(&sources, &universe);
        return Ok(ExitCode::SUCCESS);
    }

    let store = build_store(&cli, file.as_ref()).await;
    let dispatcher = Dispatcher::new(Arc::new(ChromiumEngine::new()), store);
    let cancel = install_cancellation(cli.deadline_secs);

    let started = Instant::now();
    let response = handle_crawl(&dispatcher, &sources, &universe, &cancel, cli.quiet, started).await;

    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(if response.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool, json: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("naver_finance_crawler=info,warn"),
            1 => EnvFilter::new("naver_finance_crawler=debug,info"),
            2 => EnvFilter::new("naver_finance_crawler=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_writer(std::io::stderr)
            .init();
    }
}

/// Reads the invocation event; no path means an empty event
fn read_event(path: Option<&Path>) -> Result<InvocationEvent> {
    match path {
        None => Ok(InvocationEvent::default()),
        Some(path) if path.as_os_str() == "-" => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read event from stdin")?;
            Ok(InvocationEvent::from_json(&text)?)
        }
        Some(path) => load_event(path)
            .with_context(|| format!("Failed to load event {}", path.display())),
    }
}

/// Picks the local directory store when one is configured, S3 otherwise
async fn build_store(cli: &Cli, file: Option<&FileConfig>) -> Arc<dyn ObjectStore> {
    let storage = file.map(|f| f.storage.clone()).unwrap_or_default();

    if let Some(dir) = cli.local_dir.clone().or(storage.local_dir) {
        tracing::info!("Writing exports below {}", dir.display());
        return Arc::new(LocalStore::new(dir));
    }

    let settings = S3Settings {
        endpoint: cli.s3_endpoint.clone().or(storage.endpoint),
        region: storage.region,
        path_style: storage.path_style,
    };
    Arc::new(S3Store::new(settings).await)
}

/// Returns a token cancelled on Ctrl-C or when the deadline passes
fn install_cancellation(deadline_secs: Option<u64>) -> CancellationToken {
    let cancel = CancellationToken::new();

    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping after the current wait");
            on_signal.cancel();
        }
    });

    if let Some(secs) = deadline_secs {
        let on_deadline = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(secs)).await;
            tracing::warn!("Deadline of {}s reached, cancelling run", secs);
            on_deadline.cancel();
        });
    }

    cancel
}

/// Handles the --dry-run mode: shows the resolved request and universe
fn handle_dry_run(sources: &ConfigSources, universe: &SymbolUniverse) {
    println!("=== Naver Finance Crawler Dry Run ===\n");

    match resolve_request(sources) {
        Ok(request) => {
            println!("Crawl Request:");
            println!("  Category: {}", request.category);
            println!("  Bucket: {}", request.storage_bucket);
            println!("  Delay between symbols: {}s", request.per_symbol_delay_seconds);
            println!("  Wait timeout: {}ms", request.wait_timeout_ms);
            println!("  Headless: {}", request.headless);
            if let Some(executable) = &request.browser_executable {
                println!("  Browser: {}", executable.display());
            }
        }
        Err(e) => {
            println!("✗ Invalid configuration: {}", e);
        }
    }

    println!("\nSymbols ({}):", universe.len());
    for symbol in universe {
        println!("  - {}", symbol);
    }
}

/// Handles the main crawl operation
async fn handle_crawl(
    dispatcher: &Dispatcher,
    sources: &ConfigSources,
    universe: &SymbolUniverse,
    cancel: &CancellationToken,
    quiet: bool,
    started: Instant,
) -> InvocationResponse {
    let outcome = match resolve_request(sources) {
        Ok(request) => dispatcher.run_with_cancel(&request, universe, cancel).await,
        Err(e) => Err(e.into()),
    };

    match &outcome {
        Ok(result) => {
            tracing::info!("Crawl completed successfully");
            if !quiet {
                print_summary(result, started.elapsed());
            }
        }
        Err(e) => tracing::error!("Crawl failed: {}", e),
    }

    InvocationResponse::from_outcome(&outcome)
}
