//! Gift-Harvest main entry point
//!
//! This is the command-line interface for the Gift-Harvest catalog crawler.

use anyhow::Context;
use clap::{Parser, Subcommand};
use gift_harvest::catalog::CatalogUrl;
use gift_harvest::config::{load_config_with_hash, Config};
use gift_harvest::crawler::{full_crawl, run_updater, CrawlSession};
use gift_harvest::media::{download_models, HttpMediaSource};
use gift_harvest::output::{load_statistics, print_statistics};
use gift_harvest::patterns::{distribute_patterns, scaffold_buckets};
use gift_harvest::storage::{open_storage, ItemStore};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Gift-Harvest: a catalog crawler for numbered gift pages
///
/// Gift-Harvest crawls every item page of a collection, stores the extracted
/// attributes in SQLite and a CSV export, keeps the store current by polling
/// for new items, and distributes pattern images across bucket directories.
#[derive(Parser, Debug)]
#[command(name = "gift-harvest")]
#[command(version = "1.0.0")]
#[command(about = "A catalog crawler for numbered gift pages", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl the configured collection from the first item to the last
    Crawl {
        /// Do not download model animations afterwards
        #[arg(long)]
        skip_media: bool,

        /// Do not distribute pattern images afterwards
        #[arg(long)]
        skip_patterns: bool,
    },

    /// Poll every known collection for new items
    Update {
        /// Run a single sweep and exit
        #[arg(long)]
        once: bool,
    },

    /// Download pattern images for unmapped symbols and label rows
    Patterns,

    /// Download one animation per distinct model
    Media,

    /// Show statistics from the database and exit
    Stats,

    /// Create the storage directory layout
    Scaffold,

    /// Validate config and show what would be crawled without crawling
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    match cli.command {
        Command::Check => handle_check(&config, &config_hash)?,
        Command::Scaffold => handle_scaffold(&config)?,
        Command::Stats => handle_stats(&config)?,
        Command::Crawl {
            skip_media,
            skip_patterns,
        } => handle_crawl(&config, skip_media, skip_patterns).await?,
        Command::Update { once } => handle_update(&config, once).await?,
        Command::Media => handle_media(&config, open_store(&config)?.as_ref()).await?,
        Command::Patterns => handle_patterns(&config, open_store(&config)?.as_ref()).await?,
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("gift_harvest=info,warn"),
            1 => EnvFilter::new("gift_harvest=debug,info"),
            2 => EnvFilter::new("gift_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Opens the item store, creating the database directory if needed
fn open_store(config: &Config) -> anyhow::Result<Arc<dyn ItemStore>> {
    let path = &config.storage.database_path;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let store = open_storage(path)
        .with_context(|| format!("Failed to open database {}", path.display()))?;
    Ok(Arc::new(store))
}

fn catalog_for(config: &Config) -> anyhow::Result<CatalogUrl> {
    CatalogUrl::new(&config.catalog.url_template, &config.catalog.collection)
        .context("Invalid url-template")
}

/// Handles `check`: validates config and shows what would be crawled
fn handle_check(config: &Config, config_hash: &str) -> anyhow::Result<()> {
    let catalog = catalog_for(config)?;

    println!("=== Gift-Harvest Check ===\n");

    println!("Catalog:");
    println!("  Collection: {}", catalog.collection());
    println!("  First item: {}", catalog.probe_url());

    println!("\nHTTP:");
    println!("  User agent: {}", config.http.user_agent);
    println!("  Timeout: {}s", config.http.request_timeout_secs);
    println!(
        "  Rate: {} requests per {}s",
        config.http.rate_limit, config.http.period_secs
    );
    println!(
        "  Retry: {} attempts, backoff {}ms..{}ms",
        config.retry.max_attempts, config.retry.min_backoff_ms, config.retry.max_backoff_ms
    );

    println!("\nCrawl:");
    println!("  Batch size: {}", config.crawl.batch_size);
    println!("  Batch pause: {}ms", config.crawl.batch_pause_ms);
    println!("  Update interval: {}s", config.updater.interval_secs);

    println!("\nStorage:");
    println!("  Database: {}", config.storage.database_path.display());
    println!(
        "  Export: {}",
        config.storage.export_path(catalog.collection()).display()
    );
    println!("  Patterns: {}", config.storage.patterns_dir().display());
    println!(
        "  Models: {}",
        config.storage.models_dir(catalog.collection()).display()
    );

    println!("\n✓ Configuration is valid (hash: {})", config_hash);

    Ok(())
}

/// Handles `scaffold`: creates the directory layout
fn handle_scaffold(config: &Config) -> anyhow::Result<()> {
    let catalog = catalog_for(config)?;
    let models_dir = config.storage.models_dir(catalog.collection());

    for dir in [models_dir.join("tgs"), models_dir.join("anim")] {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }

    let buckets = scaffold_buckets(&config.storage.patterns_dir(), config.storage.bucket_count)?;

    println!("✓ Model directories ready under {}", models_dir.display());
    println!(
        "✓ {} pattern buckets ready under {}",
        buckets,
        config.storage.patterns_dir().display()
    );

    Ok(())
}

/// Handles `stats`: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.storage.database_path.display());

    let store = open_store(config)?;
    let stats = load_statistics(store.as_ref())?;
    print_statistics(&stats);

    Ok(())
}

/// Handles `crawl`: full crawl followed by media and pattern phases
async fn handle_crawl(config: &Config, skip_media: bool, skip_patterns: bool) -> anyhow::Result<()> {
    let store = open_store(config)?;

    tracing::info!(
        "Starting full crawl of {} (batch size {})",
        config.catalog.collection,
        config.crawl.batch_size
    );

    let report = full_crawl(config, Arc::clone(&store))
        .await
        .context("Crawl failed")?;
    tracing::info!(
        "Crawl completed: {} parsed, {} unavailable, {} failed",
        report.parsed,
        report.unavailable,
        report.failed
    );

    if !skip_media {
        handle_media(config, store.as_ref()).await?;
    }
    if !skip_patterns {
        handle_patterns(config, store.as_ref()).await?;
    }

    Ok(())
}

/// Handles `update`: polls known collections for new items
async fn handle_update(config: &Config, once: bool) -> anyhow::Result<()> {
    let store = open_store(config)?;
    run_updater(config, store, once)
        .await
        .context("Updater failed")?;
    Ok(())
}

/// Handles `media`: downloads one animation per model
async fn handle_media(config: &Config, store: &dyn ItemStore) -> anyhow::Result<()> {
    let catalog = catalog_for(config)?;
    let source = HttpMediaSource::new(CrawlSession::from_config(config)?);

    let report = download_models(
        &catalog,
        store,
        &source,
        &config.storage.models_dir(catalog.collection()),
    )
    .await
    .context("Model download failed")?;

    tracing::info!(
        "Models: {} downloaded, {} failed",
        report.downloaded,
        report.failed
    );
    Ok(())
}

/// Handles `patterns`: distributes pattern images across buckets
async fn handle_patterns(config: &Config, store: &dyn ItemStore) -> anyhow::Result<()> {
    let catalog = catalog_for(config)?;
    let source = HttpMediaSource::new(CrawlSession::from_config(config)?);

    let report = distribute_patterns(
        &catalog,
        store,
        &source,
        &config.storage.patterns_dir(),
        &config.storage.symbol_map_path(),
    )
    .await
    .context("Pattern distribution failed")?;

    tracing::info!(
        "Patterns: {} assigned, {} backfilled, {} failed",
        report.assigned,
        report.backfilled,
        report.failed
    );
    Ok(())
}
