//! Crawler coordinator - batch crawl orchestration logic
//!
//! This module contains the batch loop that coordinates all aspects of
//! a crawl over a range of sequence numbers, including:
//! - Splitting the range into contiguous batches
//! - Fetching every item of a batch concurrently
//! - Draining each batch into the configured sinks
//! - Pacing consecutive batches

use crate::catalog::CatalogUrl;
use crate::config::Config;
use crate::crawler::fetcher::CrawlSession;
use crate::output::CsvExport;
use crate::record::{ItemRecord, PageOutcome};
use crate::storage::ItemStore;
use crate::Result;
use futures::future::join_all;
use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Destination for the valid records of one batch
///
/// Writes are blocking and run on the blocking thread pool.
pub trait BatchSink: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Writes all records of one batch as a single operation
    ///
    /// # Returns
    ///
    /// The number of records the sink actually stored
    fn write_batch(&self, records: &[ItemRecord]) -> Result<usize>;
}

/// Sink writing batches into one collection table
pub struct StoreSink {
    store: Arc<dyn ItemStore>,
    table: String,
}

impl StoreSink {
    pub fn new(store: Arc<dyn ItemStore>, table: impl Into<String>) -> Self {
        Self {
            store,
            table: table.into(),
        }
    }
}

impl BatchSink for StoreSink {
    fn name(&self) -> &str {
        "store"
    }

    fn write_batch(&self, records: &[ItemRecord]) -> Result<usize> {
        Ok(self.store.insert_batch(&self.table, records)?)
    }
}

/// Splits `start..=end` into contiguous ranges of at most `batch_size` numbers
///
/// # Example
///
/// ```
/// use gift_harvest::crawler::batch_ranges;
///
/// assert_eq!(batch_ranges(1, 5, 2), vec![1..=2, 3..=4, 5..=5]);
/// assert!(batch_ranges(6, 5, 2).is_empty());
/// ```
pub fn batch_ranges(start: u64, end: u64, batch_size: u64) -> Vec<RangeInclusive<u64>> {
    let batch_size = batch_size.max(1);
    let mut ranges = Vec::new();
    let mut batch_start = start;

    while batch_start <= end {
        let batch_end = batch_start.saturating_add(batch_size - 1).min(end);
        ranges.push(batch_start..=batch_end);
        match batch_end.checked_add(1) {
            Some(next) => batch_start = next,
            None => break,
        }
    }

    ranges
}

/// Counters describing one orchestrated crawl
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlReport {
    /// Batches processed
    pub batches: usize,
    /// Pages fetched and parsed
    pub parsed: usize,
    /// Pages answered with a non-success status
    pub unavailable: usize,
    /// Pages whose every attempt failed at the network level
    pub failed: usize,
    /// Sink writes that returned an error
    pub sink_errors: usize,
}

impl CrawlReport {
    pub(crate) fn absorb(&mut self, other: &CrawlReport) {
        self.batches += other.batches;
        self.parsed += other.parsed;
        self.unavailable += other.unavailable;
        self.failed += other.failed;
        self.sink_errors += other.sink_errors;
    }
}

/// Main batch coordinator structure
pub struct Coordinator {
    session: CrawlSession,
    catalog: CatalogUrl,
    batch_size: u64,
    batch_pause: Duration,
}

impl Coordinator {
    /// Creates a new coordinator for one collection
    ///
    /// # Arguments
    ///
    /// * `session` - The HTTP session for this phase
    /// * `catalog` - Address of the collection being crawled
    /// * `batch_size` - Number of items fetched concurrently per batch
    /// * `batch_pause` - Delay between consecutive batches
    pub fn new(
        session: CrawlSession,
        catalog: CatalogUrl,
        batch_size: u64,
        batch_pause: Duration,
    ) -> Self {
        Self {
            session,
            catalog,
            batch_size,
            batch_pause,
        }
    }

    pub fn catalog(&self) -> &CatalogUrl {
        &self.catalog
    }

    pub fn session(&self) -> &CrawlSession {
        &self.session
    }

    /// Crawls every item in `start..=end`
    ///
    /// Batches run strictly one after another. Within a batch every item is
    /// fetched concurrently, gated only by the session's rate limiter, and a
    /// failed item never cancels its siblings. Sinks receive each batch's
    /// valid records in one call and are skipped for batches without any.
    pub async fn run_range(
        &self,
        start: u64,
        end: u64,
        sinks: &[Arc<dyn BatchSink>],
    ) -> CrawlReport {
        let ranges = batch_ranges(start, end, self.batch_size);
        let mut report = CrawlReport::default();

        tracing::info!(
            "Crawling {} items {}..={} in {} batches",
            self.catalog.collection(),
            start,
            end,
            ranges.len()
        );

        for (index, range) in ranges.iter().enumerate() {
            if index > 0 && !self.batch_pause.is_zero() {
                tokio::time::sleep(self.batch_pause).await;
            }

            let batch = self.run_batch(range.clone(), sinks).await;
            report.absorb(&batch);
        }

        tracing::info!(
            "Finished {}: {} parsed, {} unavailable, {} failed, {} sink errors",
            self.catalog.collection(),
            report.parsed,
            report.unavailable,
            report.failed,
            report.sink_errors
        );

        report
    }

    /// Fetches one batch and drains it into the sinks
    async fn run_batch(
        &self,
        range: RangeInclusive<u64>,
        sinks: &[Arc<dyn BatchSink>],
    ) -> CrawlReport {
        let started = Instant::now();
        let (first, last) = (*range.start(), *range.end());

        let fetches = range.map(|number| async move {
            (number, self.session.fetch_item(&self.catalog, number).await)
        });
        let outcomes = join_all(fetches).await;

        let mut report = CrawlReport {
            batches: 1,
            ..CrawlReport::default()
        };
        let mut records = Vec::with_capacity(outcomes.len());

        for (number, outcome) in outcomes {
            match outcome {
                Ok(PageOutcome::Parsed(record)) => {
                    report.parsed += 1;
                    records.push(record);
                }
                Ok(PageOutcome::Unavailable { .. }) => report.unavailable += 1,
                Err(e) => {
                    tracing::error!("[{}] Giving up on item: {}", number, e);
                    report.failed += 1;
                }
            }
        }

        let valid = records.len();
        if !records.is_empty() {
            let records = Arc::new(records);
            for sink in sinks {
                let name = sink.name().to_string();
                match write_to_sink(Arc::clone(sink), Arc::clone(&records)).await {
                    Ok(written) => tracing::debug!(
                        "Wrote {} records of {} {}..={} to {}",
                        written,
                        self.catalog.collection(),
                        first,
                        last,
                        name
                    ),
                    Err(e) => {
                        tracing::error!(
                            "Failed to write {} {}..={} to {}: {}",
                            self.catalog.collection(),
                            first,
                            last,
                            name,
                            e
                        );
                        report.sink_errors += 1;
                    }
                }
            }
        }

        tracing::info!(
            "Batch {}..={} of {} done in {:.2?} ({} valid)",
            first,
            last,
            self.catalog.collection(),
            started.elapsed(),
            valid
        );

        report
    }
}

/// Runs one sink write on the blocking pool
async fn write_to_sink(sink: Arc<dyn BatchSink>, records: Arc<Vec<ItemRecord>>) -> Result<usize> {
    match tokio::task::spawn_blocking(move || sink.write_batch(&records)).await {
        Ok(written) => written,
        Err(e) => Err(e.into()),
    }
}

/// Runs a full crawl of the configured collection
///
/// This function:
///
/// 1. Creates the collection table if it is missing
/// 2. Probes the live item count
/// 3. Truncates the export file and writes its header
/// 4. Crawls `1..=total` into the store and the export
///
/// # Arguments
///
/// * `config` - The validated configuration
/// * `store` - The item store
///
/// # Returns
///
/// * `Ok(CrawlReport)` - The crawl ran to the end (individual items may still have failed)
/// * `Err(HarvestError)` - The collection could not be set up or probed
///
/// # Example
///
/// ```no_run
/// use gift_harvest::config::load_config;
/// use gift_harvest::crawler::full_crawl;
/// use gift_harvest::storage::open_storage;
/// use std::path::Path;
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("config.toml"))?;
/// let store = Arc::new(open_storage(&config.storage.database_path)?);
/// full_crawl(&config, store).await?;
/// # Ok(())
/// # }
/// ```
pub async fn full_crawl(config: &Config, store: Arc<dyn ItemStore>) -> Result<CrawlReport> {
    let catalog = CatalogUrl::new(&config.catalog.url_template, &config.catalog.collection)?;
    let table = catalog.collection().to_string();
    store.create_collection(&table)?;

    let session = CrawlSession::from_config(config)?;
    let total = session.probe_quantity(&catalog).await?;

    let export = CsvExport::new(config.storage.export_path(&table));
    export.reset()?;

    let coordinator = Coordinator::new(
        session,
        catalog,
        config.crawl.batch_size,
        config.crawl.batch_pause(),
    );
    let sinks: [Arc<dyn BatchSink>; 2] = [Arc::new(StoreSink::new(store, table)), Arc::new(export)];

    let started = Instant::now();
    let report = coordinator.run_range(1, total, &sinks).await;

    tracing::info!("Full crawl finished in {:.2?}", started.elapsed());
    Ok(report)
}
