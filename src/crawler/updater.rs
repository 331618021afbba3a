//! Incremental updater
//!
//! Polls every known collection for items published since the last crawl and
//! crawls only the new range.

use crate::catalog::CatalogUrl;
use crate::config::Config;
use crate::crawler::coordinator::{BatchSink, Coordinator, CrawlReport, StoreSink};
use crate::crawler::fetcher::CrawlSession;
use crate::storage::ItemStore;
use crate::Result;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::Arc;

/// What one sweep over all collections did
#[derive(Debug, Clone)]
pub struct SweepReport {
    pub started_at: DateTime<Utc>,
    /// Collections inspected
    pub collections: usize,
    /// Collections that had new items
    pub updated: usize,
    /// Collections whose update failed
    pub failed: usize,
    pub crawl: CrawlReport,
}

/// Outcome of checking one collection
enum CollectionUpdate {
    UpToDate,
    Crawled(CrawlReport),
}

/// Checks every known collection once and crawls whatever is new
///
/// A failure in one collection is logged and does not stop the others.
pub async fn sweep(config: &Config, store: Arc<dyn ItemStore>) -> Result<SweepReport> {
    let started_at = Utc::now();
    let tables = store.list_collections()?;
    let session = CrawlSession::from_config(config)?;

    let mut report = SweepReport {
        started_at,
        collections: tables.len(),
        updated: 0,
        failed: 0,
        crawl: CrawlReport::default(),
    };

    for table in &tables {
        match update_collection(config, &session, Arc::clone(&store), table).await {
            Ok(CollectionUpdate::UpToDate) => {}
            Ok(CollectionUpdate::Crawled(crawl)) => {
                report.updated += 1;
                report.crawl.absorb(&crawl);
            }
            Err(e) => {
                tracing::error!("Failed to update {}: {}", table, e);
                report.failed += 1;
            }
        }
    }

    Ok(report)
}

async fn update_collection(
    config: &Config,
    session: &CrawlSession,
    store: Arc<dyn ItemStore>,
    table: &str,
) -> Result<CollectionUpdate> {
    let catalog = CatalogUrl::new(&config.catalog.url_template, table)?;
    let stored = store.max_number(table)?;
    let live = session.probe_quantity(&catalog).await?;

    if live <= stored {
        tracing::debug!("{} is up to date ({} stored, {} live)", table, stored, live);
        return Ok(CollectionUpdate::UpToDate);
    }

    tracing::info!(
        "{} has {} new items ({}..={})",
        table,
        live - stored,
        stored + 1,
        live
    );

    let coordinator = Coordinator::new(
        session.clone(),
        catalog,
        config.crawl.batch_size,
        config.crawl.batch_pause(),
    );
    let sinks: [Arc<dyn BatchSink>; 1] = [Arc::new(StoreSink::new(store, table))];

    Ok(CollectionUpdate::Crawled(
        coordinator.run_range(stored + 1, live, &sinks).await,
    ))
}

/// Runs sweeps until interrupted by Ctrl-C
///
/// With `once` set a single sweep runs and its report is returned; otherwise
/// sweeps repeat on the configured interval.
pub async fn run_updater(
    config: &Config,
    store: Arc<dyn ItemStore>,
    once: bool,
) -> Result<Option<SweepReport>> {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };
    run_updater_until(config, store, once, ctrl_c).await
}

/// Runs sweeps until `shutdown` completes
///
/// `shutdown` is polled during sweeps as well as between them, so a stop
/// request is honored as soon as it arrives. An interrupted sweep is
/// abandoned and the report of the last completed sweep is returned.
pub async fn run_updater_until<F>(
    config: &Config,
    store: Arc<dyn ItemStore>,
    once: bool,
    shutdown: F,
) -> Result<Option<SweepReport>>
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    if once {
        let report = tokio::select! {
            result = sweep(config, store) => result?,
            _ = &mut shutdown => {
                tracing::info!("Interrupted, abandoning sweep");
                return Ok(None);
            }
        };
        log_sweep(&report);
        return Ok(Some(report));
    }

    tracing::info!(
        "Updater started, polling every {:?} (Ctrl-C to stop)",
        config.updater.interval()
    );

    let mut last = None;
    loop {
        let result = tokio::select! {
            result = sweep(config, Arc::clone(&store)) => result,
            _ = &mut shutdown => {
                tracing::info!("Interrupted during sweep, stopping updater");
                return Ok(last);
            }
        };

        match result {
            Ok(report) => {
                log_sweep(&report);
                last = Some(report);
            }
            Err(e) => tracing::error!("Sweep failed: {}", e),
        }

        tokio::select! {
            _ = tokio::time::sleep(config.updater.interval()) => {}
            _ = &mut shutdown => {
                tracing::info!("Interrupted, stopping updater");
                return Ok(last);
            }
        }
    }
}

fn log_sweep(report: &SweepReport) {
    if report.updated > 0 || report.failed > 0 {
        tracing::info!(
            "Sweep at {}: {} collections, {} updated, {} failed, {} new items",
            report.started_at.format("%Y-%m-%d %H:%M:%S"),
            report.collections,
            report.updated,
            report.failed,
            report.crawl.parsed
        );
    } else {
        tracing::debug!(
            "Sweep at {}: nothing new in {} collections",
            report.started_at.format("%Y-%m-%d %H:%M:%S"),
            report.collections
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        CatalogConfig, CrawlConfig, HttpConfig, RetryConfig, StorageConfig, UpdaterConfig,
    };
    use crate::storage::SqliteStore;
    use std::path::Path;
    use std::time::{Duration, Instant};
    use tempfile::TempDir;
    use tokio::sync::oneshot;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn create_test_config(server_uri: &str, root: &Path) -> Config {
        Config {
            catalog: CatalogConfig {
                collection: "PlushPepe".to_string(),
                url_template: format!("{}/nft/{{collection}}-", server_uri),
            },
            http: HttpConfig {
                user_agent: "TestHarvest/1.0".to_string(),
                request_timeout_secs: 30,
                rate_limit: 100,
                period_secs: 1,
            },
            retry: RetryConfig {
                max_attempts: 1,
                min_backoff_ms: 0,
                max_backoff_ms: 0,
            },
            crawl: CrawlConfig {
                batch_size: 2,
                batch_pause_ms: 0,
            },
            updater: UpdaterConfig { interval_secs: 60 },
            storage: StorageConfig {
                database_path: root.join("gifts.db"),
                root: root.to_path_buf(),
                bucket_count: 4,
            },
        }
    }

    fn store_with_table() -> Arc<dyn ItemStore> {
        let store = SqliteStore::open_in_memory().unwrap();
        store.create_collection("plushpepe").unwrap();
        Arc::new(store)
    }

    #[tokio::test]
    async fn test_shutdown_during_sweep_stops_updater() {
        let server = MockServer::start().await;
        // The probe hangs far longer than the test is willing to wait
        Mock::given(method("GET"))
            .and(path("/nft/plushpepe-1"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(20)))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let config = create_test_config(&server.uri(), dir.path());
        let (tx, rx) = oneshot::channel::<()>();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            let _ = tx.send(());
        });

        let started = Instant::now();
        let result = tokio::time::timeout(
            Duration::from_secs(5),
            run_updater_until(&config, store_with_table(), false, async {
                let _ = rx.await;
            }),
        )
        .await
        .expect("updater ignored the stop request during a sweep");

        assert!(result.unwrap().is_none());
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_shutdown_between_sweeps_returns_last_report() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/nft/plushpepe-1"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let config = create_test_config(&server.uri(), dir.path());
        let (tx, rx) = oneshot::channel::<()>();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            let _ = tx.send(());
        });

        let report = tokio::time::timeout(
            Duration::from_secs(5),
            run_updater_until(&config, store_with_table(), false, async {
                let _ = rx.await;
            }),
        )
        .await
        .expect("updater ignored the stop request while sleeping")
        .unwrap()
        .unwrap();

        assert_eq!(report.collections, 1);
        assert_eq!(report.failed, 1);
    }

    #[tokio::test]
    async fn test_once_runs_a_single_sweep() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/nft/plushpepe-1"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let config = create_test_config(&server.uri(), dir.path());

        let report = run_updater_until(
            &config,
            store_with_table(),
            true,
            std::future::pending::<()>(),
        )
        .await
        .unwrap()
        .unwrap();

        assert_eq!(report.collections, 1);
        assert_eq!(report.updated, 0);
    }
}
