//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl, update and pattern cycles end-to-end.

use gift_harvest::catalog::CatalogUrl;
use gift_harvest::config::{
    CatalogConfig, Config, CrawlConfig, HttpConfig, RetryConfig, StorageConfig, UpdaterConfig,
};
use gift_harvest::crawler::{full_crawl, sweep, CrawlSession};
use gift_harvest::media::HttpMediaSource;
use gift_harvest::patterns::{distribute_patterns, SymbolMap};
use gift_harvest::storage::{ItemStore, SqliteStore};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration pointing at the mock server
fn create_test_config(server_uri: &str, root: &Path) -> Config {
    Config {
        catalog: CatalogConfig {
            collection: "PlushPepe".to_string(),
            url_template: format!("{}/nft/{{collection}}-", server_uri),
        },
        http: HttpConfig {
            user_agent: "TestHarvest/1.0".to_string(),
            request_timeout_secs: 1,
            rate_limit: 1000,
            period_secs: 1,
        },
        retry: RetryConfig {
            max_attempts: 2,
            min_backoff_ms: 0,
            max_backoff_ms: 0,
        },
        crawl: CrawlConfig {
            batch_size: 2,
            batch_pause_ms: 0,
        },
        updater: UpdaterConfig { interval_secs: 1 },
        storage: StorageConfig {
            database_path: root.join("gifts.db"),
            root: root.to_path_buf(),
            bucket_count: 4,
        },
    }
}

/// Renders an item page carrying the collection quantity and a pattern reference
fn item_page(server_uri: &str, number: u64, symbol: &str, quantity: u64) -> String {
    format!(
        r##"<html><body>
        <svg>
            <radialGradient id="giftGradient">
                <stop stop-color="#1a2b3c"></stop>
                <stop stop-color="#4d5e6f"></stop>
            </radialGradient>
            <image id="giftPattern" xlink:href="{server_uri}/patterns/{symbol}.png"></image>
        </svg>
        <table class="tgme_gift_table">
            <tr><th>Model</th><td>Model {number} <mark>1.5%</mark></td></tr>
            <tr><th>Backdrop</th><td>Emerald <mark>2%</mark></td></tr>
            <tr><th>Symbol</th><td>{symbol} <mark>0.4%</mark></td></tr>
            <tr><th>Quantity</th><td>{quantity}/10,000 issued</td></tr>
        </table>
        </body></html>"##
    )
}

/// Mounts item pages `numbers` with the given quantity
async fn mount_items(server: &MockServer, numbers: std::ops::RangeInclusive<u64>, quantity: u64) {
    for number in numbers {
        let symbol = if number % 2 == 0 { "Moon" } else { "Star" };
        Mock::given(method("GET"))
            .and(path(format!("/nft/plushpepe-{}", number)))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(item_page(&server.uri(), number, symbol, quantity)),
            )
            .mount(server)
            .await;
    }
}

fn open_store(config: &Config) -> Arc<SqliteStore> {
    Arc::new(SqliteStore::new(&config.storage.database_path).expect("Failed to open store"))
}

#[tokio::test]
async fn test_full_crawl_persists_every_item() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), dir.path());
    mount_items(&server, 1..=5, 5).await;

    let store = open_store(&config);
    let report = full_crawl(&config, store.clone()).await.unwrap();

    assert_eq!(report.batches, 3);
    assert_eq!(report.parsed, 5);
    assert_eq!(report.sink_errors, 0);

    assert_eq!(store.max_number("plushpepe").unwrap(), 5);
    let stats = store.collection_stats("plushpepe").unwrap();
    assert_eq!(stats.rows, 5);
    assert_eq!(stats.distinct_models, 5);
    assert_eq!(stats.distinct_symbols, 2);

    let export = std::fs::read_to_string(config.storage.export_path("plushpepe")).unwrap();
    let lines: Vec<&str> = export.lines().collect();
    assert_eq!(lines.len(), 6);
    assert_eq!(
        lines[0],
        "name,number,m,bd,s,mchance,bdchance,schance,hex1,hex2,s_in_dir"
    );
    assert_eq!(
        lines[1],
        "plushpepe,1,Model 1,Emerald,Star,150,200,40,#1a2b3c,#4d5e6f,"
    );
}

#[tokio::test]
async fn test_unavailable_item_does_not_block_siblings() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), dir.path());

    mount_items(&server, 1..=2, 4).await;
    mount_items(&server, 4..=4, 4).await;
    Mock::given(method("GET"))
        .and(path("/nft/plushpepe-3"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let store = open_store(&config);
    let report = full_crawl(&config, store.clone()).await.unwrap();

    assert_eq!(report.parsed, 3);
    assert_eq!(report.unavailable, 1);

    let numbers: Vec<u64> = store
        .symbol_rows("plushpepe", "plushpepe")
        .unwrap()
        .iter()
        .map(|row| row.number)
        .collect();
    assert_eq!(numbers, vec![1, 2, 4]);
}

#[tokio::test]
async fn test_exhausted_retries_do_not_block_siblings() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&server.uri(), dir.path());
    config.retry = RetryConfig {
        min_backoff_ms: 0,
        max_backoff_ms: 0,
        ..RetryConfig::default()
    };
    assert_eq!(config.retry.max_attempts, 3);

    mount_items(&server, 1..=1, 2).await;
    // Slower than the request timeout, so every attempt fails at the transport level
    Mock::given(method("GET"))
        .and(path("/nft/plushpepe-2"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .expect(3)
        .mount(&server)
        .await;

    let store = open_store(&config);
    let report = full_crawl(&config, store.clone()).await.unwrap();

    assert_eq!(report.parsed, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(store.max_number("plushpepe").unwrap(), 1);
}

#[tokio::test]
async fn test_probe_without_quantity_aborts_crawl() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), dir.path());

    Mock::given(method("GET"))
        .and(path("/nft/plushpepe-1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .mount(&server)
        .await;

    let store = open_store(&config);
    let result = full_crawl(&config, store.clone()).await;

    assert!(result.is_err());
    assert_eq!(store.max_number("plushpepe").unwrap(), 0);
}

#[tokio::test]
async fn test_updater_crawls_only_new_items() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), dir.path());

    mount_items(&server, 1..=3, 3).await;
    let store = open_store(&config);
    full_crawl(&config, store.clone()).await.unwrap();
    assert_eq!(store.max_number("plushpepe").unwrap(), 3);

    // Nothing new: the sweep is a no-op
    let report = sweep(&config, store.clone()).await.unwrap();
    assert_eq!(report.collections, 1);
    assert_eq!(report.updated, 0);
    assert_eq!(report.crawl.parsed, 0);

    // Two more items are published
    server.reset().await;
    mount_items(&server, 1..=5, 5).await;

    let report = sweep(&config, store.clone()).await.unwrap();
    assert_eq!(report.updated, 1);
    assert_eq!(report.crawl.parsed, 2);
    assert_eq!(store.max_number("plushpepe").unwrap(), 5);
    assert_eq!(store.collection_stats("plushpepe").unwrap().rows, 5);

    // Running again leaves the store unchanged
    let report = sweep(&config, store.clone()).await.unwrap();
    assert_eq!(report.updated, 0);
    assert_eq!(store.collection_stats("plushpepe").unwrap().rows, 5);

    // The updater never touches the export
    let export = std::fs::read_to_string(config.storage.export_path("plushpepe")).unwrap();
    assert_eq!(export.lines().count(), 4);
}

#[tokio::test]
async fn test_sweep_isolates_failing_collection() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), dir.path());

    mount_items(&server, 1..=2, 2).await;
    Mock::given(method("GET"))
        .and(path("/nft/lolpop-1"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let store = open_store(&config);
    store.create_collection("lolpop").unwrap();
    store.create_collection("plushpepe").unwrap();

    let report = sweep(&config, store.clone()).await.unwrap();

    assert_eq!(report.collections, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(report.updated, 1);
    assert_eq!(report.crawl.parsed, 2);
    assert_eq!(store.max_number("plushpepe").unwrap(), 2);
    assert_eq!(store.max_number("lolpop").unwrap(), 0);
}

#[tokio::test]
async fn test_pattern_distribution_after_crawl() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), dir.path());

    mount_items(&server, 1..=4, 4).await;
    for symbol in ["Star", "Moon"] {
        Mock::given(method("GET"))
            .and(path(format!("/patterns/{}.png", symbol)))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(symbol.as_bytes().to_vec()))
            .expect(1)
            .mount(&server)
            .await;
    }

    let store = open_store(&config);
    full_crawl(&config, store.clone()).await.unwrap();

    // Two empty buckets: the first symbol takes 00, the second 01
    for bucket in ["00", "01"] {
        std::fs::create_dir_all(config.storage.patterns_dir().join(bucket)).unwrap();
    }

    let catalog =
        CatalogUrl::new(&config.catalog.url_template, &config.catalog.collection).unwrap();
    let source = HttpMediaSource::new(CrawlSession::from_config(&config).unwrap());
    let report = distribute_patterns(
        &catalog,
        store.as_ref(),
        &source,
        &config.storage.patterns_dir(),
        &config.storage.symbol_map_path(),
    )
    .await
    .unwrap();

    assert_eq!(report.assigned, 2);
    assert_eq!(report.failed, 0);

    let map = SymbolMap::load(&config.storage.symbol_map_path()).unwrap();
    let mut labels = vec![
        map.label_for("Star").unwrap(),
        map.label_for("Moon").unwrap(),
    ];
    labels.sort();
    assert!(labels[0].starts_with("00"));
    assert!(labels[1].starts_with("01"));

    let stats = store.collection_stats("plushpepe").unwrap();
    assert_eq!(stats.labelled_rows, 4);
}
