use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for Gift-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub catalog: CatalogConfig,
    pub http: HttpConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    pub crawl: CrawlConfig,
    #[serde(default)]
    pub updater: UpdaterConfig,
    pub storage: StorageConfig,
}

/// Which catalog to crawl
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    /// Collection name as shown on the site (e.g. "PlushPepe")
    pub collection: String,

    /// Item URL prefix with a `{collection}` placeholder
    #[serde(rename = "url-template")]
    pub url_template: String,
}

/// Outbound HTTP behavior
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    /// Per-request timeout (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Requests admitted per period
    #[serde(rename = "rate-limit")]
    pub rate_limit: u32,

    /// Length of the rate limiting period (seconds)
    #[serde(rename = "period-secs")]
    pub period_secs: u64,
}

impl HttpConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn period(&self) -> Duration {
        Duration::from_secs(self.period_secs)
    }
}

/// Retry policy for transport failures
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    #[serde(rename = "max-attempts", default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(rename = "min-backoff-ms", default = "default_min_backoff")]
    pub min_backoff_ms: u64,

    #[serde(rename = "max-backoff-ms", default = "default_max_backoff")]
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            min_backoff_ms: default_min_backoff(),
            max_backoff_ms: default_max_backoff(),
        }
    }
}

/// Batch crawl behavior
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlConfig {
    /// Number of item pages fetched concurrently before persisting
    #[serde(rename = "batch-size")]
    pub batch_size: u64,

    /// Pause between batches (milliseconds)
    #[serde(rename = "batch-pause-ms", default = "default_batch_pause")]
    pub batch_pause_ms: u64,
}

impl CrawlConfig {
    pub fn batch_pause(&self) -> Duration {
        Duration::from_millis(self.batch_pause_ms)
    }
}

/// Incremental updater behavior
#[derive(Debug, Clone, Deserialize)]
pub struct UpdaterConfig {
    /// Delay between polling sweeps (seconds)
    #[serde(rename = "interval-secs", default = "default_interval")]
    pub interval_secs: u64,
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval(),
        }
    }
}

impl UpdaterConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// Where things are written
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: PathBuf,

    /// Root directory for exports, media and pattern buckets
    pub root: PathBuf,

    /// Number of bucket directories created by `scaffold`
    #[serde(rename = "bucket-count", default = "default_bucket_count")]
    pub bucket_count: u32,
}

impl StorageConfig {
    pub fn patterns_dir(&self) -> PathBuf {
        self.root.join("patterns")
    }

    pub fn symbol_map_path(&self) -> PathBuf {
        self.patterns_dir().join("symbols.json")
    }

    pub fn models_dir(&self, collection: &str) -> PathBuf {
        self.root.join("models").join(collection)
    }

    pub fn export_path(&self, table: &str) -> PathBuf {
        self.root.join(format!("{table}_data.csv"))
    }
}

fn default_request_timeout() -> u64 {
    30
}

fn default_max_attempts() -> u32 {
    3
}

fn default_min_backoff() -> u64 {
    2_000
}

fn default_max_backoff() -> u64 {
    10_000
}

fn default_batch_pause() -> u64 {
    100
}

fn default_interval() -> u64 {
    1
}

fn default_bucket_count() -> u32 {
    256
}
