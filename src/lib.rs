//! Gift-Harvest: a catalog crawler for numbered collectible gift pages
//!
//! This crate crawls every item page of a collection, extracts its attributes,
//! stores them in SQLite and a CSV export, keeps the store current by polling,
//! and distributes shared pattern assets across a pool of bucket directories.

pub mod catalog;
pub mod config;
pub mod crawler;
pub mod media;
pub mod output;
pub mod patterns;
pub mod record;
pub mod storage;

use thiserror::Error;

/// Main error type for Gift-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Transport error for {url}: {source}")]
    Transport { url: String, source: reqwest::Error },

    #[error("Unexpected status {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Field '{field}' not found on {url}")]
    NotFound { field: String, url: String },

    #[error("Malformed value for '{field}': {value:?}")]
    Parse { field: String, value: String },

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Export error: {0}")]
    Export(#[from] csv::Error),

    #[error("Symbol map error: {0}")]
    SymbolMap(#[from] serde_json::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl HarvestError {
    /// Whether the error came from the network layer and may succeed on retry
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Gift-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use catalog::CatalogUrl;
pub use config::Config;
pub use record::{ItemRecord, PageOutcome};
