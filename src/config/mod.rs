//! Configuration module for Gift-Harvest
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! The resulting [`Config`] is built once at startup and handed to every component;
//! nothing reads the environment afterwards.
//!
//! # Example
//!
//! ```no_run
//! use gift_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Crawling collection {}", config.catalog.collection);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    CatalogConfig, Config, CrawlConfig, HttpConfig, RetryConfig, StorageConfig, UpdaterConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use validation::validate;
