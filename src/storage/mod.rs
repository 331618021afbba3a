//! Storage module for persisting crawled items
//!
//! This module handles all database operations, including:
//! - Per-collection table lifecycle
//! - Batched item inserts
//! - Bucket label updates (single row and broadcast by symbol)
//! - Read-back queries for the updater, media downloader and distributor

mod schema;
mod sqlite;
mod traits;

pub use schema::quote_table;
pub use sqlite::SqliteStore;
pub use traits::{ItemStore, StorageError, StorageResult};

use std::path::Path;

/// Opens the storage database at `path`
pub fn open_storage(path: &Path) -> StorageResult<SqliteStore> {
    SqliteStore::new(path)
}

/// A stored row reduced to what the pattern distributor needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolRow {
    pub id: i64,
    pub number: u64,
    pub symbol: String,
    pub bucket_label: Option<String>,
}

/// Summary counts for one collection table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionStats {
    pub table: String,
    pub rows: u64,
    pub max_number: u64,
    pub distinct_models: u64,
    pub distinct_backdrops: u64,
    pub distinct_symbols: u64,
    pub labelled_rows: u64,
}
