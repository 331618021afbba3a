//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::record::ItemRecord;
use crate::storage::{CollectionStats, SymbolRow};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Invalid table name: {0:?}")]
    InvalidTableName(String),

    #[error("Storage connection poisoned")]
    Poisoned,

    #[error("Value out of range for column {column}: {value}")]
    OutOfRange { column: &'static str, value: i64 },

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// Every method is one logical operation: implementations acquire their
/// connection for the duration of the call and release it before returning,
/// so callers never hold the store across an `.await`.
pub trait ItemStore: Send + Sync {
    // ===== Collection Lifecycle =====

    /// Lists the tables of every known collection
    fn list_collections(&self) -> StorageResult<Vec<String>>;

    /// Creates the collection table (and its indexes) if it does not exist yet
    fn create_collection(&self, table: &str) -> StorageResult<()>;

    // ===== Writes =====

    /// Inserts a batch of records as one multi-row write
    ///
    /// Records whose `(name, number)` already exists are skipped.
    ///
    /// # Returns
    ///
    /// The number of rows actually inserted
    fn insert_batch(&self, table: &str, records: &[ItemRecord]) -> StorageResult<usize>;

    /// Sets the bucket label of a single row
    fn set_bucket_label(&self, table: &str, id: i64, label: &str) -> StorageResult<()>;

    /// Sets the bucket label on every row of `name` carrying `symbol`
    ///
    /// # Returns
    ///
    /// The number of rows updated
    fn set_bucket_label_for_symbol(
        &self,
        table: &str,
        name: &str,
        symbol: &str,
        label: &str,
    ) -> StorageResult<usize>;

    // ===== Reads =====

    /// Highest stored sequence number, 0 for an empty collection
    fn max_number(&self, table: &str) -> StorageResult<u64>;

    /// All `(id, number, symbol, label)` rows of a collection, in id order
    fn symbol_rows(&self, table: &str, name: &str) -> StorageResult<Vec<SymbolRow>>;

    /// Lowest sequence number of every distinct model, ordered by model name
    fn first_number_per_model(&self, table: &str, name: &str)
        -> StorageResult<Vec<(String, u64)>>;

    /// Summary counts for one collection
    fn collection_stats(&self, table: &str) -> StorageResult<CollectionStats>;
}
