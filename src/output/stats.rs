//! Statistics generation from the item database
//!
//! This module provides functionality for extracting and displaying
//! per-collection statistics from the storage layer.

use crate::storage::{CollectionStats, ItemStore};
use crate::Result;

/// Statistics over every stored collection
#[derive(Debug, Clone)]
pub struct HarvestStatistics {
    /// One entry per collection, ordered by table name
    pub collections: Vec<CollectionStats>,
}

impl HarvestStatistics {
    /// Total number of stored items across all collections
    pub fn total_items(&self) -> u64 {
        self.collections.iter().map(|c| c.rows).sum()
    }
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `store` - The storage backend to query
///
/// # Returns
///
/// * `Ok(HarvestStatistics)` - Successfully loaded statistics
/// * `Err(HarvestError)` - Failed to query statistics
pub fn load_statistics(store: &dyn ItemStore) -> Result<HarvestStatistics> {
    let collections = store
        .list_collections()?
        .iter()
        .map(|table| store.collection_stats(table))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(HarvestStatistics { collections })
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &HarvestStatistics) {
    println!("=== Harvest Statistics ===\n");

    println!("Overview:");
    println!("  Collections: {}", stats.collections.len());
    println!("  Total items stored: {}", stats.total_items());
    println!();

    for collection in &stats.collections {
        // Gaps come from items that were unavailable or failed during the crawl
        let coverage = if collection.max_number > 0 {
            (collection.rows as f64 / collection.max_number as f64) * 100.0
        } else {
            0.0
        };
        let labelled = if collection.rows > 0 {
            (collection.labelled_rows as f64 / collection.rows as f64) * 100.0
        } else {
            0.0
        };

        println!("{}:", collection.table);
        println!(
            "  Items: {} (highest #{}, {:.1}% coverage)",
            collection.rows, collection.max_number, coverage
        );
        println!("  Distinct models: {}", collection.distinct_models);
        println!("  Distinct backdrops: {}", collection.distinct_backdrops);
        println!("  Distinct symbols: {}", collection.distinct_symbols);
        println!(
            "  Pattern labels: {} ({:.1}%)",
            collection.labelled_rows, labelled
        );
        println!();
    }
}
