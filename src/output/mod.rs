//! Output module for exports and reports
//!
//! This module handles:
//! - Mirroring crawled items into per-collection CSV files
//! - Loading and printing per-collection statistics

mod export;
pub mod stats;

pub use export::{CsvExport, EXPORT_COLUMNS};
pub use stats::{load_statistics, print_statistics, HarvestStatistics};
