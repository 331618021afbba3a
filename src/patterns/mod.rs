//! Pattern image distribution across bucket directories
//!
//! This module handles:
//! - Counting and selecting bucket directories
//! - Persisting the symbol to image map
//! - Downloading each symbol's pattern once and labelling its rows

mod buckets;
mod distributor;
mod symbols;

pub use buckets::{asset_file_name, scaffold_buckets, BucketPool, ASSET_EXTENSION, DEFAULT_BUCKET};
pub use distributor::{distribute_patterns, DistributionReport};
pub use symbols::SymbolMap;
