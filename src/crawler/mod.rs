//! Crawler module for catalog page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - Shared rate limiting and retry with backoff
//! - HTTP fetching and item page parsing
//! - Batch orchestration of full crawls
//! - Incremental polling for newly published items

mod coordinator;
mod fetcher;
mod limiter;
mod parser;
mod retry;
mod updater;

pub use coordinator::{batch_ranges, full_crawl, BatchSink, Coordinator, CrawlReport, StoreSink};
pub use fetcher::{build_http_client, CrawlSession, FetchResult};
pub use limiter::RateLimiter;
pub use parser::{
    extract_animation_url, extract_pattern_url, parse_item_page, parse_quantity,
    parse_quantity_text, parse_rarity,
};
pub use retry::RetryPolicy;
pub use updater::{run_updater, run_updater_until, sweep, SweepReport};
