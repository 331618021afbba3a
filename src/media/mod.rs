//! Media assets referenced from item pages
//!
//! This module handles:
//! - Resolving the animation and pattern assets an item page points to
//! - Downloading one animation per distinct model of a collection

mod models;

pub use models::{download_models, ModelDownloadReport};

use crate::crawler::{extract_animation_url, extract_pattern_url, CrawlSession, FetchResult};
use crate::{HarvestError, Result};
use async_trait::async_trait;

/// Fetches the binary assets referenced by an item page
#[async_trait]
pub trait MediaSource: Send + Sync {
    /// Returns the gzip-compressed animation of the item's model
    async fn fetch_model_animation(&self, page_url: &str) -> Result<Vec<u8>>;

    /// Returns the PNG pattern image of the item's symbol
    async fn fetch_pattern_image(&self, page_url: &str) -> Result<Vec<u8>>;
}

/// Media source reading item pages over HTTP
///
/// Both the page and the asset requests go through the session, so they
/// count against the same rate limit as the crawl.
pub struct HttpMediaSource {
    session: CrawlSession,
}

impl HttpMediaSource {
    pub fn new(session: CrawlSession) -> Self {
        Self { session }
    }

    /// Fetches a page and follows the asset reference `extract` finds in it
    async fn fetch_referenced(
        &self,
        page_url: &str,
        field: &str,
        extract: fn(&str) -> Option<String>,
    ) -> Result<Vec<u8>> {
        let body = match self.session.fetch_text(page_url).await? {
            FetchResult::Success { body, .. } => body,
            FetchResult::HttpError { status_code } => {
                return Err(HarvestError::Status {
                    url: page_url.to_string(),
                    status: status_code,
                })
            }
        };

        let asset_url = extract(&body).ok_or_else(|| HarvestError::NotFound {
            field: field.to_string(),
            url: page_url.to_string(),
        })?;

        tracing::debug!("Downloading {} from {}", field, asset_url);
        self.session.fetch_bytes(&asset_url).await
    }
}

#[async_trait]
impl MediaSource for HttpMediaSource {
    async fn fetch_model_animation(&self, page_url: &str) -> Result<Vec<u8>> {
        self.fetch_referenced(page_url, "animation", extract_animation_url)
            .await
    }

    async fn fetch_pattern_image(&self, page_url: &str) -> Result<Vec<u8>> {
        self.fetch_referenced(page_url, "pattern", extract_pattern_url)
            .await
    }
}
