//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with the configured user agent and timeout
//! - Gating every request through the shared rate limiter
//! - Retrying transport failures with backoff
//! - Classifying non-success statuses without retrying them

use crate::catalog::CatalogUrl;
use crate::config::{Config, HttpConfig};
use crate::crawler::limiter::RateLimiter;
use crate::crawler::parser::{parse_item_page, parse_quantity};
use crate::crawler::retry::RetryPolicy;
use crate::record::PageOutcome;
use crate::{HarvestError, Result};
use reqwest::{Client, Response};
use std::sync::Arc;
use std::time::Duration;

/// Result of a fetch operation that reached the server
#[derive(Debug)]
pub enum FetchResult<T> {
    /// The server answered with a success status
    Success {
        /// Final URL after redirects
        final_url: String,
        /// Response body
        body: T,
    },

    /// The server answered with a non-success status
    HttpError {
        /// The HTTP status code
        status_code: u16,
    },
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The HTTP configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use gift_harvest::config::HttpConfig;
/// use gift_harvest::crawler::build_http_client;
///
/// let config = HttpConfig {
///     user_agent: "GiftHarvest/1.0".to_string(),
///     request_timeout_secs: 30,
///     rate_limit: 20,
///     period_secs: 1,
/// };
///
/// let client = build_http_client(&config).unwrap();
/// ```
pub fn build_http_client(config: &HttpConfig) -> std::result::Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(config.request_timeout())
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Everything needed to talk to the site during one crawl phase
///
/// The session owns the HTTP client and shares its rate limiter with every
/// request it issues. It is created when a phase starts and dropped when the
/// phase ends.
#[derive(Debug, Clone)]
pub struct CrawlSession {
    client: Client,
    limiter: Arc<RateLimiter>,
    retry: RetryPolicy,
}

impl CrawlSession {
    pub fn new(client: Client, limiter: Arc<RateLimiter>, retry: RetryPolicy) -> Self {
        Self {
            client,
            limiter,
            retry,
        }
    }

    /// Builds a session from the `[http]` and `[retry]` configuration sections
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = build_http_client(&config.http)?;
        let limiter = Arc::new(RateLimiter::new(config.http.rate_limit, config.http.period()));
        Ok(Self::new(
            client,
            limiter,
            RetryPolicy::from_config(&config.retry),
        ))
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// Sends a single rate-limited GET
    async fn send(&self, url: &str) -> Result<Response> {
        self.limiter.acquire().await;
        tracing::debug!("GET {}", url);

        self.client
            .get(url)
            .send()
            .await
            .map_err(|source| HarvestError::Transport {
                url: url.to_string(),
                source,
            })
    }

    /// Fetches a page as text, retrying transport failures
    pub async fn fetch_text(&self, url: &str) -> Result<FetchResult<String>> {
        self.retry
            .run(
                |_| async move {
                    let response = self.send(url).await?;
                    let status = response.status();
                    let final_url = response.url().to_string();

                    if !status.is_success() {
                        return Ok(FetchResult::HttpError {
                            status_code: status.as_u16(),
                        });
                    }

                    let body = response
                        .text()
                        .await
                        .map_err(|source| HarvestError::Transport {
                            url: url.to_string(),
                            source,
                        })?;

                    Ok(FetchResult::Success { final_url, body })
                },
                HarvestError::is_transport,
            )
            .await
    }

    /// Fetches a binary asset, retrying transport failures
    ///
    /// A non-success status is an error here: assets are only requested after
    /// a page has referenced them.
    pub async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        self.retry
            .run(
                |_| async move {
                    let response = self.send(url).await?;
                    let status = response.status();

                    if !status.is_success() {
                        return Err(HarvestError::Status {
                            url: url.to_string(),
                            status: status.as_u16(),
                        });
                    }

                    let bytes = response
                        .bytes()
                        .await
                        .map_err(|source| HarvestError::Transport {
                            url: url.to_string(),
                            source,
                        })?;

                    Ok(bytes.to_vec())
                },
                HarvestError::is_transport,
            )
            .await
    }

    /// Fetches and parses one item page
    ///
    /// # Returns
    ///
    /// * `Ok(PageOutcome::Parsed)` - The page was served and parsed
    /// * `Ok(PageOutcome::Unavailable)` - The site answered with a non-success status
    /// * `Err(HarvestError::Transport)` - Every attempt failed at the network level
    pub async fn fetch_item(&self, catalog: &CatalogUrl, number: u64) -> Result<PageOutcome> {
        let url = catalog.item_url(number);

        match self.fetch_text(&url).await? {
            FetchResult::HttpError { status_code } => {
                tracing::warn!("[{}] Status {} for {}", number, status_code, url);
                Ok(PageOutcome::Unavailable {
                    status: status_code,
                })
            }
            FetchResult::Success { final_url, body } => {
                if final_url != url {
                    tracing::debug!("[{}] Redirected to {}", number, final_url);
                }
                let record = parse_item_page(&body, catalog.collection(), number);
                tracing::info!(
                    "Parsed {} #{}: model {} ({}), backdrop {} ({}), symbol {} ({}), gradient {}, {}",
                    record.name,
                    record.number,
                    record.model,
                    format_rarity(record.model_rarity),
                    record.backdrop,
                    format_rarity(record.backdrop_rarity),
                    record.symbol,
                    format_rarity(record.symbol_rarity),
                    record.hex1,
                    record.hex2
                );
                Ok(PageOutcome::Parsed(record))
            }
        }
    }

    /// Reads the live item count of a collection
    ///
    /// # Returns
    ///
    /// * `Ok(u64)` - The number of published items
    /// * `Err(HarvestError::Status)` - The probe page was not served
    /// * `Err(HarvestError::NotFound | HarvestError::Parse)` - The page layout changed
    pub async fn probe_quantity(&self, catalog: &CatalogUrl) -> Result<u64> {
        let url = catalog.probe_url();

        match self.fetch_text(&url).await? {
            FetchResult::HttpError { status_code } => Err(HarvestError::Status {
                url,
                status: status_code,
            }),
            FetchResult::Success { body, .. } => {
                let quantity = parse_quantity(&body, &url)?;
                tracing::info!("{} has {} items published", catalog.collection(), quantity);
                Ok(quantity)
            }
        }
    }
}

/// Renders a scaled rarity as a percentage for logs
fn format_rarity(rarity: u32) -> String {
    format!("{}.{:02}%", rarity / 100, rarity % 100)
}
