//! Shared request rate limiting
//!
//! One limiter is created per crawl phase and handed (behind an `Arc`) to every
//! task that talks to the site, so the configured rate bounds the phase as a
//! whole rather than each caller separately.

use governor::{
    clock::DefaultClock,
    state::{direct::NotKeyed, InMemoryState},
    Quota, RateLimiter as GovernorLimiter,
};
use std::num::NonZeroU32;
use std::time::Duration;

/// Token gate admitting `rate` requests per `period`
///
/// Tokens replenish continuously (one every `period / rate`) and up to `rate`
/// requests may be admitted back to back.
pub struct RateLimiter {
    inner: GovernorLimiter<NotKeyed, InMemoryState, DefaultClock>,
    rate: u32,
    period: Duration,
}

impl RateLimiter {
    /// Creates a limiter admitting `rate` requests per `period`
    ///
    /// A zero rate or period is clamped to one request per millisecond so the
    /// gate always makes progress; configuration validation rejects both
    /// before a crawl starts.
    ///
    /// # Example
    ///
    /// ```
    /// use gift_harvest::crawler::RateLimiter;
    /// use std::time::Duration;
    ///
    /// let limiter = RateLimiter::new(2, Duration::from_secs(1));
    /// assert!(limiter.try_acquire());
    /// assert!(limiter.try_acquire());
    /// assert!(!limiter.try_acquire());
    /// ```
    pub fn new(rate: u32, period: Duration) -> Self {
        let burst = NonZeroU32::new(rate).unwrap_or(NonZeroU32::MIN);
        let replenish = (period / burst.get()).max(Duration::from_millis(1));

        let quota = Quota::with_period(replenish)
            .unwrap_or_else(|| Quota::per_second(burst))
            .allow_burst(burst);

        Self {
            inner: GovernorLimiter::direct(quota),
            rate: burst.get(),
            period,
        }
    }

    /// Waits until a request slot is available and takes it
    pub async fn acquire(&self) {
        self.inner.until_ready().await;
    }

    /// Takes a request slot if one is available right now
    pub fn try_acquire(&self) -> bool {
        self.inner.check().is_ok()
    }

    pub fn rate(&self) -> u32 {
        self.rate
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("rate", &self.rate)
            .field("period", &self.period)
            .finish()
    }
}
