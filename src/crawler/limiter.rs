//! Per-domain politeness delays
//!
//! The limiter is a suspension point, not a lock: a session awaits [`RateLimiter::wait`]
//! before every request, which sleeps until the domain's interval has passed and
//! then adds a random jitter.

use crate::config::CrawlerConfig;
use crate::state::DomainState;
use rand::Rng;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Session-scoped rate limiter
#[derive(Debug)]
pub struct RateLimiter {
    /// `1 / requests-per-second`
    min_interval: Duration,
    max_jitter: Duration,
    domains: HashMap<String, DomainState>,
}

impl RateLimiter {
    /// Creates a limiter from crawler settings
    pub fn new(config: &CrawlerConfig) -> Self {
        let min_interval = if config.requests_per_second > 0.0 {
            Duration::from_secs_f64(1.0 / config.requests_per_second)
        } else {
            Duration::ZERO
        };

        Self {
            min_interval,
            max_jitter: Duration::from_millis(config.max_jitter_ms),
            domains: HashMap::new(),
        }
    }

    /// Records the robots crawl delay for a domain
    pub fn set_crawl_delay(&mut self, domain: &str, delay: Duration) {
        self.domains
            .entry(domain.to_string())
            .or_insert_with(DomainState::new)
            .crawl_delay = delay;
    }

    /// Computes how long a request to `domain` must wait at `now`, excluding jitter
    pub fn delay_for(&self, domain: &str, now: Instant) -> Duration {
        self.domains
            .get(domain)
            .map(|state| state.time_until_ready(self.min_interval, now))
            .unwrap_or(Duration::ZERO)
    }

    /// Waits until a request to `domain` may leave, then records it
    ///
    /// # Returns
    ///
    /// The total time slept
    pub async fn wait(&mut self, domain: &str) -> Duration {
        let delay = self.delay_for(domain, Instant::now()) + self.jitter();

        if !delay.is_zero() {
            tracing::debug!("Rate limiting {}: sleeping {:?}", domain, delay);
            tokio::time::sleep(delay).await;
        }

        self.domains
            .entry(domain.to_string())
            .or_insert_with(DomainState::new)
            .record_request(Instant::now());

        delay
    }

    /// Number of requests let through for a domain
    pub fn request_count(&self, domain: &str) -> u32 {
        self.domains
            .get(domain)
            .map(|state| state.request_count)
            .unwrap_or(0)
    }

    fn jitter(&self) -> Duration {
        if self.max_jitter.is_zero() {
            return Duration::ZERO;
        }
        let ms = rand::thread_rng().gen_range(0..=self.max_jitter.as_millis() as u64);
        Duration::from_millis(ms)
    }
}
