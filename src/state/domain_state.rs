use std::time::{Duration, Instant};

/// Tracks the politeness state of one domain during a session
///
/// This structure maintains the per-domain information needed by the rate
/// limiter: when the last request left and which robots crawl delay applies.
#[derive(Debug, Clone, Default)]
pub struct DomainState {
    /// Number of requests made to this domain in the current session
    pub request_count: u32,

    /// Timestamp of the last request to this domain
    pub last_request_time: Option<Instant>,

    /// Crawl delay advertised by robots.txt (already capped)
    pub crawl_delay: Duration,
}

impl DomainState {
    /// Creates a new DomainState with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Effective spacing between two requests to this domain
    ///
    /// # Arguments
    ///
    /// * `min_interval` - `1 / requests-per-second`
    pub fn interval(&self, min_interval: Duration) -> Duration {
        min_interval.max(self.crawl_delay)
    }

    /// How long to wait at `now` before the next request may leave
    ///
    /// Zero for a domain that has not been contacted yet.
    pub fn time_until_ready(&self, min_interval: Duration, now: Instant) -> Duration {
        match self.last_request_time {
            Some(last) => self
                .interval(min_interval)
                .saturating_sub(now.saturating_duration_since(last)),
            None => Duration::ZERO,
        }
    }

    /// Records that a request is leaving now
    pub fn record_request(&mut self, now: Instant) {
        self.request_count += 1;
        self.last_request_time = Some(now);
    }
}
