//! Session-scoped robots.txt cache
//!
//! Each origin's robots.txt is fetched at most once per crawl session. Entries
//! are never refreshed: sessions are short and bounded by their page budget.

use crate::robots::{fetch_robots, ParsedRobots};
use crate::url::origin_key;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

/// Outcome of a robots check for one URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RobotsDecision {
    /// Whether the URL may be fetched
    pub allowed: bool,
    /// Crawl delay requested for our token (zero when none)
    pub crawl_delay: Duration,
}

impl RobotsDecision {
    /// The fail-open decision
    pub fn allow() -> Self {
        Self {
            allowed: true,
            crawl_delay: Duration::ZERO,
        }
    }
}

/// Cached robots.txt data for one origin
#[derive(Debug, Clone)]
pub struct CachedRobots {
    /// The parsed robots.txt content
    pub content: ParsedRobots,

    /// When the robots.txt was fetched
    pub fetched_at: DateTime<Utc>,
}

impl CachedRobots {
    pub fn new(content: ParsedRobots) -> Self {
        Self {
            content,
            fetched_at: Utc::now(),
        }
    }
}

/// Robots cache owned by one crawl session
#[derive(Debug)]
pub struct RobotsCache {
    /// Product token matched against `User-agent` groups
    token: String,
    /// Upper bound applied to `Crawl-delay`
    max_crawl_delay: Duration,
    entries: HashMap<String, CachedRobots>,
}

impl RobotsCache {
    /// Creates an empty cache
    ///
    /// # Arguments
    ///
    /// * `token` - Robots product token (e.g. `SitesignalBot`)
    /// * `max_crawl_delay` - Cap applied to any advertised crawl delay
    pub fn new(token: impl Into<String>, max_crawl_delay: Duration) -> Self {
        Self {
            token: token.into(),
            max_crawl_delay,
            entries: HashMap::new(),
        }
    }

    /// Resolves the robots decision for a URL
    ///
    /// Fetches `<origin>/robots.txt` on the first call for an origin. Any
    /// failure to obtain the file results in an allow-all entry.
    pub async fn resolve(
        &mut self,
        client: &reqwest::Client,
        user_agent: &str,
        url: &Url,
    ) -> RobotsDecision {
        let origin = origin_key(url);

        if !self.entries.contains_key(&origin) {
            let robots = fetch_robots(client, &origin, user_agent).await;
            self.insert(&origin, robots);
        }

        match self.entries.get(&origin) {
            Some(cached) => self.decide(&cached.content, url),
            None => RobotsDecision::allow(),
        }
    }

    /// Stores parsed robots data for an origin
    pub fn insert(&mut self, origin: &str, robots: ParsedRobots) {
        self.entries
            .insert(origin.to_string(), CachedRobots::new(robots));
    }

    /// Returns the cached entry for an origin, if any
    pub fn get(&self, origin: &str) -> Option<&CachedRobots> {
        self.entries.get(origin)
    }

    /// Number of origins resolved so far
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn decide(&self, robots: &ParsedRobots, url: &Url) -> RobotsDecision {
        let crawl_delay = robots
            .crawl_delay(&self.token)
            .map(|d| d.min(self.max_crawl_delay))
            .unwrap_or(Duration::ZERO);

        RobotsDecision {
            allowed: robots.is_allowed(url.as_str(), &self.token),
            crawl_delay,
        }
    }
}
