//! Crawl request and per-session state
//!
//! A [`CrawlSession`] is owned by exactly one coordinator run. It holds the
//! frontier, the visited set and everything recorded so far, and enforces the
//! page budget and frontier bounds.

use crate::config::{validate_proxy_pool, validate_user_agent_pool, Config};
use crate::crawler::{Frontier, FrontierEntry, LinkPriority};
use crate::output::{CrawlLogEntry, FileRecord, PageRecord};
use crate::state::{AbortReason, EntryState, SessionStatus};
use crate::url::extract_domain;
use crate::CrawlError;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use url::Url;

/// Frontier plus visited entries never exceed this multiple of the budget
const FRONTIER_FACTOR: usize = 3;

/// Input of one crawl session
#[derive(Debug, Clone)]
pub struct CrawlRequest {
    /// Seed URL; a missing scheme defaults to https
    pub start_url: String,

    /// Maximum number of page fetch attempts
    pub max_pages: u32,

    /// Maximum link depth from the seed (0 = seed only)
    pub depth_limit: u32,

    /// Whether robots.txt is consulted
    pub obey_robots: bool,

    /// User-Agent header values
    pub user_agent_pool: Vec<String>,

    /// Proxy URLs, used round-robin (empty = direct)
    pub proxy_pool: Vec<String>,

    /// Retry bot-protected pages through the renderer
    pub render_fallback_enabled: bool,
}

impl CrawlRequest {
    /// Builds a request for `start_url` with limits, pools and flags taken
    /// from the configuration
    pub fn from_config(start_url: impl Into<String>, config: &Config) -> Self {
        Self {
            start_url: start_url.into(),
            max_pages: config.crawler.max_pages,
            depth_limit: config.crawler.depth_limit,
            obey_robots: config.crawler.obey_robots,
            user_agent_pool: config.user_agent.pool.clone(),
            proxy_pool: config.proxy.pool.clone(),
            render_fallback_enabled: config.render.enabled,
        }
    }

    /// Checks the request and returns the normalized start URL
    ///
    /// # Returns
    ///
    /// * `Ok(Url)` - The normalized seed
    /// * `Err(CrawlError::InvalidInput)` - The request cannot start a session
    pub fn validate(&self) -> Result<Url, CrawlError> {
        if self.max_pages == 0 {
            return Err(CrawlError::InvalidInput(
                "max_pages must be greater than zero".to_string(),
            ));
        }

        validate_user_agent_pool(&self.user_agent_pool)
            .map_err(|e| CrawlError::InvalidInput(e.to_string()))?;
        validate_proxy_pool(&self.proxy_pool)
            .map_err(|e| CrawlError::InvalidInput(e.to_string()))?;

        crate::url::normalize(&self.start_url, None).map_err(|e| {
            CrawlError::InvalidInput(format!("invalid start URL '{}': {}", self.start_url, e))
        })
    }
}

/// State of one crawl session
#[derive(Debug)]
pub struct CrawlSession {
    pub start_url: Url,
    pub domain: String,
    pub max_pages: u32,
    pub depth_limit: u32,
    pub frontier: Frontier,
    pub visited: HashSet<String>,
    pub results: Vec<PageRecord>,
    pub errors: Vec<CrawlLogEntry>,

    /// Linked documents downloaded after the page loop
    pub files: Vec<FileRecord>,

    /// Fetch attempts so far; the page budget counts these
    pub pages_attempted: u32,

    /// Entries that ended in `SoftFailed`
    pub soft_failed: u32,

    pub status: SessionStatus,
    pub started_at: DateTime<Utc>,

    queued: HashSet<String>,
    entries: HashMap<String, EntryState>,
}

impl CrawlSession {
    /// Creates a session for a validated request and its normalized seed
    pub fn new(request: &CrawlRequest, start_url: Url) -> Self {
        let domain = extract_domain(&start_url).unwrap_or_default();

        Self {
            start_url,
            domain,
            max_pages: request.max_pages,
            depth_limit: request.depth_limit,
            frontier: Frontier::new(),
            visited: HashSet::new(),
            results: Vec::new(),
            errors: Vec::new(),
            files: Vec::new(),
            pages_attempted: 0,
            soft_failed: 0,
            status: SessionStatus::Completed,
            started_at: Utc::now(),
            queued: HashSet::new(),
            entries: HashMap::new(),
        }
    }

    /// Maximum of frontier plus visited entries
    pub fn frontier_cap(&self) -> usize {
        self.max_pages as usize * FRONTIER_FACTOR
    }

    /// Returns true while fetch attempts remain
    pub fn has_budget(&self) -> bool {
        self.pages_attempted < self.max_pages
    }

    pub fn is_visited(&self, url: &Url) -> bool {
        self.visited.contains(url.as_str())
    }

    /// Current state of an entry, if it was ever queued
    pub fn entry_state(&self, url: &Url) -> Option<EntryState> {
        self.entries.get(url.as_str()).copied()
    }

    /// Adds a URL to the frontier
    ///
    /// # Returns
    ///
    /// `true` if the URL was queued; `false` when it is over the depth limit,
    /// already queued or visited, or the frontier is full.
    pub fn enqueue(&mut self, url: Url, depth: u32, priority: LinkPriority) -> bool {
        if depth > self.depth_limit {
            return false;
        }

        let key = url.as_str().to_string();
        if self.queued.contains(&key) || self.visited.contains(&key) {
            return false;
        }

        if self.visited.len() + self.frontier.len() >= self.frontier_cap() {
            tracing::debug!("Frontier full, dropping {}", key);
            return false;
        }

        self.queued.insert(key.clone());
        self.entries.insert(key, EntryState::Queued);
        self.frontier.push(url, depth, priority);
        true
    }

    /// Pops the next entry that still needs fetching
    pub fn next_entry(&mut self) -> Option<FrontierEntry> {
        while let Some(entry) = self.frontier.pop() {
            if self.visited.contains(entry.url.as_str()) {
                tracing::debug!("Skipping already visited {}", entry.url);
                continue;
            }
            if entry.depth > self.depth_limit {
                tracing::debug!("Skipping {} beyond depth {}", entry.url, self.depth_limit);
                continue;
            }
            return Some(entry);
        }
        None
    }

    /// Marks an entry visited and moves it to `Fetching`
    pub fn begin(&mut self, url: &Url) -> Result<(), CrawlError> {
        self.advance(url, EntryState::Fetching)?;
        self.visited.insert(url.as_str().to_string());
        Ok(())
    }

    /// Consumes one unit of the page budget
    pub fn charge_attempt(&mut self) {
        self.pages_attempted += 1;
    }

    /// Stores a parsed page and moves its entry to `Parsed`
    pub fn record_parsed(&mut self, url: &Url, record: PageRecord) -> Result<(), CrawlError> {
        self.advance(url, EntryState::Parsed)?;
        self.results.push(record);
        Ok(())
    }

    /// Logs a soft failure and moves the entry to `SoftFailed`
    pub fn record_soft_failure(
        &mut self,
        url: &Url,
        error: impl Into<String>,
    ) -> Result<(), CrawlError> {
        self.advance(url, EntryState::SoftFailed)?;
        self.soft_failed += 1;
        self.errors.push(CrawlLogEntry {
            page: url.to_string(),
            error: error.into(),
        });
        Ok(())
    }

    /// Stops the session before any fetch
    pub fn abort(&mut self, reason: AbortReason, message: impl Into<String>) {
        self.status = SessionStatus::Aborted(reason);
        self.errors.push(CrawlLogEntry {
            page: self.start_url.to_string(),
            error: message.into(),
        });
    }

    fn advance(&mut self, url: &Url, to: EntryState) -> Result<(), CrawlError> {
        let key = url.as_str();
        let from = self.entries.get(key).copied().unwrap_or(EntryState::Queued);
        let next = from.transition(to)?;
        self.entries.insert(key.to_string(), next);
        Ok(())
    }
}
