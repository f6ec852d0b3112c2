//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the session loop that coordinates all aspects of one
//! domain crawl, including:
//! - Validating the request and checking robots.txt for the seed
//! - Managing the frontier and the page budget
//! - Coordinating rate limiting, fetching, block detection and rendering
//! - Parsing, signal extraction and link classification
//! - Downloading linked documents once the page loop ends
//! - Aggregating the final summary

use crate::config::Config;
use crate::crawler::detector::looks_blocked;
use crate::crawler::fetcher::Fetcher;
use crate::crawler::files::download_file;
use crate::crawler::identity::infer_company_name;
use crate::crawler::limiter::RateLimiter;
use crate::crawler::links::{classify, LinkPriority};
use crate::crawler::parser::parse_html;
use crate::crawler::render::{render_fallback, RenderOptions, Renderer};
use crate::crawler::scheduler::FrontierEntry;
use crate::crawler::signals::SignalExtractor;
use crate::crawler::FetchFailure;
use crate::output::{DomainSummary, FileRecord, PageRecord};
use crate::robots::RobotsCache;
use crate::state::{AbortReason, CrawlRequest, CrawlSession};
use crate::url::extract_domain;
use crate::CrawlError;
use chrono::Utc;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Result of processing one frontier entry
#[derive(Debug)]
pub enum PageOutcome {
    /// The page was fetched and parsed
    Parsed(PageRecord),
    /// The page could not be used; the reason goes to the crawl log
    SoftFailed(String),
    /// The session cannot continue
    Fatal(CrawlError),
}

/// Per-session resources
struct SessionRun {
    session: CrawlSession,
    fetcher: Fetcher,
    limiter: RateLimiter,
    robots: Option<RobotsCache>,
    render_enabled: bool,
}

/// Main crawler coordinator structure
///
/// A coordinator can run any number of sessions one after another; nothing is
/// shared between sessions except the configuration and the renderer.
pub struct Coordinator {
    config: Arc<Config>,
    renderer: Arc<dyn Renderer>,
    extractor: SignalExtractor,
    render_options: RenderOptions,
    screenshot_dir: Option<PathBuf>,
}

fn default_renderer() -> Arc<dyn Renderer> {
    #[cfg(feature = "browser")]
    {
        Arc::new(crate::crawler::render::ChromiumRenderer::new())
    }
    #[cfg(not(feature = "browser"))]
    {
        Arc::new(crate::crawler::render::NoopRenderer)
    }
}

/// Returns the longest prefix of `s` with at most `max` characters
fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((index, _)) => &s[..index],
        None => s,
    }
}

impl Coordinator {
    /// Creates a coordinator with the default renderer
    ///
    /// The default is headless Chromium with the `browser` feature and
    /// [`NoopRenderer`](crate::crawler::NoopRenderer) otherwise.
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Successfully created coordinator
    /// * `Err(CrawlError)` - The configuration is invalid
    pub fn new(config: Config) -> Result<Self, CrawlError> {
        Self::with_renderer(config, default_renderer())
    }

    /// Creates a coordinator with an explicit renderer
    pub fn with_renderer(config: Config, renderer: Arc<dyn Renderer>) -> Result<Self, CrawlError> {
        crate::config::validate(&config)?;
        let extractor = SignalExtractor::new(&config.lexicon)?;
        let render_options = RenderOptions::from_config(&config.render);
        let screenshot_dir = config.render.screenshot_dir.as_ref().map(PathBuf::from);

        Ok(Self {
            config: Arc::new(config),
            renderer,
            extractor,
            render_options,
            screenshot_dir,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Runs one crawl session
    ///
    /// # Returns
    ///
    /// * `Ok(DomainSummary)` - The session finished (completed or aborted)
    /// * `Err(CrawlError::InvalidInput)` - The request cannot start a session
    pub async fn crawl(&self, request: &CrawlRequest) -> Result<DomainSummary, CrawlError> {
        let start_url = request.validate()?;
        let crawler = &self.config.crawler;

        let fetcher = Fetcher::new(
            crawler,
            request.user_agent_pool.clone(),
            self.config.user_agent.rotate,
            &request.proxy_pool,
        )?;
        let robots = request.obey_robots.then(|| {
            RobotsCache::new(
                self.config.user_agent.robots_token.clone(),
                Duration::from_millis(crawler.max_crawl_delay_ms),
            )
        });

        let mut run = SessionRun {
            session: CrawlSession::new(request, start_url.clone()),
            fetcher,
            limiter: RateLimiter::new(crawler),
            robots,
            render_enabled: request.render_fallback_enabled,
        };

        tracing::info!(
            "Starting crawl of {} (max {} pages, depth {})",
            start_url,
            request.max_pages,
            request.depth_limit
        );
        let started = std::time::Instant::now();

        if let Some(cache) = run.robots.as_mut() {
            let decision = cache
                .resolve(run.fetcher.client(), run.fetcher.user_agent(), &start_url)
                .await;
            if !decision.allowed {
                tracing::warn!("Start URL {} disallowed by robots.txt, aborting", start_url);
                run.session.abort(
                    AbortReason::RobotsDisallowed,
                    "start URL disallowed by robots.txt",
                );
                return Ok(DomainSummary::from_session(run.session, &self.config.lexicon));
            }
        }

        run.session.enqueue(start_url, 0, LinkPriority::Normal);

        while run.session.has_budget() {
            let Some(entry) = run.session.next_entry() else {
                tracing::debug!("Frontier is empty");
                break;
            };

            match self.process_entry(&mut run, &entry).await {
                PageOutcome::Parsed(record) => {
                    run.session.record_parsed(&entry.url, record)?;
                }
                PageOutcome::SoftFailed(reason) => {
                    tracing::warn!("Soft failure for {}: {}", entry.url, reason);
                    run.session.record_soft_failure(&entry.url, reason)?;
                }
                PageOutcome::Fatal(e) => return Err(e),
            }
        }

        self.download_files(&mut run).await;

        tracing::info!(
            "Crawl of {} completed: {} pages parsed, {} failed, {} attempted, {} files in {:?}",
            run.session.domain,
            run.session.results.len(),
            run.session.soft_failed,
            run.session.pages_attempted,
            run.session.files.len(),
            started.elapsed()
        );

        Ok(DomainSummary::from_session(run.session, &self.config.lexicon))
    }

    /// Downloads the first `max-files` distinct documents linked from parsed
    /// pages
    ///
    /// Downloads go through robots.txt and the rate limiter like pages do,
    /// but do not consume the page budget.
    async fn download_files(&self, run: &mut SessionRun) {
        let urls: Vec<Url> = {
            let mut seen = HashSet::new();
            run.session
                .results
                .iter()
                .flat_map(|r| r.file_links.iter())
                .filter(|link| seen.insert(link.as_str()))
                .filter_map(|link| Url::parse(link).ok())
                .take(self.config.crawler.max_files)
                .collect()
        };

        for url in urls {
            let domain = extract_domain(&url).unwrap_or_else(|| run.session.domain.clone());

            if let Some(cache) = run.robots.as_mut() {
                let decision = cache
                    .resolve(run.fetcher.client(), run.fetcher.user_agent(), &url)
                    .await;
                if !decision.allowed {
                    run.session
                        .files
                        .push(FileRecord::failed(url.as_str(), "disallowed by robots.txt"));
                    continue;
                }
                run.limiter.set_crawl_delay(&domain, decision.crawl_delay);
            }

            run.limiter.wait(&domain).await;
            let record = download_file(&run.fetcher, &url).await;
            run.session.files.push(record);
        }
    }

    /// Processes a single frontier entry
    ///
    /// This method:
    /// 1. Moves the entry to `Fetching` and checks robots.txt
    /// 2. Waits on the rate limiter and consumes budget
    /// 3. Fetches the page, with the render fallback for blocked pages
    /// 4. Parses it, extracts signals and enqueues internal links
    async fn process_entry(&self, run: &mut SessionRun, entry: &FrontierEntry) -> PageOutcome {
        let url = &entry.url;
        if let Err(e) = run.session.begin(url) {
            return PageOutcome::Fatal(e);
        }

        let domain = extract_domain(url).unwrap_or_else(|| run.session.domain.clone());

        if let Some(cache) = run.robots.as_mut() {
            let decision = cache
                .resolve(run.fetcher.client(), run.fetcher.user_agent(), url)
                .await;
            if !decision.allowed {
                return PageOutcome::SoftFailed("disallowed by robots.txt".to_string());
            }
            run.limiter.set_crawl_delay(&domain, decision.crawl_delay);
        }

        let waited = run.limiter.wait(&domain).await;
        tracing::debug!("Waited {:?} before fetching {}", waited, url);
        run.session.charge_attempt();

        let mut result = run.fetcher.fetch(url).await;

        if result.raw_html.as_deref().is_some_and(looks_blocked) {
            if !run.render_enabled {
                return PageOutcome::SoftFailed(FetchFailure::Blocked.to_string());
            }
            tracing::info!("{} looks blocked, trying render fallback", url);
            result = render_fallback(
                self.renderer.as_ref(),
                url,
                &self.render_options,
                self.screenshot_dir.as_deref(),
            )
            .await;
        }

        if let Some(failure) = &result.failure {
            return PageOutcome::SoftFailed(failure.to_string());
        }
        let Some(html) = result.raw_html.as_deref() else {
            return PageOutcome::SoftFailed("no body".to_string());
        };

        let base = Url::parse(&result.final_url).unwrap_or_else(|_| url.clone());
        let parsed = match parse_html(html, &base) {
            Ok(parsed) => parsed,
            Err(e) => return PageOutcome::SoftFailed(format!("parse error: {}", e)),
        };

        let crawler = &self.config.crawler;
        let signals = self
            .extractor
            .extract(truncate_chars(&parsed.text, crawler.signal_text_chars));
        let company_name = infer_company_name(&parsed, &run.session.domain);
        let links = classify(
            &parsed.links,
            &run.session.start_url,
            &self.config.lexicon,
            crawler.include_subdomains,
        );

        let child_depth = entry.depth + 1;
        let mut queued = 0;
        if child_depth <= run.session.depth_limit {
            for link in &links.internal {
                if run.session.enqueue(link.url.clone(), child_depth, link.priority) {
                    queued += 1;
                }
            }
        }

        tracing::info!(
            "Crawled {} (depth {}, {:?}, {} words, {} new links)",
            url,
            entry.depth,
            result.fetch_method,
            parsed.word_count,
            queued
        );

        PageOutcome::Parsed(PageRecord {
            url: url.to_string(),
            depth: entry.depth,
            internal_links: links.internal_urls(),
            external_links: links.external,
            file_links: links.files,
            text_sample: truncate_chars(&parsed.text, crawler.text_sample_chars).to_string(),
            fetched_at: Utc::now(),
            fetch_method: result.fetch_method,
            status_code: result.status_code,
            business_signals: signals,
            company_name,
            title: parsed.title,
            meta_description: parsed.meta_description,
            canonical: parsed.canonical,
            headings: parsed.headings,
            language: parsed.language,
            hreflang: parsed.hreflang,
            schema_types: parsed.schema_types,
            images: parsed.images,
            social: parsed.social,
            word_count: parsed.word_count,
        })
    }
}

/// Runs a complete crawl session with a fresh coordinator
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `request` - What to crawl
///
/// # Example
///
/// ```no_run
/// use sitesignal::config::Config;
/// use sitesignal::state::CrawlRequest;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Config::default();
/// let request = CrawlRequest::from_config("https://example.com", &config);
/// let summary = sitesignal::crawl(config, &request).await?;
/// println!("{}: {} pages", summary.company_name, summary.pages_crawled);
/// # Ok(())
/// # }
/// ```
pub async fn crawl(config: Config, request: &CrawlRequest) -> Result<DomainSummary, CrawlError> {
    Coordinator::new(config)?.crawl(request).await
}
