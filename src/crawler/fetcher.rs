//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients (one per proxy) with browser-like headers
//! - Per-request user agent selection
//! - Retry with exponential backoff on 429/5xx, timeouts and connect errors
//! - A single certificate-lenient retry on TLS failures, when allowed
//! - Content-Type and body size checks
//! - Error classification into [`FetchFailure`]

use crate::config::CrawlerConfig;
use crate::CrawlError;
use rand::Rng;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, USER_AGENT};
use reqwest::{redirect::Policy, Client, Response, StatusCode};
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;
use url::Url;

/// Error-chain fragments that identify a TLS failure
const TLS_MARKERS: &[&str] = &["certificate", "tls", "ssl", "handshake"];

/// Statuses whose bodies are still read so challenge pages can be detected
const CHALLENGE_STATUSES: &[u16] = &[403, 429, 503];

/// How a page's HTML was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchMethod {
    Http,
    Rendered,
    None,
}

/// Per-page soft failure taxonomy
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchFailure {
    #[error("request timed out")]
    Timeout,

    #[error("network error: {0}")]
    Network(String),

    #[error("HTTP status {0}")]
    HttpStatus(u16),

    #[error("TLS error: {0}")]
    Tls(String),

    #[error("non-HTML content type: {0}")]
    NonHtml(String),

    #[error("response body exceeds {0} bytes")]
    TooLarge(usize),

    #[error("blocked by bot protection")]
    Blocked,

    #[error("render fallback failed: {0}")]
    Render(String),
}

/// Result of fetching one URL
#[derive(Debug, Clone)]
pub struct PageFetchResult {
    /// The URL that was requested
    pub url: String,

    /// URL after redirects
    pub final_url: String,

    pub status_code: Option<u16>,

    pub content_type: Option<String>,

    /// Body, when one was read (also for challenge statuses)
    pub raw_html: Option<String>,

    pub fetch_method: FetchMethod,

    pub failure: Option<FetchFailure>,
}

impl PageFetchResult {
    /// Creates a failed result with no body
    pub fn failed(url: &Url, failure: FetchFailure) -> Self {
        Self {
            url: url.to_string(),
            final_url: url.to_string(),
            status_code: None,
            content_type: None,
            raw_html: None,
            fetch_method: FetchMethod::None,
            failure: Some(failure),
        }
    }

    /// Returns true when usable HTML was obtained
    pub fn is_success(&self) -> bool {
        self.failure.is_none() && self.fetch_method != FetchMethod::None && self.raw_html.is_some()
    }
}

/// A downloaded document
#[derive(Debug, Clone)]
pub struct FetchedFile {
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// HTTP fetcher shared by one crawl session
#[derive(Debug)]
pub struct Fetcher {
    /// One client per proxy (a single direct client when the pool is empty)
    clients: Vec<Client>,
    /// Certificate-lenient twins of `clients`; empty unless allowed
    insecure_clients: Vec<Client>,
    user_agents: Vec<String>,
    rotate_user_agent: bool,
    next_client: AtomicUsize,
    max_retries: u32,
    backoff_base: Duration,
    backoff_max: Duration,
    max_body_bytes: usize,
    max_file_bytes: usize,
}

impl Fetcher {
    /// Builds a fetcher
    ///
    /// # Arguments
    ///
    /// * `config` - Crawler timeouts, retry and size limits
    /// * `user_agents` - Non-empty User-Agent pool
    /// * `rotate_user_agent` - Pick a random pool entry per request
    /// * `proxies` - Proxy URLs used round-robin
    ///
    /// # Returns
    ///
    /// * `Ok(Fetcher)` - Ready to fetch
    /// * `Err(CrawlError)` - A client could not be built (bad proxy URL, TLS backend)
    pub fn new(
        config: &CrawlerConfig,
        user_agents: Vec<String>,
        rotate_user_agent: bool,
        proxies: &[String],
    ) -> Result<Self, CrawlError> {
        if user_agents.is_empty() {
            return Err(CrawlError::InvalidInput(
                "user agent pool cannot be empty".to_string(),
            ));
        }

        let proxies: Vec<Option<&str>> = if proxies.is_empty() {
            vec![None]
        } else {
            proxies.iter().map(|p| Some(p.as_str())).collect()
        };

        let clients = proxies
            .iter()
            .map(|proxy| build_http_client(config, *proxy, false))
            .collect::<Result<Vec<_>, _>>()?;

        let insecure_clients = if config.allow_insecure_tls {
            proxies
                .iter()
                .map(|proxy| build_http_client(config, *proxy, true))
                .collect::<Result<Vec<_>, _>>()?
        } else {
            Vec::new()
        };

        Ok(Self {
            clients,
            insecure_clients,
            user_agents,
            rotate_user_agent,
            next_client: AtomicUsize::new(0),
            max_retries: config.max_retries,
            backoff_base: Duration::from_millis(config.backoff_base_ms),
            backoff_max: Duration::from_millis(config.backoff_max_ms),
            max_body_bytes: config.max_body_bytes,
            max_file_bytes: config.max_file_bytes,
        })
    }

    /// Client for auxiliary requests such as robots.txt
    pub fn client(&self) -> &Client {
        &self.clients[self.next_client.load(Ordering::Relaxed) % self.clients.len()]
    }

    /// Picks the User-Agent header for the next request
    pub fn user_agent(&self) -> &str {
        if self.rotate_user_agent && self.user_agents.len() > 1 {
            let index = rand::thread_rng().gen_range(0..self.user_agents.len());
            &self.user_agents[index]
        } else {
            &self.user_agents[0]
        }
    }

    /// Fetches a URL
    ///
    /// Never fails: every problem is reported through
    /// [`PageFetchResult::failure`] with `fetch_method = None`.
    pub async fn fetch(&self, url: &Url) -> PageFetchResult {
        let index = self.next_client.fetch_add(1, Ordering::Relaxed) % self.clients.len();
        let user_agent = self.user_agent().to_string();

        let response = match self
            .send_with_retry(&self.clients[index], url, &user_agent)
            .await
        {
            Ok(response) => response,
            Err(e) if is_tls_error(&e) => match self.insecure_clients.get(index) {
                Some(insecure) => {
                    tracing::warn!(
                        "TLS error for {}, retrying without certificate verification: {}",
                        url,
                        e
                    );
                    match self.send_with_retry(insecure, url, &user_agent).await {
                        Ok(response) => response,
                        Err(e) => return PageFetchResult::failed(url, classify_error(&e)),
                    }
                }
                None => return PageFetchResult::failed(url, FetchFailure::Tls(error_chain(&e))),
            },
            Err(e) => return PageFetchResult::failed(url, classify_error(&e)),
        };

        self.read_response(url, response).await
    }

    /// Downloads a linked document of any content type
    ///
    /// Uses the same retries and client rotation as [`Fetcher::fetch`], but
    /// bounds the body by `max-file-bytes` and keeps it as raw bytes.
    pub async fn fetch_file(&self, url: &Url) -> Result<FetchedFile, FetchFailure> {
        let index = self.next_client.fetch_add(1, Ordering::Relaxed) % self.clients.len();
        let user_agent = self.user_agent().to_string();

        let response = self
            .send_with_retry(&self.clients[index], url, &user_agent)
            .await
            .map_err(|e| classify_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchFailure::HttpStatus(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());
        let bytes = read_bytes_limited(response, self.max_file_bytes).await?;

        Ok(FetchedFile { content_type, bytes })
    }

    async fn send_with_retry(
        &self,
        client: &Client,
        url: &Url,
        user_agent: &str,
    ) -> Result<Response, reqwest::Error> {
        let mut attempt = 0;

        loop {
            let result = client
                .get(url.as_str())
                .header(USER_AGENT, user_agent)
                .send()
                .await;

            let retry_reason = match &result {
                Ok(response) if is_retryable_status(response.status()) => {
                    Some(format!("status {}", response.status()))
                }
                Err(e) if (e.is_timeout() || e.is_connect()) && !is_tls_error(e) => {
                    Some(e.to_string())
                }
                _ => None,
            };

            match retry_reason {
                Some(reason) if attempt < self.max_retries => {
                    let delay = self.backoff_delay(attempt);
                    tracing::debug!(
                        "Retrying {} in {:?} (attempt {}/{}): {}",
                        url,
                        delay,
                        attempt + 1,
                        self.max_retries,
                        reason
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                _ => return result,
            }
        }
    }

    /// Exponential backoff with ±25% jitter
    fn backoff_delay(&self, attempt: u32) -> Duration {
        let exp = self
            .backoff_base
            .saturating_mul(1u32 << attempt.min(16))
            .min(self.backoff_max);
        let jitter = rand::thread_rng().gen_range(0.75..=1.25);
        exp.mul_f64(jitter)
    }

    async fn read_response(&self, url: &Url, response: Response) -> PageFetchResult {
        let status = response.status();
        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());

        let mut result = PageFetchResult {
            url: url.to_string(),
            final_url,
            status_code: Some(status.as_u16()),
            content_type: content_type.clone(),
            raw_html: None,
            fetch_method: FetchMethod::None,
            failure: None,
        };

        if !(status.is_success() || status.is_redirection()) {
            if CHALLENGE_STATUSES.contains(&status.as_u16()) {
                result.raw_html = read_body_limited(response, self.max_body_bytes).await.ok();
            }
            result.failure = Some(FetchFailure::HttpStatus(status.as_u16()));
            return result;
        }

        let is_html = content_type
            .as_deref()
            .map(|ct| ct.to_lowercase().contains("html"))
            .unwrap_or(false);
        if !is_html {
            result.failure = Some(FetchFailure::NonHtml(
                content_type.unwrap_or_else(|| "unknown".to_string()),
            ));
            return result;
        }

        match read_body_limited(response, self.max_body_bytes).await {
            Ok(body) => {
                result.raw_html = Some(body);
                result.fetch_method = FetchMethod::Http;
            }
            Err(failure) => result.failure = Some(failure),
        }
        result
    }
}

/// Builds an HTTP client with browser-like default headers
///
/// # Arguments
///
/// * `config` - Timeouts come from here
/// * `proxy` - Route every request through this proxy
/// * `insecure` - Accept invalid certificates
pub fn build_http_client(
    config: &CrawlerConfig,
    proxy: Option<&str>,
    insecure: bool,
) -> Result<Client, reqwest::Error> {
    let timeout = Duration::from_millis(config.request_timeout_ms);

    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

    let mut builder = Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .redirect(Policy::limited(10))
        .default_headers(headers)
        .gzip(true)
        .brotli(true);

    if let Some(proxy) = proxy {
        builder = builder.proxy(reqwest::Proxy::all(proxy)?);
    }
    if insecure {
        builder = builder.danger_accept_invalid_certs(true);
    }

    builder.build()
}

fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Checks the whole error chain for TLS markers
fn is_tls_error(err: &reqwest::Error) -> bool {
    let chain = error_chain(err).to_lowercase();
    TLS_MARKERS.iter().any(|marker| chain.contains(marker))
}

/// Joins an error and its sources into one message
fn error_chain(err: &reqwest::Error) -> String {
    let mut parts = vec![err.to_string()];
    let mut source = std::error::Error::source(err);
    while let Some(e) = source {
        parts.push(e.to_string());
        source = e.source();
    }
    parts.join(": ")
}

fn classify_error(err: &reqwest::Error) -> FetchFailure {
    if err.is_timeout() {
        FetchFailure::Timeout
    } else if is_tls_error(err) {
        FetchFailure::Tls(error_chain(err))
    } else {
        FetchFailure::Network(error_chain(err))
    }
}

/// Reads a body, stopping as soon as it exceeds `limit`
pub(crate) async fn read_bytes_limited(
    mut response: Response,
    limit: usize,
) -> Result<Vec<u8>, FetchFailure> {
    if let Some(length) = response.content_length() {
        if length > limit as u64 {
            return Err(FetchFailure::TooLarge(limit));
        }
    }

    let mut body: Vec<u8> = Vec::new();
    loop {
        match response.chunk().await {
            Ok(Some(chunk)) => {
                if body.len() + chunk.len() > limit {
                    return Err(FetchFailure::TooLarge(limit));
                }
                body.extend_from_slice(&chunk);
            }
            Ok(None) => break,
            Err(e) => return Err(classify_error(&e)),
        }
    }

    Ok(body)
}

/// [`read_bytes_limited`], decoded as lossy UTF-8
pub(crate) async fn read_body_limited(
    response: Response,
    limit: usize,
) -> Result<String, FetchFailure> {
    let body = read_bytes_limited(response, limit).await?;
    Ok(String::from_utf8_lossy(&body).into_owned())
}
