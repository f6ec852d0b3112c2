use crate::config::lexicon::Lexicon;
use serde::Deserialize;

/// Main configuration structure for sitesignal
///
/// Every section is optional in the TOML file; missing sections fall back to
/// the defaults below.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default, rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub proxy: ProxyConfig,
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub lexicon: Lexicon,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Maximum number of page fetch attempts per session
    #[serde(rename = "max-pages")]
    pub max_pages: u32,

    /// Maximum link depth from the start URL
    #[serde(rename = "depth-limit")]
    pub depth_limit: u32,

    /// Whether robots.txt rules are honoured
    #[serde(rename = "obey-robots")]
    pub obey_robots: bool,

    /// Treat subdomains of the start domain as internal
    #[serde(rename = "include-subdomains")]
    pub include_subdomains: bool,

    /// Steady-state request rate per domain
    #[serde(rename = "requests-per-second")]
    pub requests_per_second: f64,

    /// Upper bound of the random delay added to every wait (milliseconds)
    #[serde(rename = "max-jitter-ms")]
    pub max_jitter_ms: u64,

    /// Upper bound applied to robots.txt Crawl-delay (milliseconds)
    #[serde(rename = "max-crawl-delay-ms")]
    pub max_crawl_delay_ms: u64,

    /// Per-request timeout (milliseconds)
    #[serde(rename = "request-timeout-ms")]
    pub request_timeout_ms: u64,

    /// Retries on 429/5xx and transient network errors
    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    /// Base delay of the exponential backoff (milliseconds)
    #[serde(rename = "backoff-base-ms")]
    pub backoff_base_ms: u64,

    /// Cap of the exponential backoff (milliseconds)
    #[serde(rename = "backoff-max-ms")]
    pub backoff_max_ms: u64,

    /// Responses larger than this are dropped
    #[serde(rename = "max-body-bytes")]
    pub max_body_bytes: usize,

    /// Linked documents downloaded per session (0 disables downloads)
    #[serde(rename = "max-files")]
    pub max_files: usize,

    /// Downloaded documents larger than this are dropped
    #[serde(rename = "max-file-bytes")]
    pub max_file_bytes: usize,

    /// Allow a single retry without certificate verification on TLS errors
    #[serde(rename = "allow-insecure-tls")]
    pub allow_insecure_tls: bool,

    /// Characters kept in `PageRecord::text_sample`
    #[serde(rename = "text-sample-chars")]
    pub text_sample_chars: usize,

    /// Characters of page text scanned for business signals
    #[serde(rename = "signal-text-chars")]
    pub signal_text_chars: usize,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_pages: 30,
            depth_limit: 3,
            obey_robots: true,
            include_subdomains: true,
            requests_per_second: 1.0,
            max_jitter_ms: 500,
            max_crawl_delay_ms: 30_000,
            request_timeout_ms: 15_000,
            max_retries: 3,
            backoff_base_ms: 500,
            backoff_max_ms: 8_000,
            max_body_bytes: 10 * 1024 * 1024,
            max_files: 10,
            max_file_bytes: 10 * 1024 * 1024,
            allow_insecure_tls: false,
            text_sample_chars: 2_000,
            signal_text_chars: 5_000,
        }
    }
}

/// User agent configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UserAgentConfig {
    /// Product token matched against robots.txt groups
    #[serde(rename = "robots-token")]
    pub robots_token: String,

    /// User-Agent header values; the first entry is used when rotation is off
    pub pool: Vec<String>,

    /// Pick a random pool entry for every request
    pub rotate: bool,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            robots_token: "SitesignalBot".to_string(),
            pool: vec![
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Safari/605.1.15".to_string(),
                "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0".to_string(),
            ],
            rotate: true,
        }
    }
}

/// Outbound proxy configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Proxy URLs, used round-robin (empty = direct connections)
    pub pool: Vec<String>,
}

/// Headless render fallback configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Retry bot-protected pages through the renderer
    pub enabled: bool,

    /// Navigation timeout (milliseconds)
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,

    #[serde(rename = "viewport-width")]
    pub viewport_width: u32,

    #[serde(rename = "viewport-height")]
    pub viewport_height: u32,

    /// Where screenshots of still-blocked renders are written (unset = none)
    #[serde(rename = "screenshot-dir")]
    pub screenshot_dir: Option<String>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            timeout_ms: 30_000,
            viewport_width: 1280,
            viewport_height: 800,
            screenshot_dir: None,
        }
    }
}
