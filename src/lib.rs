//! Sitesignal: a polite business-signal domain crawler
//!
//! This crate samples pages from a single target domain, respecting robots.txt
//! and rate limits, falls back to a headless render for bot-protected pages, and
//! aggregates identity, metadata, link graph and keyword evidence into a
//! [`DomainSummary`](output::DomainSummary).

pub mod config;
pub mod crawler;
pub mod output;
pub mod robots;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for sitesignal operations
///
/// Per-page problems never surface here; they are recorded as soft failures in
/// the crawl log. Only conditions that prevent a session from starting (or a
/// broken internal invariant) are reported through this type.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Invalid state transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::EntryState,
        to: state::EntryState,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("Empty URL")]
    Empty,
}

/// Result type alias for sitesignal operations
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::{Config, Lexicon};
pub use crawler::{crawl, Coordinator};
pub use output::DomainSummary;
pub use state::{CrawlRequest, EntryState};
pub use crate::url::{is_same_domain, normalize, registrable_domain};
