//! Configuration module for sitesignal
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every section is optional; an empty file yields the built-in defaults.
//!
//! # Example
//!
//! ```no_run
//! use sitesignal::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("sitesignal.toml")).unwrap();
//! println!("Crawler will sample up to {} pages", config.crawler.max_pages);
//! ```

mod lexicon;
mod parser;
mod types;
mod validation;

// Re-export types
pub use lexicon::Lexicon;
pub use types::{Config, CrawlerConfig, ProxyConfig, RenderConfig, UserAgentConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
pub(crate) use validation::{validate_proxy_pool, validate_user_agent_pool};
