//! Robots.txt handling module
//!
//! This module provides functionality for fetching, parsing, and caching robots.txt files.
//! Fetching fails open: a missing, unreachable or unreadable file allows everything.

mod cache;
mod parser;

use crate::crawler::read_body_limited;

pub use cache::{CachedRobots, RobotsCache, RobotsDecision};
pub use parser::ParsedRobots;

/// Upper bound on robots.txt bodies
const MAX_ROBOTS_BYTES: usize = 512 * 1024;

/// Fetches and parses robots.txt for an origin
///
/// # Arguments
///
/// * `client` - HTTP client to use
/// * `origin` - `scheme://host[:port]` of the site
/// * `user_agent` - User-Agent header value
///
/// # Returns
///
/// The parsed file, or [`ParsedRobots::allow_all`] on any network error,
/// non-2xx status or unreadable body.
pub async fn fetch_robots(
    client: &reqwest::Client,
    origin: &str,
    user_agent: &str,
) -> ParsedRobots {
    let robots_url = format!("{}/robots.txt", origin.trim_end_matches('/'));

    let response = match client
        .get(&robots_url)
        .header(reqwest::header::USER_AGENT, user_agent)
        .send()
        .await
    {
        Ok(response) => response,
        Err(e) => {
            tracing::debug!("robots.txt unreachable at {}: {}", robots_url, e);
            return ParsedRobots::allow_all();
        }
    };

    if !response.status().is_success() {
        tracing::debug!(
            "robots.txt at {} returned {}, allowing all",
            robots_url,
            response.status()
        );
        return ParsedRobots::allow_all();
    }

    match read_body_limited(response, MAX_ROBOTS_BYTES).await {
        Ok(body) => {
            tracing::debug!("Loaded robots.txt from {} ({} bytes)", robots_url, body.len());
            ParsedRobots::from_content(&body)
        }
        Err(e) => {
            tracing::warn!("robots.txt at {} ignored: {}", robots_url, e);
            ParsedRobots::allow_all()
        }
    }
}
