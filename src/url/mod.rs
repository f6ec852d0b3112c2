//! URL handling module for sitesignal
//!
//! This module provides URL normalization, host extraction and same-site
//! comparison used by the frontier and the link classifier.

mod domain;
mod normalize;

// Re-export main functions
pub use domain::{domain_label_name, extract_domain, is_same_domain, registrable_domain};
pub use normalize::normalize;

use url::Url;

/// Returns `scheme://host[:port]` for a URL
///
/// Robots files and rate limits are tracked per origin.
pub fn origin_key(url: &Url) -> String {
    url.origin().ascii_serialization()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_key() {
        let url = Url::parse("https://example.com/a/b?c=d").unwrap();
        assert_eq!(origin_key(&url), "https://example.com");

        let url = Url::parse("http://127.0.0.1:8080/robots.txt").unwrap();
        assert_eq!(origin_key(&url), "http://127.0.0.1:8080");
    }
}
