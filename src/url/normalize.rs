use crate::UrlError;
use url::Url;

/// List of tracking query parameters to remove during normalization
const TRACKING_PARAMS: &[&str] = &["fbclid", "gclid", "mc_eid", "ref", "source"];

/// Reference schemes that never point at a crawlable page
const REJECTED_PREFIXES: &[&str] = &["javascript:", "mailto:", "tel:", "data:"];

/// Normalizes a raw link into the canonical form used for deduplication
///
/// # Normalization Steps
///
/// 1. Reject empty input and `javascript:`/`mailto:`/`tel:`/`data:` references
/// 2. Resolve against `base`, or default a missing scheme to `https`
/// 3. Reject any scheme other than http/https and URLs without a host
/// 4. Remove the fragment
/// 5. Collapse empty and dot path segments, drop a trailing slash except `/`
/// 6. Remove tracking query parameters (`utm_*`, `fbclid`, `gclid`, ...)
/// 7. Sort the remaining query pairs; drop an empty query
///
/// The scheme is left as found and `www.` is kept: both are meaningful to the
/// server being crawled.
///
/// # Arguments
///
/// * `raw` - The link as it appeared in the page or request
/// * `base` - The page the link was found on, if any
///
/// # Examples
///
/// ```
/// use sitesignal::url::normalize;
///
/// let url = normalize("HTTPS://Example.COM/about/?utm_source=x#team", None).unwrap();
/// assert_eq!(url.as_str(), "https://example.com/about");
/// ```
pub fn normalize(raw: &str, base: Option<&Url>) -> Result<Url, UrlError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let lowered = trimmed.to_ascii_lowercase();
    if let Some(prefix) = REJECTED_PREFIXES.iter().find(|p| lowered.starts_with(*p)) {
        return Err(UrlError::InvalidScheme(prefix.trim_end_matches(':').to_string()));
    }

    let mut url = match base {
        Some(base) => base.join(trimmed),
        None if trimmed.starts_with("//") => Url::parse(&format!("https:{}", trimmed)),
        None if !trimmed.contains("://") => Url::parse(&format!("https://{}", trimmed)),
        None => Url::parse(trimmed),
    }
    .map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    let host = match url.host_str() {
        Some(host) if !host.is_empty() => host.to_lowercase(),
        _ => return Err(UrlError::MissingDomain),
    };
    if url.host_str() != Some(host.as_str()) {
        url.set_host(Some(&host))
            .map_err(|e| UrlError::Parse(e.to_string()))?;
    }

    url.set_fragment(None);

    let path = normalize_path(url.path());
    url.set_path(&path);

    if url.query().is_some() {
        let params = filter_and_sort_query_params(&url);
        if params.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(params);
        }
    }

    Ok(url)
}

/// Collapses empty and dot segments and removes a trailing slash
fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }

    if segments.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", segments.join("/"))
    }
}

/// Filters out tracking parameters and sorts the remaining pairs
fn filter_and_sort_query_params(url: &Url) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !is_tracking_param(key))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    params.sort();
    params
}

fn is_tracking_param(key: &str) -> bool {
    key.starts_with("utm_") || TRACKING_PARAMS.contains(&key)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(raw: &str) -> String {
        normalize(raw, None).unwrap().to_string()
    }

    #[test]
    fn test_scheme_is_preserved() {
        assert_eq!(norm("http://example.com/page"), "http://example.com/page");
        assert_eq!(norm("https://example.com/page"), "https://example.com/page");
    }

    #[test]
    fn test_missing_scheme_defaults_to_https() {
        assert_eq!(norm("example.com/about"), "https://example.com/about");
        assert_eq!(norm("//example.com/about"), "https://example.com/about");
    }

    #[test]
    fn test_www_is_kept() {
        assert_eq!(norm("https://www.example.com/"), "https://www.example.com/");
    }

    #[test]
    fn test_remove_trailing_slash() {
        assert_eq!(norm("https://example.com/page/"), "https://example.com/page");
        assert_eq!(norm("https://example.com/"), "https://example.com/");
        assert_eq!(norm("https://example.com"), "https://example.com/");
    }

    #[test]
    fn test_remove_fragment() {
        assert_eq!(norm("https://example.com/page#section"), "https://example.com/page");
    }

    #[test]
    fn test_tracking_params_and_sorting() {
        assert_eq!(
            norm("https://example.com/page?keep=yes&utm_medium=email&another=value&fbclid=123"),
            "https://example.com/page?another=value&keep=yes"
        );
        assert_eq!(
            norm("https://example.com/page?utm_source=a&gclid=c&ref=home"),
            "https://example.com/page"
        );
        assert_eq!(norm("https://example.com/page?"), "https://example.com/page");
    }

    #[test]
    fn test_lowercase_host_keeps_path_case() {
        assert_eq!(norm("https://EXAMPLE.COM/Page"), "https://example.com/Page");
    }

    #[test]
    fn test_path_segments_collapsed() {
        assert_eq!(
            norm("https://example.com///path//to/./page/../final"),
            "https://example.com/path/to/final"
        );
        assert_eq!(norm("https://example.com/../page"), "https://example.com/page");
    }

    #[test]
    fn test_relative_resolution() {
        let base = Url::parse("https://example.com/products/widgets").unwrap();
        assert_eq!(
            normalize("../about#team", Some(&base)).unwrap().as_str(),
            "https://example.com/about"
        );
        assert_eq!(
            normalize("pricing", Some(&base)).unwrap().as_str(),
            "https://example.com/products/pricing"
        );
        assert_eq!(
            normalize("https://other.org/x", Some(&base)).unwrap().as_str(),
            "https://other.org/x"
        );
    }

    #[test]
    fn test_rejected_references() {
        for raw in [
            "javascript:void(0)",
            "MAILTO:hello@example.com",
            "tel:+123456",
            "data:text/plain,hi",
        ] {
            assert!(
                matches!(normalize(raw, None), Err(UrlError::InvalidScheme(_))),
                "{} should be rejected",
                raw
            );
        }
    }

    #[test]
    fn test_rejected_after_resolution() {
        assert!(matches!(
            normalize("ftp://example.com/file", None),
            Err(UrlError::InvalidScheme(_))
        ));
    }

    #[test]
    fn test_empty_and_malformed() {
        assert_eq!(normalize("   ", None), Err(UrlError::Empty));
        assert!(normalize("not a url", None).is_err());
        assert!(normalize("https://", None).is_err());
    }

    #[test]
    fn test_idempotent() {
        for raw in [
            "HTTP://Example.com/a/b/../c/?z=1&a=two words&utm_campaign=x#frag",
            "https://example.com/caf%C3%A9/?q=a%2Bb",
            "example.com",
            "https://shop.example.co.uk:8443/cart/?b=2&a=1&a=0",
        ] {
            let once = normalize(raw, None).unwrap();
            let twice = normalize(once.as_str(), None).unwrap();
            assert_eq!(once, twice, "normalization of {} is not idempotent", raw);
        }
    }
}
