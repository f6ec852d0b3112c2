use std::net::IpAddr;
use url::Url;

/// Second-level labels that form a public suffix together with their TLD
const MULTI_PART_SUFFIXES: &[&str] = &[
    "co.uk", "org.uk", "ac.uk", "gov.uk", "com.au", "net.au", "org.au", "co.nz", "co.jp",
    "co.in", "com.br", "com.mx", "co.za", "com.cn", "com.tr", "com.sg", "co.kr",
];

/// Extracts the lowercase host from a URL
///
/// # Examples
///
/// ```
/// use url::Url;
/// use sitesignal::url::extract_domain;
///
/// let url = Url::parse("https://Blog.Example.com:8080/post").unwrap();
/// assert_eq!(extract_domain(&url), Some("blog.example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Returns the registrable part of a host
///
/// The last two labels, or three when the last two form a known multi-part
/// suffix (`shop.acme.co.uk` -> `acme.co.uk`). IP literals are returned as is.
pub fn registrable_domain(host: &str) -> String {
    let host = host.trim_end_matches('.').to_lowercase();
    let bare = host.trim_start_matches('[').trim_end_matches(']');
    if bare.parse::<IpAddr>().is_ok() {
        return bare.to_string();
    }

    let labels: Vec<&str> = host.split('.').filter(|l| !l.is_empty()).collect();
    if labels.len() <= 2 {
        return labels.join(".");
    }

    let last_two = labels[labels.len() - 2..].join(".");
    let keep = if MULTI_PART_SUFFIXES.contains(&last_two.as_str()) {
        3
    } else {
        2
    };
    labels[labels.len().saturating_sub(keep)..].join(".")
}

/// Checks whether `candidate` belongs to the same site as `base`
///
/// With `include_subdomains`, registrable domains are compared; otherwise the
/// full hosts are compared with a leading `www.` ignored.
pub fn is_same_domain(base: &Url, candidate: &Url, include_subdomains: bool) -> bool {
    let (Some(a), Some(b)) = (extract_domain(base), extract_domain(candidate)) else {
        return false;
    };

    if include_subdomains {
        registrable_domain(&a) == registrable_domain(&b)
    } else {
        strip_www(&a) == strip_www(&b)
    }
}

/// Builds a display name from a domain (`acme-corp.co.uk` -> `Acme Corp`)
pub fn domain_label_name(domain: &str) -> String {
    let registrable = registrable_domain(domain);
    let label = registrable.split('.').next().unwrap_or_default();

    label
        .split(|c: char| c == '-' || c == '_')
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn strip_www(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}
