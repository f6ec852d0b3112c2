//! Link classification into internal, external and downloadable files

use crate::config::Lexicon;
use crate::crawler::parser::RawLink;
use crate::url::is_same_domain;
use serde::Serialize;
use std::collections::HashSet;
use url::Url;

/// Path extensions treated as downloadable files rather than pages
const FILE_EXTENSIONS: &[&str] = &[
    "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "odt", "ods", "odp", "rtf", "csv",
    "txt", "zip", "rar", "7z", "tar", "gz", "tgz", "jpg", "jpeg", "png", "gif", "svg", "webp",
    "bmp", "ico", "mp3", "wav", "ogg", "mp4", "mov", "avi", "webm", "mkv",
];

/// Crawl priority of an internal link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkPriority {
    Normal,
    Important,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InternalLink {
    pub url: Url,
    pub priority: LinkPriority,
}

/// Links of one page, split by destination
#[derive(Debug, Clone, Default)]
pub struct ClassifiedLinks {
    pub internal: Vec<InternalLink>,
    pub external: Vec<String>,
    pub files: Vec<String>,
}

impl ClassifiedLinks {
    pub fn internal_urls(&self) -> Vec<String> {
        self.internal.iter().map(|l| l.url.to_string()).collect()
    }
}

fn is_file(url: &Url) -> bool {
    let last = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or_default();

    match last.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => {
            FILE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str())
        }
        _ => false,
    }
}

/// Classifies raw anchors found on `base`
///
/// Exclusion is checked on the path and the anchor text and always wins;
/// importance is decided from the path alone.
pub fn classify(
    links: &[RawLink],
    base: &Url,
    lexicon: &Lexicon,
    include_subdomains: bool,
) -> ClassifiedLinks {
    let mut classified = ClassifiedLinks::default();
    let mut seen: HashSet<&str> = HashSet::new();

    for link in links {
        if !seen.insert(link.url.as_str()) {
            continue;
        }

        if is_file(&link.url) {
            classified.files.push(link.url.to_string());
            continue;
        }

        if !is_same_domain(base, &link.url, include_subdomains) {
            classified.external.push(link.url.to_string());
            continue;
        }

        let path = link.url.path().to_lowercase();
        let haystack = format!("{} {}", path, link.text.to_lowercase());
        if lexicon.is_excluded(&haystack) {
            tracing::debug!("Excluded internal link {}", link.url);
            continue;
        }

        let priority = if lexicon.is_important(&path) {
            LinkPriority::Important
        } else {
            LinkPriority::Normal
        };
        classified.internal.push(InternalLink {
            url: link.url.clone(),
            priority,
        });
    }

    classified
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(href: &str, text: &str) -> RawLink {
        RawLink {
            url: Url::parse(href).unwrap(),
            text: text.to_string(),
        }
    }

    fn base() -> Url {
        Url::parse("https://acme.com/").unwrap()
    }

    #[test]
    fn test_split_by_destination() {
        let links = vec![
            link("https://acme.com/about", "About us"),
            link("https://acme.com/blog/post", "Read"),
            link("https://other.org/", "Other"),
            link("https://acme.com/files/Brochure.PDF", "Brochure"),
            link("https://cdn.other.org/logo.png", "Logo"),
        ];
        let classified = classify(&links, &base(), &Lexicon::default(), true);

        assert_eq!(
            classified.internal_urls(),
            vec!["https://acme.com/about", "https://acme.com/blog/post"]
        );
        assert_eq!(classified.internal[0].priority, LinkPriority::Important);
        assert_eq!(classified.internal[1].priority, LinkPriority::Normal);
        assert_eq!(classified.external, vec!["https://other.org/"]);
        assert_eq!(
            classified.files,
            vec!["https://acme.com/files/Brochure.PDF", "https://cdn.other.org/logo.png"]
        );
    }

    #[test]
    fn test_exclusion_beats_importance() {
        let links = vec![
            link("https://acme.com/careers/about", "About careers"),
            link("https://acme.com/pricing", "Privacy notice"),
        ];
        let classified = classify(&links, &base(), &Lexicon::default(), true);
        assert!(classified.internal.is_empty());
    }

    #[test]
    fn test_subdomains() {
        let links = vec![link("https://blog.acme.com/post", "Post")];
        let with = classify(&links, &base(), &Lexicon::default(), true);
        assert_eq!(with.internal.len(), 1);

        let without = classify(&links, &base(), &Lexicon::default(), false);
        assert_eq!(without.external, vec!["https://blog.acme.com/post"]);
    }

    #[test]
    fn test_dedup_preserves_order() {
        let links = vec![
            link("https://acme.com/b", "B"),
            link("https://acme.com/a", "A"),
            link("https://acme.com/b", "B again"),
        ];
        let classified = classify(&links, &base(), &Lexicon::default(), true);
        assert_eq!(
            classified.internal_urls(),
            vec!["https://acme.com/b", "https://acme.com/a"]
        );
    }

    #[test]
    fn test_is_file() {
        assert!(is_file(&Url::parse("https://acme.com/report.xlsx").unwrap()));
        assert!(!is_file(&Url::parse("https://acme.com/v1.2/docs").unwrap()));
        assert!(!is_file(&Url::parse("https://acme.com/.well-known").unwrap()));
        assert!(!is_file(&Url::parse("https://acme.com/page.html").unwrap()));
    }
}
