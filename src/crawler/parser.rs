//! HTML parser for extracting links, metadata and visible text
//!
//! This module handles parsing HTML content to extract:
//! - Title, meta description, canonical and `hreflang` alternates
//! - `h1`–`h3` headings
//! - JSON-LD blocks and their `@type`s
//! - `og:site_name` and `<html lang>`
//! - Image alt coverage and social profile links
//! - Visible text (script/style/noscript/svg/iframe/template removed)
//! - Anchors with their resolved href and anchor text

use crate::url::normalize;
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;
use url::Url;

/// Elements whose text never counts as page content
const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "noscript", "svg", "iframe", "template"];

/// Host suffix -> social network name
const SOCIAL_HOSTS: &[(&str, &str)] = &[
    ("linkedin.com", "linkedin"),
    ("twitter.com", "twitter"),
    ("x.com", "twitter"),
    ("facebook.com", "facebook"),
    ("instagram.com", "instagram"),
    ("youtube.com", "youtube"),
];

/// Errors raised while parsing a page
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("empty document")]
    EmptyDocument,
}

/// A heading (`h1`–`h3`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Heading {
    pub level: u8,
    pub text: String,
}

/// A `<link rel="alternate" hreflang>` entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Hreflang {
    pub lang: String,
    pub href: String,
}

/// Image alt-text coverage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImageStats {
    pub total: usize,
    pub missing_alt: usize,
}

/// An anchor found on the page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLink {
    /// Normalized absolute URL
    pub url: Url,
    /// Collapsed anchor text
    pub text: String,
}

/// Extracted information from an HTML page
#[derive(Debug, Clone, Default)]
pub struct ParsedPage {
    pub title: Option<String>,
    /// `meta[name=description]`, falling back to `og:description`
    pub meta_description: Option<String>,
    pub canonical: Option<String>,
    pub headings: Vec<Heading>,
    pub hreflang: Vec<Hreflang>,
    /// Parsed JSON-LD blocks (unparseable blocks are dropped)
    pub schema_blocks: Vec<serde_json::Value>,
    /// Every `@type` found in `schema_blocks`, in document order
    pub schema_types: Vec<String>,
    pub og_site_name: Option<String>,
    pub language: Option<String>,
    pub images: ImageStats,
    /// Network name -> first profile URL
    pub social: BTreeMap<String, String>,
    pub word_count: usize,
    /// Visible text with whitespace collapsed
    pub text: String,
    pub links: Vec<RawLink>,
}

/// Parses HTML content and extracts links and metadata
///
/// # Arguments
///
/// * `html` - The HTML content to parse
/// * `base_url` - The URL the page was fetched from, for resolving links
///
/// # Returns
///
/// * `Ok(ParsedPage)` - Successfully parsed page
/// * `Err(ParseError)` - The document is empty
///
/// # Example
///
/// ```
/// use sitesignal::crawler::parse_html;
/// use url::Url;
///
/// let html = r#"<html><head><title>Test</title></head><body><a href="/page">Link</a></body></html>"#;
/// let base_url = Url::parse("https://example.com/").unwrap();
/// let parsed = parse_html(html, &base_url).unwrap();
/// assert_eq!(parsed.title, Some("Test".to_string()));
/// assert_eq!(parsed.links[0].url.as_str(), "https://example.com/page");
/// ```
pub fn parse_html(html: &str, base_url: &Url) -> Result<ParsedPage, ParseError> {
    if html.trim().is_empty() {
        return Err(ParseError::EmptyDocument);
    }

    let document = Html::parse_document(html);
    let text = extract_text(&document);

    let mut page = ParsedPage {
        title: first_text(&document, "title"),
        meta_description: meta_content(&document, "meta[name='description']")
            .or_else(|| meta_content(&document, "meta[property='og:description']")),
        canonical: select_all(&document, "link[rel='canonical'][href]")
            .into_iter()
            .find_map(|el| el.value().attr("href"))
            .and_then(|href| normalize(href, Some(base_url)).ok())
            .map(|url| url.to_string()),
        headings: extract_headings(&document),
        hreflang: extract_hreflang(&document, base_url),
        og_site_name: meta_content(&document, "meta[property='og:site_name']"),
        language: select_all(&document, "html[lang]")
            .into_iter()
            .find_map(|el| el.value().attr("lang"))
            .map(|lang| lang.trim().to_string())
            .filter(|lang| !lang.is_empty()),
        images: extract_image_stats(&document),
        word_count: text.split_whitespace().count(),
        text,
        links: extract_links(&document, base_url),
        ..ParsedPage::default()
    };

    page.schema_blocks = extract_json_ld(&document);
    for block in &page.schema_blocks {
        collect_schema_types(block, &mut page.schema_types);
    }
    page.social = extract_social(&page.links);

    if page.title.is_none() && page.text.is_empty() && page.links.is_empty() {
        return Err(ParseError::EmptyDocument);
    }

    Ok(page)
}

fn select_all<'a>(document: &'a Html, css: &str) -> Vec<ElementRef<'a>> {
    match Selector::parse(css) {
        Ok(selector) => document.select(&selector).collect(),
        Err(_) => Vec::new(),
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn element_text(element: &ElementRef) -> String {
    collapse_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}

fn first_text(document: &Html, css: &str) -> Option<String> {
    select_all(document, css)
        .first()
        .map(element_text)
        .filter(|s| !s.is_empty())
}

fn meta_content(document: &Html, css: &str) -> Option<String> {
    select_all(document, css)
        .into_iter()
        .filter_map(|el| el.value().attr("content"))
        .map(collapse_whitespace)
        .find(|s| !s.is_empty())
}

fn extract_headings(document: &Html) -> Vec<Heading> {
    select_all(document, "h1, h2, h3")
        .into_iter()
        .filter_map(|el| {
            let level = match el.value().name() {
                "h1" => 1,
                "h2" => 2,
                _ => 3,
            };
            let text = element_text(&el);
            (!text.is_empty()).then_some(Heading { level, text })
        })
        .collect()
}

fn extract_hreflang(document: &Html, base_url: &Url) -> Vec<Hreflang> {
    select_all(document, "link[rel='alternate'][hreflang][href]")
        .into_iter()
        .filter_map(|el| {
            let lang = el.value().attr("hreflang")?.trim().to_string();
            let href = normalize(el.value().attr("href")?, Some(base_url)).ok()?;
            Some(Hreflang {
                lang,
                href: href.to_string(),
            })
        })
        .collect()
}

fn extract_json_ld(document: &Html) -> Vec<serde_json::Value> {
    select_all(document, "script[type='application/ld+json']")
        .into_iter()
        .filter_map(|el| {
            let raw = el.text().collect::<String>();
            match serde_json::from_str::<serde_json::Value>(raw.trim()) {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::debug!("Ignoring unparseable JSON-LD block: {}", e);
                    None
                }
            }
        })
        .collect()
}

/// Collects `@type` values from a JSON-LD value, descending into arrays and `@graph`
pub fn collect_schema_types(value: &serde_json::Value, out: &mut Vec<String>) {
    match value {
        serde_json::Value::Array(items) => {
            for item in items {
                collect_schema_types(item, out);
            }
        }
        serde_json::Value::Object(map) => {
            match map.get("@type") {
                Some(serde_json::Value::String(t)) => out.push(t.clone()),
                Some(serde_json::Value::Array(types)) => out.extend(
                    types
                        .iter()
                        .filter_map(|t| t.as_str())
                        .map(|t| t.to_string()),
                ),
                _ => {}
            }
            if let Some(graph) = map.get("@graph") {
                collect_schema_types(graph, out);
            }
        }
        _ => {}
    }
}

fn extract_image_stats(document: &Html) -> ImageStats {
    let images = select_all(document, "img");
    ImageStats {
        total: images.len(),
        missing_alt: images
            .iter()
            .filter(|img| {
                img.value()
                    .attr("alt")
                    .map(|alt| alt.trim().is_empty())
                    .unwrap_or(true)
            })
            .count(),
    }
}

/// Visible text with skipped elements removed
fn extract_text(document: &Html) -> String {
    let mut parts: Vec<&str> = Vec::new();

    for node in document.root_element().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .map(|el| SKIPPED_ELEMENTS.contains(&el.name()))
                .unwrap_or(false)
        });
        if !hidden {
            parts.push(text);
        }
    }

    collapse_whitespace(&parts.join(" "))
}

/// Extracts all anchors whose href resolves to an http(s) URL
fn extract_links(document: &Html, base_url: &Url) -> Vec<RawLink> {
    select_all(document, "a[href]")
        .into_iter()
        .filter_map(|el| {
            let href = el.value().attr("href")?;
            let url = normalize(href, Some(base_url)).ok()?;
            Some(RawLink {
                url,
                text: element_text(&el),
            })
        })
        .collect()
}

fn extract_social(links: &[RawLink]) -> BTreeMap<String, String> {
    let mut social = BTreeMap::new();

    for link in links {
        let Some(host) = link.url.host_str() else {
            continue;
        };
        let host = host.to_lowercase();
        let network = SOCIAL_HOSTS
            .iter()
            .find(|(suffix, _)| host == *suffix || host.ends_with(&format!(".{}", suffix)))
            .map(|(_, name)| *name);

        if let Some(network) = network {
            social
                .entry(network.to_string())
                .or_insert_with(|| link.url.to_string());
        }
    }

    social
}
