//! Company-name inference
//!
//! Candidates are tried in a fixed order: JSON-LD organisation (or WebSite)
//! name, `og:site_name` when short, a title segment, and finally a name built
//! from the domain. The result is never empty.

use crate::crawler::parser::ParsedPage;
use crate::url::domain_label_name;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::sync::OnceLock;

/// JSON-LD types treated as describing the company itself
const ORGANISATION_TYPES: &[&str] = &[
    "Organization",
    "Corporation",
    "LocalBusiness",
    "ProfessionalService",
    "OnlineBusiness",
    "OnlineStore",
    "Store",
    "NGO",
    "Brand",
];

/// Where an inferred name came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NameSource {
    JsonLd,
    OgSiteName,
    Title,
    Domain,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompanyName {
    pub name: String,
    pub source: NameSource,
}

impl CompanyName {
    /// True when the name came from page content rather than the domain
    pub fn is_resolved(&self) -> bool {
        self.source != NameSource::Domain
    }
}

fn title_separator() -> Option<&'static Regex> {
    static SEPARATOR: OnceLock<Option<Regex>> = OnceLock::new();
    SEPARATOR
        .get_or_init(|| Regex::new(r"\s*[|–—·]\s*|\s+-\s+|:\s+").ok())
        .as_ref()
}

/// Accepts 2–60 characters, at least one letter, at most 4 words
fn valid_candidate(raw: &str) -> Option<String> {
    let name = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    let len = name.chars().count();
    let words = name.split(' ').count();

    ((2..=60).contains(&len) && words <= 4 && name.chars().any(char::is_alphabetic))
        .then_some(name)
}

fn node_types(node: &serde_json::Map<String, Value>) -> Vec<&str> {
    match node.get("@type") {
        Some(Value::String(t)) => vec![t.as_str()],
        Some(Value::Array(types)) => types.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    }
}

fn collect_nodes<'a>(value: &'a Value, out: &mut Vec<&'a serde_json::Map<String, Value>>) {
    match value {
        Value::Array(items) => items.iter().for_each(|item| collect_nodes(item, out)),
        Value::Object(map) => {
            out.push(map);
            if let Some(graph) = map.get("@graph") {
                collect_nodes(graph, out);
            }
        }
        _ => {}
    }
}

fn node_name(node: &serde_json::Map<String, Value>) -> Option<String> {
    ["name", "legalName"]
        .iter()
        .filter_map(|key| node.get(*key).and_then(Value::as_str))
        .find_map(valid_candidate)
}

fn from_json_ld(blocks: &[Value]) -> Option<String> {
    let mut nodes = Vec::new();
    for block in blocks {
        collect_nodes(block, &mut nodes);
    }

    let org_name = nodes
        .iter()
        .copied()
        .filter(|node| is_organisation(node))
        .find_map(node_name);
    org_name.or_else(|| {
        nodes
            .iter()
            .copied()
            .filter(|node| node_types(node).contains(&"WebSite"))
            .find_map(node_name)
    })
}

fn is_organisation(node: &serde_json::Map<String, Value>) -> bool {
    node_types(node).iter().any(|t| ORGANISATION_TYPES.contains(t))
}

fn from_og_site_name(og: Option<&str>) -> Option<String> {
    let og = og?;
    if og.split_whitespace().count() > 2 {
        return None;
    }
    valid_candidate(og)
}

fn from_title(title: Option<&str>) -> Option<String> {
    let title = title?.trim();
    let segments: Vec<&str> = match title_separator() {
        Some(re) => re
            .split(title)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect(),
        None => vec![title],
    };

    match segments.as_slice() {
        [] => None,
        [only] => valid_candidate(only),
        [first, .., last] => valid_candidate(last).or_else(|| valid_candidate(first)),
    }
}

fn from_domain(domain: &str) -> String {
    let label = domain_label_name(domain);
    if !label.is_empty() {
        label
    } else if !domain.is_empty() {
        domain.to_string()
    } else {
        "Unknown".to_string()
    }
}

/// Infers the company name for a page
///
/// # Arguments
///
/// * `page` - Parsed page
/// * `domain` - Host of the crawl, used for the fallback
pub fn infer_company_name(page: &ParsedPage, domain: &str) -> CompanyName {
    if let Some(name) = from_json_ld(&page.schema_blocks) {
        return CompanyName {
            name,
            source: NameSource::JsonLd,
        };
    }
    if let Some(name) = from_og_site_name(page.og_site_name.as_deref()) {
        return CompanyName {
            name,
            source: NameSource::OgSiteName,
        };
    }
    if let Some(name) = from_title(page.title.as_deref()) {
        return CompanyName {
            name,
            source: NameSource::Title,
        };
    }

    CompanyName {
        name: from_domain(domain),
        source: NameSource::Domain,
    }
}
