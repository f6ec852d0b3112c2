//! Domain-level aggregation of a finished crawl session

use crate::config::Lexicon;
use crate::crawler::{CompanyName, NameSource};
use crate::output::{FileRecord, PageRecord};
use crate::state::{CrawlSession, SessionStatus};
use crate::url::{domain_label_name, registrable_domain};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

const TOP_TITLES: usize = 5;
const TOP_HEADINGS: usize = 10;
const SAMPLE_PAGES: usize = 10;
const MAX_NAMES: usize = 20;
const MAX_EXTERNAL_SITES: usize = 20;

const ABOUT_KEYWORDS: &[&str] = &["about", "a-propos", "team", "qui-sommes-nous", "equipe"];
const BLOG_KEYWORDS: &[&str] = &["blog", "news", "actualites", "articles", "updates"];
const POLICY_KEYWORDS: &[&str] = &[
    "privacy",
    "rse",
    "confidentialite",
    "policy",
    "rgpd",
    "mentions-legales",
    "terms",
    "conditions",
];

/// One soft failure in the crawl log
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrawlLogEntry {
    pub page: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CrawlLog {
    pub pages_crawled: usize,
    pub pages_attempted: u32,
    pub errors: Vec<CrawlLogEntry>,
}

/// Crawled page URLs bucketed by what the path suggests
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Sections {
    pub about: Vec<String>,
    pub blog: Vec<String>,
    pub policies: Vec<String>,
    pub other: Vec<String>,
}

impl Sections {
    fn add(&mut self, url: &str) {
        let lower = url.to_lowercase();
        let has = |keywords: &[&str]| keywords.iter().any(|k| lower.contains(k));

        let bucket = if has(ABOUT_KEYWORDS) {
            &mut self.about
        } else if has(BLOG_KEYWORDS) {
            &mut self.blog
        } else if has(POLICY_KEYWORDS) {
            &mut self.policies
        } else {
            &mut self.other
        };
        bucket.push(url.to_string());
    }
}

/// Aggregated result of one crawl session
#[derive(Debug, Clone, Serialize)]
pub struct DomainSummary {
    /// Registrable domain of the start URL
    pub domain: String,
    pub start_url: String,
    pub pages_crawled: usize,
    pub company_name: String,
    pub company_name_source: NameSource,
    pub description: Option<String>,
    pub top_titles: Vec<String>,
    pub top_headings: Vec<String>,
    pub likely_niches: Vec<String>,
    pub sample_pages: Vec<PageRecord>,
    pub crawl_log: CrawlLog,
    pub timestamp: DateTime<Utc>,
    pub confidence: f64,
    pub status: SessionStatus,
    pub partner_indicators: Vec<String>,
    pub client_indicators: Vec<String>,
    pub partner_names: Vec<String>,
    pub client_names: Vec<String>,
    pub external_sites: Vec<String>,
    pub files: Vec<FileRecord>,
    pub social: BTreeMap<String, String>,
    pub sections: Sections,
    pub lexicon_version: String,
    pub lexicon_fingerprint: String,
}

fn union<'a>(lists: impl Iterator<Item = &'a Vec<String>>) -> Vec<String> {
    lists
        .flatten()
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn first_seen<'a>(items: impl Iterator<Item = &'a str>, limit: usize) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for item in items {
        if out.len() >= limit {
            break;
        }
        if !out.iter().any(|seen| seen == item) {
            out.push(item.to_string());
        }
    }
    out
}

/// Session confidence in [0, 1], rounded to 2 decimals
pub fn confidence(
    pages_crawled: usize,
    max_pages: u32,
    name_resolved: bool,
    has_description: bool,
) -> f64 {
    if pages_crawled == 0 || max_pages == 0 {
        return 0.0;
    }

    let coverage = (pages_crawled as f64 / max_pages as f64).min(1.0);
    let mut score = 0.5 + 0.3 * coverage;
    if name_resolved {
        score += 0.1;
    }
    if has_description {
        score += 0.1;
    }

    (score.clamp(0.0, 1.0) * 100.0).round() / 100.0
}

impl DomainSummary {
    /// Builds the summary, consuming the session
    pub fn from_session(session: CrawlSession, lexicon: &Lexicon) -> Self {
        let results = &session.results;

        let company = results
            .iter()
            .map(|r| &r.company_name)
            .find(|name| name.is_resolved())
            .cloned()
            .unwrap_or_else(|| CompanyName {
                name: domain_fallback(&session.domain),
                source: NameSource::Domain,
            });

        let description = results
            .iter()
            .filter_map(|r| r.meta_description.as_deref())
            .map(str::trim)
            .find(|d| !d.is_empty())
            .map(String::from);

        // Titles and headings repeated on every page count once
        let titles = results.iter().filter_map(|r| r.title.as_deref());
        let top_titles = first_seen(titles, TOP_TITLES);
        let headings = results.iter().flat_map(|r| r.heading_texts());
        let top_headings = first_seen(headings, TOP_HEADINGS);

        let signals = || results.iter().map(|r| &r.business_signals);
        let mut partner_names = union(signals().map(|s| &s.partner_names));
        partner_names.truncate(MAX_NAMES);
        let mut client_names = union(signals().map(|s| &s.client_names));
        client_names.truncate(MAX_NAMES);

        // External sites come from the seed page only
        let external_sites = results
            .first()
            .map(|r| {
                let links = r.external_links.iter().map(String::as_str);
                first_seen(links, MAX_EXTERNAL_SITES)
            })
            .unwrap_or_default();

        let mut social = BTreeMap::new();
        for record in results {
            for (network, url) in &record.social {
                social.entry(network.clone()).or_insert_with(|| url.clone());
            }
        }

        let mut sections = Sections::default();
        for record in results {
            sections.add(&record.url);
        }

        let pages_crawled = results.len();
        let confidence = confidence(
            pages_crawled,
            session.max_pages,
            company.is_resolved(),
            description.is_some(),
        );

        Self {
            domain: registrable_domain(&session.domain),
            start_url: session.start_url.to_string(),
            pages_crawled,
            company_name: company.name,
            company_name_source: company.source,
            description,
            top_titles,
            top_headings,
            likely_niches: union(signals().map(|s| &s.niche_terms)),
            crawl_log: CrawlLog {
                pages_crawled,
                pages_attempted: session.pages_attempted,
                errors: session.errors.clone(),
            },
            timestamp: Utc::now(),
            confidence,
            status: session.status,
            partner_indicators: union(signals().map(|s| &s.partner_indicators)),
            client_indicators: union(signals().map(|s| &s.client_indicators)),
            partner_names,
            client_names,
            external_sites,
            files: session.files.clone(),
            social,
            sections,
            lexicon_version: lexicon.version.clone(),
            lexicon_fingerprint: lexicon.fingerprint(),
            sample_pages: session.results.into_iter().take(SAMPLE_PAGES).collect(),
        }
    }
}

fn domain_fallback(domain: &str) -> String {
    let label = domain_label_name(domain);
    if label.is_empty() {
        domain.to_string()
    } else {
        label
    }
}
