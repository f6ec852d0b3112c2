use crate::crawler::{
    BusinessSignals, CompanyName, FetchMethod, Heading, Hreflang, ImageStats,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Everything extracted from one successfully parsed page
///
/// Built once by the coordinator and never modified afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct PageRecord {
    pub url: String,
    pub depth: u32,
    pub title: Option<String>,
    pub meta_description: Option<String>,
    pub canonical: Option<String>,
    pub headings: Vec<Heading>,
    pub business_signals: BusinessSignals,
    pub internal_links: Vec<String>,
    pub external_links: Vec<String>,
    pub file_links: Vec<String>,

    /// Leading slice of the visible text
    pub text_sample: String,

    pub fetched_at: DateTime<Utc>,
    pub fetch_method: FetchMethod,
    pub status_code: Option<u16>,
    pub language: Option<String>,
    pub hreflang: Vec<Hreflang>,
    pub schema_types: Vec<String>,
    pub images: ImageStats,

    /// Network name to profile URL
    pub social: BTreeMap<String, String>,

    pub word_count: usize,
    pub company_name: CompanyName,
}

impl PageRecord {
    /// Heading texts in document order
    pub fn heading_texts(&self) -> impl Iterator<Item = &str> {
        self.headings.iter().map(|h| h.text.as_str())
    }
}

/// A linked document downloaded during the session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRecord {
    pub url: String,
    pub content_type: Option<String>,
    pub size_bytes: Option<usize>,

    /// Leading extracted text; empty for non-PDF documents
    pub text_snippet: String,

    /// Why the download failed, if it did
    pub error: Option<String>,
}

impl FileRecord {
    pub fn failed(url: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            content_type: None,
            size_bytes: None,
            text_snippet: String::new(),
            error: Some(error.into()),
        }
    }
}
