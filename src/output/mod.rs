//! Output module for page records and domain summaries
//!
//! This module handles:
//! - The per-page record kept for every parsed page
//! - The record of every downloaded document
//! - Aggregating a finished session into a [`DomainSummary`]
//! - Rendering summaries as JSON or markdown

mod markdown;
mod record;
mod summary;

pub use markdown::format_markdown_summary;
pub use record::{FileRecord, PageRecord};
pub use summary::{confidence, CrawlLog, CrawlLogEntry, DomainSummary, Sections};

use crate::CrawlError;

/// Serialization format of a summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    Markdown,
}

/// Renders a summary in the requested format
///
/// # Returns
///
/// * `Ok(String)` - Pretty-printed JSON or markdown
/// * `Err(CrawlError::Json)` - Serialization failed
pub fn render_summary(summary: &DomainSummary, format: OutputFormat) -> Result<String, CrawlError> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(summary)?),
        OutputFormat::Markdown => Ok(format_markdown_summary(summary)),
    }
}
