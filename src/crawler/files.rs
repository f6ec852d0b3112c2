//! Linked document downloads
//!
//! Documents found through file links are fetched with the page fetcher's
//! retry and size rules. PDF text is extracted with lopdf on the blocking
//! pool; other types keep an empty snippet.

use crate::crawler::fetcher::{FetchedFile, Fetcher};
use crate::output::FileRecord;
use url::Url;

/// Characters of extracted text kept per document
const SNIPPET_CHARS: usize = 2_000;

const PDF_MAGIC: &[u8] = b"%PDF-";

/// True when the content type or the leading bytes identify a PDF
pub fn is_pdf(content_type: Option<&str>, bytes: &[u8]) -> bool {
    content_type.is_some_and(|ct| ct.to_lowercase().contains("pdf")) || bytes.starts_with(PDF_MAGIC)
}

/// Extracts the text of every page of a PDF
///
/// Returns `None` for unreadable or encrypted documents.
pub fn extract_pdf_text(bytes: &[u8]) -> Option<String> {
    let document = match lopdf::Document::load_mem(bytes) {
        Ok(document) => document,
        Err(e) => {
            tracing::debug!("Unreadable PDF: {}", e);
            return None;
        }
    };
    if document.is_encrypted() {
        tracing::debug!("Skipping encrypted PDF");
        return None;
    }

    let pages: Vec<u32> = document.get_pages().keys().copied().collect();
    match document.extract_text(&pages) {
        Ok(text) => Some(text),
        Err(e) => {
            tracing::debug!("PDF text extraction failed: {}", e);
            None
        }
    }
}

/// Collapses whitespace and keeps the first [`SNIPPET_CHARS`] characters
fn snippet(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(SNIPPET_CHARS)
        .collect()
}

async fn text_snippet(file: FetchedFile) -> String {
    if !is_pdf(file.content_type.as_deref(), &file.bytes) {
        return String::new();
    }

    // lopdf is synchronous and may panic on hostile input
    match tokio::task::spawn_blocking(move || extract_pdf_text(&file.bytes)).await {
        Ok(Some(text)) => snippet(&text),
        Ok(None) => String::new(),
        Err(e) => {
            tracing::warn!("PDF extraction task failed: {}", e);
            String::new()
        }
    }
}

/// Downloads one linked document
///
/// Never fails: a download error is kept in [`FileRecord::error`].
pub async fn download_file(fetcher: &Fetcher, url: &Url) -> FileRecord {
    match fetcher.fetch_file(url).await {
        Ok(file) => {
            let content_type = file.content_type.clone();
            let size_bytes = file.bytes.len();
            let text_snippet = text_snippet(file).await;
            tracing::debug!(
                "Downloaded {} ({} bytes, {} snippet chars)",
                url,
                size_bytes,
                text_snippet.chars().count()
            );

            FileRecord {
                url: url.to_string(),
                content_type,
                size_bytes: Some(size_bytes),
                text_snippet,
                error: None,
            }
        }
        Err(failure) => {
            tracing::debug!("Download of {} failed: {}", url, failure);
            FileRecord::failed(url.as_str(), failure.to_string())
        }
    }
}
