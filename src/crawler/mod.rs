//! Crawler module for page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with retries, proxies and user-agent rotation
//! - Block detection and the headless render fallback
//! - Linked document downloads with PDF text extraction
//! - HTML parsing, business signals and company-name inference
//! - Link classification, frontier ordering and rate limiting
//! - Overall session coordination

mod coordinator;
mod detector;
mod fetcher;
mod files;
mod identity;
mod limiter;
mod links;
mod parser;
mod render;
mod scheduler;
mod signals;

pub use coordinator::{crawl, Coordinator, PageOutcome};
pub use detector::looks_blocked;
pub use fetcher::{
    build_http_client, FetchFailure, FetchMethod, FetchedFile, Fetcher, PageFetchResult,
};
pub(crate) use fetcher::read_body_limited;
pub use files::{download_file, extract_pdf_text, is_pdf};
pub use identity::{infer_company_name, CompanyName, NameSource};
pub use limiter::RateLimiter;
pub use links::{classify, ClassifiedLinks, InternalLink, LinkPriority};
pub use parser::{
    collect_schema_types, parse_html, Heading, Hreflang, ImageStats, ParseError, ParsedPage,
    RawLink,
};
pub use render::{
    pointer_path, render_fallback, screenshot_file_name, NoopRenderer, RenderError, RenderOptions,
    RenderedPage, Renderer,
};
#[cfg(feature = "browser")]
pub use render::ChromiumRenderer;
pub use scheduler::{Frontier, FrontierEntry};
pub use signals::{BusinessSignals, SignalExtractor};
