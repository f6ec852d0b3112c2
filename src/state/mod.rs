//! State module for tracking crawl progress
//!
//! This module provides state management for frontier entries, domains and
//! whole sessions during a crawl.
//!
//! # Components
//!
//! - `EntryState`: Lifecycle of one frontier entry (queued, fetching, parsed, soft-failed)
//! - `DomainState`: Per-domain request timing for the rate limiter
//! - `CrawlSession`: Everything one session owns, from frontier to results

mod domain_state;
mod page_state;
mod session;

// Re-export main types
pub use domain_state::DomainState;
pub use page_state::{AbortReason, EntryState, SessionStatus};
pub use session::{CrawlRequest, CrawlSession};
