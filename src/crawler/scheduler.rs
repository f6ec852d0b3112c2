//! Breadth-first crawl frontier
//!
//! Entries are popped by depth first, then priority (important links ahead of
//! others at the same depth), then insertion order.

use crate::crawler::LinkPriority;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use url::Url;

/// A URL queued for fetching
#[derive(Debug, Clone)]
pub struct FrontierEntry {
    /// The URL to fetch
    pub url: Url,

    /// Link distance from the seed
    pub depth: u32,

    pub priority: LinkPriority,

    /// Insertion counter, used as the final tie-breaker
    sequence: u64,
}

fn priority_rank(priority: LinkPriority) -> u8 {
    match priority {
        LinkPriority::Important => 0,
        LinkPriority::Normal => 1,
    }
}

// BinaryHeap is a max-heap: the "greatest" entry is the one popped first, so
// every comparison below is reversed.
impl Ord for FrontierEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .depth
            .cmp(&self.depth)
            .then_with(|| priority_rank(other.priority).cmp(&priority_rank(self.priority)))
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

impl PartialOrd for FrontierEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for FrontierEntry {
    fn eq(&self, other: &Self) -> bool {
        self.sequence == other.sequence
    }
}

impl Eq for FrontierEntry {}

/// Priority queue of URLs waiting to be fetched
#[derive(Debug, Default)]
pub struct Frontier {
    heap: BinaryHeap<FrontierEntry>,
    next_sequence: u64,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a URL at the given depth
    pub fn push(&mut self, url: Url, depth: u32, priority: LinkPriority) {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.heap.push(FrontierEntry {
            url,
            depth,
            priority,
            sequence,
        });
    }

    /// Removes and returns the next entry to crawl
    pub fn pop(&mut self) -> Option<FrontierEntry> {
        self.heap.pop()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}
