// src/ingest/types.rs
use std::fmt;

use anyhow::Result;
use chrono::{DateTime, Utc};

/// Placeholder for provider fields that are missing or blank.
pub const UNKNOWN: &str = "N/A";

/// One job listing after adapter parsing, before storage.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct CanonicalPosting {
    pub title: String,
    pub company: String,
    pub location: String,
    pub description: String,
    pub posted_at: DateTime<Utc>,
    /// Canonical listing URL; the dedup key across all sources.
    pub source_url: String,
}

/// Source-specific position in a provider's listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageToken {
    /// Zero-based record offset (Amazon).
    Offset(u32),
    /// One-based page number (Microsoft).
    Number(u32),
}

impl fmt::Display for PageToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageToken::Offset(o) => write!(f, "offset={o}"),
            PageToken::Number(n) => write!(f, "page={n}"),
        }
    }
}

/// Result of fetching one page.
///
/// `raw_len` counts provider records before parsing, so a page whose records
/// were all skipped is still distinguishable from an exhausted listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    pub postings: Vec<CanonicalPosting>,
    pub raw_len: usize,
}

impl Page {
    pub fn is_exhausted(&self) -> bool {
        self.raw_len == 0
    }
}

#[async_trait::async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Normalized provider name, stored as the posting's company.
    fn name(&self) -> &'static str;

    fn first_page(&self) -> PageToken;

    fn next_page(&self, current: PageToken) -> PageToken;

    /// Fetch and parse one page. An empty listing is `Ok` with `raw_len == 0`.
    async fn fetch_page(&self, token: PageToken) -> Result<Page>;
}
