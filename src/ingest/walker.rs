// src/ingest/walker.rs
//! Drives one adapter across successive pages.
//!
//! Stops on the first of: an exhausted page, the page cap, a fetch error,
//! or the boundary heuristic. The heuristic only applies from the second
//! page on: a page with no posting newer than the checkpoint ends the walk
//! after that page is kept. Providers may sort page one by relevance, so an
//! all-old first page is not evidence that nothing new follows.

use std::time::Duration;

use chrono::{DateTime, Utc};
use metrics::counter;

use crate::ingest::types::{CanonicalPosting, SourceAdapter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// Adapter returned an empty page.
    Exhausted,
    /// Page cap reached.
    PageCap,
    /// A page past the first had nothing newer than the checkpoint.
    Boundary,
    /// A page fetch failed; pages before it are kept.
    FetchFailed(String),
}

impl StopReason {
    pub fn is_failure(&self) -> bool {
        matches!(self, StopReason::FetchFailed(_))
    }
}

#[derive(Debug, Clone)]
pub struct WalkOutcome {
    pub postings: Vec<CanonicalPosting>,
    pub pages_fetched: u32,
    pub checkpoint: Option<DateTime<Utc>>,
    pub stop: StopReason,
}

#[derive(Debug, Clone, Copy)]
pub struct PageWalker {
    pub max_pages: u32,
    pub page_delay: Duration,
}

impl PageWalker {
    pub fn new(max_pages: u32, page_delay: Duration) -> Self {
        Self {
            max_pages,
            page_delay,
        }
    }

    pub async fn walk(
        &self,
        adapter: &dyn SourceAdapter,
        checkpoint: Option<DateTime<Utc>>,
    ) -> WalkOutcome {
        let source = adapter.name();
        let mut token = adapter.first_page();
        let mut acc: Vec<CanonicalPosting> = Vec::new();
        let mut pages_fetched: u32 = 0;

        let stop = loop {
            if pages_fetched >= self.max_pages {
                break StopReason::PageCap;
            }
            if pages_fetched > 0 && !self.page_delay.is_zero() {
                tokio::time::sleep(self.page_delay).await;
            }

            tracing::info!(source, cursor = %token, "fetching page");
            let page = match adapter.fetch_page(token).await {
                Ok(p) => p,
                Err(e) => {
                    tracing::warn!(source, cursor = %token, error = ?e, "page fetch failed");
                    break StopReason::FetchFailed(format!("{token}: {e:#}"));
                }
            };
            pages_fetched += 1;
            counter!("harvest_pages_total", "source" => source).increment(1);

            if page.is_exhausted() {
                tracing::info!(source, cursor = %token, "no more postings");
                break StopReason::Exhausted;
            }

            let has_newer = match checkpoint {
                Some(cp) => page.postings.iter().any(|p| p.posted_at > cp),
                None => true,
            };
            acc.extend(page.postings);

            if pages_fetched > 1 && !has_newer {
                tracing::info!(source, cursor = %token, "no new postings on page, stopping");
                break StopReason::Boundary;
            }

            token = adapter.next_page(token);
        };

        WalkOutcome {
            postings: acc,
            pages_fetched,
            checkpoint,
            stop,
        }
    }
}
