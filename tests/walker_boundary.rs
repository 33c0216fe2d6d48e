// tests/walker_boundary.rs
//
// Page walker stopping rules: boundary heuristic (never on page one),
// page cap, exhausted listing, and fetch failure mid-walk.

use std::sync::Mutex;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use job_harvester::ingest::types::{CanonicalPosting, Page, PageToken, SourceAdapter};
use job_harvester::ingest::walker::{PageWalker, StopReason};

fn day(d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, d, 0, 0, 0).unwrap()
}

fn posting(url: &str, posted: DateTime<Utc>) -> CanonicalPosting {
    CanonicalPosting {
        title: format!("Role {url}"),
        company: "Acme".into(),
        location: "Remote".into(),
        description: "desc".into(),
        posted_at: posted,
        source_url: format!("https://acme.test/jobs/{url}"),
    }
}

enum Scripted {
    Page(Vec<CanonicalPosting>),
    Fail,
}

/// Serves page N from a fixed script; past the end yields empty pages.
struct ScriptedAdapter {
    pages: Vec<Scripted>,
    requested: Mutex<Vec<u32>>,
}

impl ScriptedAdapter {
    fn new(pages: Vec<Scripted>) -> Self {
        Self {
            pages,
            requested: Mutex::new(Vec::new()),
        }
    }

    fn requested(&self) -> Vec<u32> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl SourceAdapter for ScriptedAdapter {
    fn name(&self) -> &'static str {
        "Acme"
    }

    fn first_page(&self) -> PageToken {
        PageToken::Number(1)
    }

    fn next_page(&self, current: PageToken) -> PageToken {
        match current {
            PageToken::Number(n) => PageToken::Number(n + 1),
            PageToken::Offset(o) => PageToken::Offset(o + 1),
        }
    }

    async fn fetch_page(&self, token: PageToken) -> Result<Page> {
        let PageToken::Number(n) = token else {
            return Err(anyhow!("unexpected token {token}"));
        };
        self.requested.lock().unwrap().push(n);
        match self.pages.get(n as usize - 1) {
            Some(Scripted::Page(p)) => Ok(Page {
                raw_len: p.len(),
                postings: p.clone(),
            }),
            Some(Scripted::Fail) => Err(anyhow!("upstream exploded")),
            None => Ok(Page::default()),
        }
    }
}

fn walker(max_pages: u32) -> PageWalker {
    PageWalker::new(max_pages, Duration::ZERO)
}

#[tokio::test]
async fn stale_second_page_stops_walk_before_page_three() {
    let checkpoint = day(10);
    let adapter = ScriptedAdapter::new(vec![
        Scripted::Page(vec![posting("a", day(1)), posting("b", day(2))]),
        Scripted::Page(vec![posting("c", day(3)), posting("d", day(4))]),
        Scripted::Page(vec![posting("e", day(20))]),
    ]);

    let out = walker(5).walk(&adapter, Some(checkpoint)).await;

    assert_eq!(adapter.requested(), vec![1, 2], "page 3 must not be fetched");
    assert_eq!(out.pages_fetched, 2);
    assert_eq!(out.stop, StopReason::Boundary);
    // The stale final page is still returned.
    assert_eq!(out.postings.len(), 4);
}

#[tokio::test]
async fn first_page_never_triggers_boundary() {
    let adapter = ScriptedAdapter::new(vec![
        Scripted::Page(vec![posting("old", day(1))]),
        Scripted::Page(vec![posting("new", day(15))]),
        Scripted::Page(vec![posting("old2", day(2))]),
    ]);

    let out = walker(5).walk(&adapter, Some(day(10))).await;

    assert_eq!(adapter.requested(), vec![1, 2, 3]);
    assert_eq!(out.stop, StopReason::Boundary);
    assert_eq!(out.postings.len(), 3);
}

#[tokio::test]
async fn posting_equal_to_checkpoint_is_not_newer() {
    let adapter = ScriptedAdapter::new(vec![
        Scripted::Page(vec![posting("a", day(12))]),
        Scripted::Page(vec![posting("b", day(10))]),
        Scripted::Page(vec![posting("c", day(11))]),
    ]);

    let out = walker(5).walk(&adapter, Some(day(10))).await;
    assert_eq!(adapter.requested(), vec![1, 2]);
    assert_eq!(out.stop, StopReason::Boundary);
}

#[tokio::test]
async fn cap_limits_always_new_pages() {
    let pages = (0..10)
        .map(|i| Scripted::Page(vec![posting(&format!("p{i}"), day(28))]))
        .collect();
    let adapter = ScriptedAdapter::new(pages);

    let out = walker(3).walk(&adapter, Some(day(1))).await;

    assert_eq!(adapter.requested(), vec![1, 2, 3]);
    assert_eq!(out.pages_fetched, 3);
    assert_eq!(out.stop, StopReason::PageCap);
    assert_eq!(out.postings.len(), 3);
}

#[tokio::test]
async fn no_checkpoint_walks_until_exhausted() {
    let adapter = ScriptedAdapter::new(vec![
        Scripted::Page(vec![posting("a", day(1))]),
        Scripted::Page(vec![posting("b", day(1))]),
    ]);

    let out = walker(5).walk(&adapter, None).await;

    assert_eq!(adapter.requested(), vec![1, 2, 3]);
    assert_eq!(out.stop, StopReason::Exhausted);
    assert_eq!(out.postings.len(), 2);
}

#[tokio::test]
async fn fetch_failure_keeps_earlier_pages() {
    let adapter = ScriptedAdapter::new(vec![
        Scripted::Page(vec![posting("a", day(5))]),
        Scripted::Fail,
        Scripted::Page(vec![posting("c", day(5))]),
    ]);

    let out = walker(5).walk(&adapter, None).await;

    assert_eq!(adapter.requested(), vec![1, 2]);
    assert_eq!(out.pages_fetched, 1);
    assert!(out.stop.is_failure());
    assert_eq!(out.postings.len(), 1);
    match out.stop {
        StopReason::FetchFailed(msg) => {
            assert!(msg.contains("page=2"), "cursor missing from {msg}");
            assert!(msg.contains("upstream exploded"));
        }
        other => panic!("unexpected stop {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn delay_is_only_between_fetches() {
    let adapter = ScriptedAdapter::new(vec![
        Scripted::Page(vec![posting("a", day(5))]),
        Scripted::Page(vec![posting("b", day(6))]),
    ]);
    let w = PageWalker::new(2, Duration::from_secs(1));

    let t0 = tokio::time::Instant::now();
    let out = w.walk(&adapter, None).await;

    assert_eq!(out.stop, StopReason::PageCap);
    // Two fetches, one gap between them.
    assert_eq!(t0.elapsed(), Duration::from_secs(1));
}
