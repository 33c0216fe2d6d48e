// tests/writer_dedup.rs
//
// Dedup-merge writer: per-record isolation, duplicate-on-insert races,
// and no updates of stored rows.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use job_harvester::ingest::types::CanonicalPosting;
use job_harvester::ingest::writer::{DedupWriter, WriteCounts};
use job_harvester::store::{
    JobPage, JobQuery, JobStore, MemoryStore, NewPosting, StoreError, StoreResult, StoredPosting,
};
use uuid::Uuid;

fn posting(n: u32) -> CanonicalPosting {
    CanonicalPosting {
        title: format!("Engineer {n}"),
        company: "Acme Labs Pvt Ltd".into(),
        location: "Pune".into(),
        description: "Ship it".into(),
        posted_at: Utc.with_ymd_and_hms(2025, 4, n.clamp(1, 28), 0, 0, 0).unwrap(),
        source_url: format!("https://acme.test/jobs/{n}"),
    }
}

/// Wraps a MemoryStore and lets tests inject failures.
struct FaultyStore {
    inner: MemoryStore,
    fail_insert_for: HashSet<String>,
    /// Pretend lookups never see stored rows (simulates a concurrent writer).
    blind_lookup: bool,
}

impl FaultyStore {
    fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            fail_insert_for: HashSet::new(),
            blind_lookup: false,
        }
    }
}

#[async_trait]
impl JobStore for FaultyStore {
    async fn latest_for_company(&self, company: &str) -> StoreResult<Option<StoredPosting>> {
        self.inner.latest_for_company(company).await
    }

    async fn find_by_url(&self, source_url: &str) -> StoreResult<Option<StoredPosting>> {
        if self.blind_lookup {
            return Ok(None);
        }
        self.inner.find_by_url(source_url).await
    }

    async fn insert(&self, posting: NewPosting) -> StoreResult<StoredPosting> {
        if self.fail_insert_for.contains(&posting.source_url) {
            return Err(StoreError::Unavailable("connection reset".into()));
        }
        self.inner.insert(posting).await
    }

    async fn count_for_company(&self, company: &str) -> StoreResult<u64> {
        self.inner.count_for_company(company).await
    }

    async fn list(&self, query: &JobQuery) -> StoreResult<JobPage> {
        self.inner.list(query).await
    }

    async fn get(&self, id: Uuid) -> StoreResult<Option<StoredPosting>> {
        self.inner.get(id).await
    }
}

#[tokio::test]
async fn middle_record_failure_does_not_abort_batch() {
    let mut store = FaultyStore::new();
    store.fail_insert_for.insert(posting(2).source_url);
    let store = Arc::new(store);
    let writer = DedupWriter::new(store.clone());

    let counts = writer
        .write("Acme", &[posting(1), posting(2), posting(3)])
        .await;

    assert_eq!(
        counts,
        WriteCounts {
            new: 2,
            already_existed: 0,
            failed: 1
        }
    );
    assert!(store.inner.find_by_url(&posting(3).source_url).await.unwrap().is_some());
    assert!(store.inner.find_by_url(&posting(2).source_url).await.unwrap().is_none());
}

#[tokio::test]
async fn duplicate_on_insert_counts_as_existing() {
    let mut store = FaultyStore::new();
    store.blind_lookup = true;
    let store = Arc::new(store);
    let writer = DedupWriter::new(store.clone());

    let first = writer.write("Acme", &[posting(1), posting(2)]).await;
    let second = writer.write("Acme", &[posting(1), posting(2)]).await;

    assert_eq!(first.new, 2);
    assert_eq!(
        second,
        WriteCounts {
            new: 0,
            already_existed: 2,
            failed: 0
        }
    );
    assert_eq!(store.inner.len(), 2);
}

#[tokio::test]
async fn company_is_normalized_and_existing_rows_are_untouched() {
    let store = Arc::new(MemoryStore::new());
    let writer = DedupWriter::new(store.clone());

    writer.write("Acme", &[posting(1)]).await;
    let before = store.find_by_url(&posting(1).source_url).await.unwrap().unwrap();
    assert_eq!(before.company, "Acme");

    let mut changed = posting(1);
    changed.title = "Renamed upstream".into();
    let counts = writer.write("Acme", &[changed]).await;
    assert_eq!(counts.already_existed, 1);

    let after = store.find_by_url(&posting(1).source_url).await.unwrap().unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn repeated_url_within_one_batch_is_written_once() {
    let store = Arc::new(MemoryStore::new());
    let writer = DedupWriter::new(store.clone());

    let counts = writer.write("Acme", &[posting(7), posting(7)]).await;

    assert_eq!(counts.new, 1);
    assert_eq!(counts.already_existed, 1);
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn concurrent_writers_store_each_url_once() {
    let store = Arc::new(MemoryStore::new());
    let batch: Vec<_> = (1..=20).map(posting).collect();

    let w1 = DedupWriter::new(store.clone());
    let w2 = DedupWriter::new(store.clone());
    let (a, b) = tokio::join!(w1.write("Acme", &batch), w2.write("Acme", &batch));

    assert_eq!(a.new + b.new, 20);
    assert_eq!(a.total() + b.total(), 40);
    assert_eq!(store.len(), 20);
}
