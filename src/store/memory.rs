// src/store/memory.rs
//! In-process store used when no database is configured, and by tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::{JobPage, JobQuery, JobStore, NewPosting, StoreError, StoreResult, StoredPosting};

#[derive(Debug, Default)]
struct Inner {
    rows: Vec<StoredPosting>,
    /// Unique index: source_url -> position in `rows`.
    by_url: HashMap<String, usize>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    closed: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every stored row, in insertion order.
    pub fn all(&self) -> Vec<StoredPosting> {
        self.lock().map(|g| g.rows.clone()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.lock().map(|g| g.rows.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> StoreResult<std::sync::MutexGuard<'_, Inner>> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Unavailable("store is closed".into()));
        }
        self.inner
            .lock()
            .map_err(|_| StoreError::Unavailable("store mutex poisoned".into()))
    }
}

#[async_trait]
impl JobStore for MemoryStore {
    async fn latest_for_company(&self, company: &str) -> StoreResult<Option<StoredPosting>> {
        let g = self.lock()?;
        Ok(g.rows
            .iter()
            .filter(|p| p.company == company)
            .max_by_key(|p| p.posted_at)
            .cloned())
    }

    async fn find_by_url(&self, source_url: &str) -> StoreResult<Option<StoredPosting>> {
        let g = self.lock()?;
        Ok(g.by_url.get(source_url).map(|&i| g.rows[i].clone()))
    }

    async fn insert(&self, posting: NewPosting) -> StoreResult<StoredPosting> {
        if posting.source_url.trim().is_empty() {
            return Err(StoreError::Invalid("empty source_url".into()));
        }

        let mut g = self.lock()?;
        if g.by_url.contains_key(&posting.source_url) {
            return Err(StoreError::Duplicate {
                source_url: posting.source_url,
            });
        }

        let row = StoredPosting {
            id: Uuid::new_v4(),
            title: posting.title,
            company: posting.company,
            location: posting.location,
            description: posting.description,
            posted_at: posting.posted_at,
            source_url: posting.source_url,
            fetched_at: Utc::now(),
        };
        let idx = g.rows.len();
        g.by_url.insert(row.source_url.clone(), idx);
        g.rows.push(row.clone());
        Ok(row)
    }

    async fn count_for_company(&self, company: &str) -> StoreResult<u64> {
        let g = self.lock()?;
        Ok(g.rows.iter().filter(|p| p.company == company).count() as u64)
    }

    async fn list(&self, query: &JobQuery) -> StoreResult<JobPage> {
        let g = self.lock()?;
        let mut hits: Vec<&StoredPosting> = g.rows.iter().filter(|p| query.matches(p)).collect();
        hits.sort_by(|a, b| b.posted_at.cmp(&a.posted_at));

        let total = hits.len() as u64;
        let jobs = hits
            .into_iter()
            .skip(usize::try_from(query.offset()).unwrap_or(usize::MAX))
            .take(query.limit as usize)
            .cloned()
            .collect();
        Ok(JobPage::new(query, total, jobs))
    }

    async fn get(&self, id: Uuid) -> StoreResult<Option<StoredPosting>> {
        let g = self.lock()?;
        Ok(g.rows.iter().find(|p| p.id == id).cloned())
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}
