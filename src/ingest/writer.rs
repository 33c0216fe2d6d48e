// src/ingest/writer.rs
use std::sync::Arc;

use metrics::counter;
use serde::Serialize;

use crate::ingest::types::CanonicalPosting;
use crate::store::{JobStore, NewPosting, StoreError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WriteCounts {
    pub new: u64,
    pub already_existed: u64,
    pub failed: u64,
}

impl WriteCounts {
    pub fn total(&self) -> u64 {
        self.new + self.already_existed + self.failed
    }

    pub fn add(&mut self, other: WriteCounts) {
        self.new += other.new;
        self.already_existed += other.already_existed;
        self.failed += other.failed;
    }
}

enum Outcome {
    New,
    Existed,
    Failed,
}

/// Writes only postings whose URL is not stored yet.
///
/// The lookup is an optimization; the store's unique constraint decides.
/// A duplicate on insert (a concurrent run got there first) counts as
/// already existed. Any other per-record error is logged and skipped.
#[derive(Clone)]
pub struct DedupWriter {
    store: Arc<dyn JobStore>,
}

impl DedupWriter {
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self { store }
    }

    pub async fn write(&self, source: &str, postings: &[CanonicalPosting]) -> WriteCounts {
        let mut counts = WriteCounts::default();
        for p in postings {
            match self.write_one(source, p).await {
                Outcome::New => counts.new += 1,
                Outcome::Existed => counts.already_existed += 1,
                Outcome::Failed => counts.failed += 1,
            }
        }

        let src = source.to_string();
        counter!("harvest_postings_new_total", "source" => src.clone()).increment(counts.new);
        counter!("harvest_postings_existing_total", "source" => src.clone())
            .increment(counts.already_existed);
        counter!("harvest_postings_failed_total", "source" => src).increment(counts.failed);
        counts
    }

    async fn write_one(&self, source: &str, p: &CanonicalPosting) -> Outcome {
        match self.store.find_by_url(&p.source_url).await {
            Ok(Some(_)) => {
                tracing::debug!(source, url = %p.source_url, "posting already stored");
                return Outcome::Existed;
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(source, url = %p.source_url, error = %e, "lookup failed, skipping posting");
                return Outcome::Failed;
            }
        }

        match self.store.insert(NewPosting::from_canonical(source, p)).await {
            Ok(stored) => {
                tracing::debug!(source, id = %stored.id, title = %stored.title, "added posting");
                Outcome::New
            }
            Err(StoreError::Duplicate { source_url }) => {
                tracing::debug!(source, url = %source_url, "posting inserted concurrently");
                Outcome::Existed
            }
            Err(e) => {
                tracing::warn!(source, url = %p.source_url, error = %e, "insert failed, skipping posting");
                Outcome::Failed
            }
        }
    }
}
