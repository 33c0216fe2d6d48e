// src/store/mod.rs
//! Persistent posting storage.
//!
//! The harvest pipeline only needs four operations: latest posting for a
//! company, lookup by URL, insert (failing distinguishably on a duplicate
//! URL) and count per company. The read API adds `list` and `get`.
//! Uniqueness of `source_url` is enforced by the backend itself.

pub mod memory;
pub mod postgres;
pub mod query;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ingest::types::CanonicalPosting;

pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use query::{JobPage, JobQuery};

/// A posting as persisted. `company` holds the normalized provider name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StoredPosting {
    pub id: Uuid,
    pub title: String,
    pub company: String,
    pub location: String,
    pub description: String,
    pub posted_at: DateTime<Utc>,
    pub source_url: String,
    pub fetched_at: DateTime<Utc>,
}

/// Insert payload; the store assigns `id` and `fetched_at`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPosting {
    pub title: String,
    pub company: String,
    pub location: String,
    pub description: String,
    pub posted_at: DateTime<Utc>,
    pub source_url: String,
}

impl NewPosting {
    /// Build the insert payload, replacing the company with the source name.
    pub fn from_canonical(source: &str, p: &CanonicalPosting) -> Self {
        Self {
            title: p.title.clone(),
            company: source.to_string(),
            location: p.location.clone(),
            description: p.description.clone(),
            posted_at: p.posted_at,
            source_url: p.source_url.clone(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Unique constraint on `source_url` rejected the insert.
    #[error("posting already stored: {source_url}")]
    Duplicate { source_url: String },

    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("invalid posting: {0}")]
    Invalid(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, StoreError::Duplicate { .. })
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[async_trait]
pub trait JobStore: Send + Sync {
    /// Most recent posting for `company` by `posted_at` (the run checkpoint).
    async fn latest_for_company(&self, company: &str) -> StoreResult<Option<StoredPosting>>;

    async fn find_by_url(&self, source_url: &str) -> StoreResult<Option<StoredPosting>>;

    /// Insert a new posting. A duplicate URL yields [`StoreError::Duplicate`].
    async fn insert(&self, posting: NewPosting) -> StoreResult<StoredPosting>;

    async fn count_for_company(&self, company: &str) -> StoreResult<u64>;

    /// Filtered, paginated read, newest first.
    async fn list(&self, query: &JobQuery) -> StoreResult<JobPage>;

    async fn get(&self, id: Uuid) -> StoreResult<Option<StoredPosting>>;

    /// Release backend resources. Later calls may fail.
    async fn close(&self) {}
}
