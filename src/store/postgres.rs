// src/store/postgres.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use uuid::Uuid;

use super::{JobPage, JobQuery, JobStore, NewPosting, StoreError, StoreResult, StoredPosting};

const COLUMNS: &str =
    "id, title, company, location, description, posted_at, source_url, fetched_at";

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS jobs (
        id          UUID PRIMARY KEY,
        title       TEXT NOT NULL,
        company     TEXT NOT NULL,
        location    TEXT NOT NULL,
        description TEXT NOT NULL,
        posted_at   TIMESTAMPTZ NOT NULL,
        source_url  TEXT NOT NULL UNIQUE,
        fetched_at  TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    "CREATE INDEX IF NOT EXISTS jobs_company_posted_at_idx ON jobs (company, posted_at DESC)",
    "CREATE INDEX IF NOT EXISTS jobs_posted_at_idx ON jobs (posted_at DESC)",
];

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect and make sure the `jobs` table exists.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(url)
            .await
            .context("Failed to connect to Postgres")?;
        let store = Self::new(pool);
        store.ensure_schema().await?;
        Ok(store)
    }

    pub async fn ensure_schema(&self) -> Result<()> {
        for stmt in SCHEMA {
            sqlx::query(stmt)
                .execute(&self.pool)
                .await
                .context("Failed to apply jobs schema")?;
        }
        Ok(())
    }
}

fn row_to_posting(r: &PgRow) -> StoredPosting {
    StoredPosting {
        id: r.get("id"),
        title: r.get("title"),
        company: r.get("company"),
        location: r.get("location"),
        description: r.get("description"),
        posted_at: r.get("posted_at"),
        source_url: r.get("source_url"),
        fetched_at: r.get("fetched_at"),
    }
}

/// Escape LIKE metacharacters and wrap in `%..%`.
fn like_pattern(s: &str) -> String {
    let escaped = s
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, q: &JobQuery) {
    qb.push(" WHERE TRUE");
    if let Some(c) = &q.company {
        qb.push(" AND company ILIKE ").push_bind(like_pattern(c));
    }
    if let Some(l) = &q.location {
        qb.push(" AND location ILIKE ").push_bind(like_pattern(l));
    }
    if let Some(s) = &q.search {
        let pat = like_pattern(s);
        qb.push(" AND (title ILIKE ")
            .push_bind(pat.clone())
            .push(" OR company ILIKE ")
            .push_bind(pat.clone())
            .push(" OR description ILIKE ")
            .push_bind(pat)
            .push(")");
    }
}

#[async_trait]
impl JobStore for PgStore {
    async fn latest_for_company(&self, company: &str) -> StoreResult<Option<StoredPosting>> {
        let row = sqlx::query(&format!(
            "SELECT {COLUMNS} FROM jobs WHERE company = $1 ORDER BY posted_at DESC LIMIT 1"
        ))
        .bind(company)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(row_to_posting))
    }

    async fn find_by_url(&self, source_url: &str) -> StoreResult<Option<StoredPosting>> {
        let row = sqlx::query(&format!("SELECT {COLUMNS} FROM jobs WHERE source_url = $1"))
            .bind(source_url)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(row_to_posting))
    }

    async fn insert(&self, posting: NewPosting) -> StoreResult<StoredPosting> {
        let res = sqlx::query(&format!(
            r#"
            INSERT INTO jobs (id, title, company, location, description, posted_at, source_url)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&posting.title)
        .bind(&posting.company)
        .bind(&posting.location)
        .bind(&posting.description)
        .bind(posting.posted_at)
        .bind(&posting.source_url)
        .fetch_one(&self.pool)
        .await;

        match res {
            Ok(row) => Ok(row_to_posting(&row)),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(StoreError::Duplicate {
                    source_url: posting.source_url,
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn count_for_company(&self, company: &str) -> StoreResult<u64> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM jobs WHERE company = $1")
            .bind(company)
            .fetch_one(&self.pool)
            .await?;
        Ok(n.max(0) as u64)
    }

    async fn list(&self, query: &JobQuery) -> StoreResult<JobPage> {
        let mut count_qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM jobs");
        push_filters(&mut count_qb, query);
        let total: i64 = count_qb.build_query_scalar().fetch_one(&self.pool).await?;

        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM jobs"));
        push_filters(&mut qb, query);
        qb.push(" ORDER BY posted_at DESC, id LIMIT ")
            .push_bind(i64::from(query.limit))
            .push(" OFFSET ")
            .push_bind(i64::try_from(query.offset()).unwrap_or(i64::MAX));
        let rows = qb.build().fetch_all(&self.pool).await?;

        let jobs = rows.iter().map(row_to_posting).collect();
        Ok(JobPage::new(query, total.max(0) as u64, jobs))
    }

    async fn get(&self, id: Uuid) -> StoreResult<Option<StoredPosting>> {
        let row = sqlx::query(&format!("SELECT {COLUMNS} FROM jobs WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(row_to_posting))
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
