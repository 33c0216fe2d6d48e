// src/ingest/providers/amazon.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;

use crate::ingest::config::AmazonConfig;
use crate::ingest::http::ProviderClient;
use crate::ingest::types::{CanonicalPosting, Page, PageToken, SourceAdapter};
use crate::ingest::{clean_description, clean_field, parse_posted_at};

pub const NAME: &str = "Amazon";
const LISTING_BASE: &str = "https://amazon.jobs";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    jobs: Vec<AmazonJob>,
}

#[derive(Debug, Deserialize)]
struct AmazonJob {
    title: Option<String>,
    company_name: Option<String>,
    normalized_location: Option<String>,
    description: Option<String>,
    posted_date: Option<String>,
    job_path: Option<String>,
}

/// Offset-paged adapter for the amazon.jobs search endpoint.
pub struct AmazonAdapter {
    client: ProviderClient,
    cfg: AmazonConfig,
}

impl AmazonAdapter {
    pub fn new(client: ProviderClient, cfg: AmazonConfig) -> Self {
        Self { client, cfg }
    }

    /// Public listing URL for a `job_path` such as `/en/jobs/123/title`.
    pub fn canonical_url(job_path: &str) -> String {
        format!("{LISTING_BASE}/{}", job_path.trim().trim_start_matches('/'))
    }

    /// Parse one search response body. Records without a `job_path` are
    /// skipped because they have no stable dedup key.
    pub fn parse_page(body: &str) -> Result<Page> {
        let resp: SearchResponse =
            serde_json::from_str(body).context("parsing amazon search json")?;
        Ok(Self::to_page(resp))
    }

    fn to_page(resp: SearchResponse) -> Page {
        let now = Utc::now();
        let raw_len = resp.jobs.len();
        let mut postings = Vec::with_capacity(raw_len);

        for job in resp.jobs {
            let Some(path) = job.job_path.as_deref().filter(|p| !p.trim().is_empty()) else {
                tracing::warn!(
                    provider = NAME,
                    title = job.title.as_deref().unwrap_or_default(),
                    "job without job_path skipped"
                );
                continue;
            };

            postings.push(CanonicalPosting {
                title: clean_field(job.title.as_deref()),
                company: clean_field(job.company_name.as_deref()),
                location: clean_field(job.normalized_location.as_deref()),
                description: clean_description(job.description.as_deref()),
                posted_at: parse_posted_at(job.posted_date.as_deref(), now),
                source_url: Self::canonical_url(path),
            });
        }

        Page { postings, raw_len }
    }
}

#[async_trait]
impl SourceAdapter for AmazonAdapter {
    fn name(&self) -> &'static str {
        NAME
    }

    fn first_page(&self) -> PageToken {
        PageToken::Offset(0)
    }

    fn next_page(&self, current: PageToken) -> PageToken {
        match current {
            PageToken::Offset(o) => PageToken::Offset(o.saturating_add(self.cfg.page_size)),
            PageToken::Number(n) => PageToken::Offset(n.saturating_mul(self.cfg.page_size)),
        }
    }

    async fn fetch_page(&self, token: PageToken) -> Result<Page> {
        let offset = match token {
            PageToken::Offset(o) => o,
            PageToken::Number(n) => n.saturating_sub(1).saturating_mul(self.cfg.page_size),
        };
        let offset_s = offset.to_string();
        let limit_s = self.cfg.page_size.to_string();

        let resp: SearchResponse = self
            .client
            .get_json(&self.cfg.base_url, |req| {
                req.query(&[
                    ("radius", "24km"),
                    ("offset", offset_s.as_str()),
                    ("result_limit", limit_s.as_str()),
                    ("sort", "relevant"),
                    ("country", self.cfg.country.as_str()),
                    ("loc_query", self.cfg.loc_query.as_str()),
                ])
            })
            .await
            .with_context(|| format!("amazon fetch at offset {offset}"))?;

        Ok(Self::to_page(resp))
    }
}
