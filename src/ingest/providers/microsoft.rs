// src/ingest/providers/microsoft.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::header;
use serde::Deserialize;

use crate::ingest::config::MicrosoftConfig;
use crate::ingest::http::ProviderClient;
use crate::ingest::types::{CanonicalPosting, Page, PageToken, SourceAdapter};
use crate::ingest::{clean_description, clean_field, parse_posted_at};

pub const NAME: &str = "Microsoft";
const LISTING_BASE: &str = "https://careers.microsoft.com/us/en/job";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResponse {
    operation_result: OperationResult,
}

#[derive(Debug, Deserialize)]
struct OperationResult {
    result: SearchResult,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    jobs: Vec<MicrosoftJob>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MicrosoftJob {
    job_id: Option<String>,
    title: Option<String>,
    posting_date: Option<String>,
    properties: Option<Properties>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Properties {
    primary_location: Option<String>,
    locations: Option<Vec<String>>,
    description: Option<String>,
}

/// Page-numbered adapter for the Microsoft careers search API.
pub struct MicrosoftAdapter {
    client: ProviderClient,
    cfg: MicrosoftConfig,
}

impl MicrosoftAdapter {
    pub fn new(client: ProviderClient, cfg: MicrosoftConfig) -> Self {
        Self { client, cfg }
    }

    pub fn canonical_url(job_id: &str) -> String {
        format!("{LISTING_BASE}/{}", job_id.trim())
    }

    /// Parse one search response body. Records without a `jobId` are skipped.
    pub fn parse_page(body: &str) -> Result<Page> {
        let resp: SearchResponse =
            serde_json::from_str(body).context("parsing microsoft search json")?;
        Ok(Self::to_page(resp))
    }

    fn to_page(resp: SearchResponse) -> Page {
        let now = Utc::now();
        let jobs = resp.operation_result.result.jobs;
        let raw_len = jobs.len();
        let mut postings = Vec::with_capacity(raw_len);

        for job in jobs {
            let Some(id) = job.job_id.as_deref().filter(|id| !id.trim().is_empty()) else {
                tracing::warn!(
                    provider = NAME,
                    title = job.title.as_deref().unwrap_or_default(),
                    "job without jobId skipped"
                );
                continue;
            };

            let props = job.properties.unwrap_or_default();
            let location = props
                .primary_location
                .as_deref()
                .filter(|l| !l.trim().is_empty())
                .or_else(|| props.locations.as_ref()?.first().map(String::as_str));

            postings.push(CanonicalPosting {
                title: clean_field(job.title.as_deref()),
                company: NAME.to_string(),
                location: clean_field(location),
                description: clean_description(props.description.as_deref()),
                posted_at: parse_posted_at(job.posting_date.as_deref(), now),
                source_url: Self::canonical_url(id),
            });
        }

        Page { postings, raw_len }
    }
}

#[async_trait]
impl SourceAdapter for MicrosoftAdapter {
    fn name(&self) -> &'static str {
        NAME
    }

    fn first_page(&self) -> PageToken {
        PageToken::Number(1)
    }

    fn next_page(&self, current: PageToken) -> PageToken {
        match current {
            PageToken::Number(n) => PageToken::Number(n + 1),
            PageToken::Offset(o) => PageToken::Number(o / self.cfg.page_size.max(1) + 2),
        }
    }

    async fn fetch_page(&self, token: PageToken) -> Result<Page> {
        let page = match token {
            PageToken::Number(n) => n,
            PageToken::Offset(o) => o / self.cfg.page_size.max(1) + 1,
        };
        let page_s = page.to_string();
        let size_s = self.cfg.page_size.to_string();

        let resp: SearchResponse = self
            .client
            .get_json(&self.cfg.base_url, |req| {
                req.query(&[
                    ("l", self.cfg.locale.as_str()),
                    ("pg", page_s.as_str()),
                    ("pgSz", size_s.as_str()),
                    ("o", self.cfg.order.as_str()),
                    ("flt", "true"),
                ])
                .header(header::REFERER, "https://careers.microsoft.com/")
            })
            .await
            .with_context(|| format!("microsoft fetch of page {page}"))?;

        Ok(Self::to_page(resp))
    }
}
