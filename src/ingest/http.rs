// src/ingest/http.rs
//! Shared HTTP plumbing for provider adapters: user-agent rotation,
//! timeouts and retry with exponential backoff.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use reqwest::{header, Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;

use crate::ingest::user_agents::random_user_agent;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u8,
    pub backoff_base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based): base * 2^(attempt-1).
    pub fn backoff(&self, attempt: u8) -> Duration {
        let shift = u32::from(attempt.saturating_sub(1)).min(16);
        self.backoff_base.saturating_mul(1u32 << shift)
    }
}

#[derive(Clone)]
pub struct ProviderClient {
    client: Client,
    retry: RetryPolicy,
}

impl ProviderClient {
    pub fn new(timeout: Duration, retry: RetryPolicy) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(timeout)
            .build()
            .context("building provider http client")?;
        Ok(Self { client, retry })
    }

    pub fn retry(&self) -> RetryPolicy {
        self.retry
    }

    /// GET `url` and decode JSON, retrying transport errors, 429 and 5xx.
    ///
    /// `decorate` adds provider-specific query/headers; it runs once per
    /// attempt so every attempt gets a fresh user agent.
    pub async fn get_json<T, F>(&self, url: &str, decorate: F) -> Result<T>
    where
        T: DeserializeOwned,
        F: Fn(RequestBuilder) -> RequestBuilder,
    {
        let max = self.retry.max_attempts.max(1);
        let mut attempt: u8 = 0;
        loop {
            attempt += 1;
            let req = decorate(
                self.client
                    .get(url)
                    .header(header::USER_AGENT, random_user_agent())
                    .header(header::ACCEPT, "application/json")
                    .header(header::ACCEPT_LANGUAGE, "en-US,en;q=0.9"),
            );

            let err = match req.send().await {
                Ok(rsp) => {
                    let status = rsp.status();
                    if status.is_success() {
                        let body = rsp.text().await.context("reading provider body")?;
                        return serde_json::from_str(&body)
                            .with_context(|| format!("decoding provider json from {url}"));
                    }
                    if !is_retryable(status) {
                        return Err(anyhow!("provider returned HTTP {status} for {url}"));
                    }
                    anyhow!("provider returned HTTP {status} for {url}")
                }
                Err(e) => anyhow::Error::new(e).context(format!("request to {url} failed")),
            };

            if attempt >= max {
                return Err(err.context(format!("giving up after {attempt} attempts")));
            }
            let delay = self.retry.backoff(attempt);
            tracing::warn!(
                url,
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "provider request failed, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}
