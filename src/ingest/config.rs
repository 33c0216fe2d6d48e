// src/ingest/config.rs
use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::ingest::http::RetryPolicy;

pub const ENV_PATH: &str = "HARVEST_CONFIG_PATH";
const DEFAULT_PATH: &str = "config/harvest.toml";
const KNOWN_SOURCES: &[&str] = &["amazon", "microsoft"];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HarvestConfig {
    /// Seconds between scheduled runs.
    pub interval_secs: u64,
    /// Hard cap on pages per source per run.
    pub max_pages: u32,
    pub page_delay_ms: u64,
    pub request_timeout_secs: u64,
    pub max_attempts: u8,
    pub backoff_base_ms: u64,
    /// Run order; sources are processed one after another.
    pub sources: Vec<String>,
    pub amazon: AmazonConfig,
    pub microsoft: MicrosoftConfig,
    pub server: ServerConfig,
    /// Postgres URL; in-memory storage when unset.
    pub database_url: Option<String>,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            interval_secs: 3600,
            max_pages: 3,
            page_delay_ms: 1000,
            request_timeout_secs: 15,
            max_attempts: 3,
            backoff_base_ms: 500,
            sources: vec!["microsoft".into(), "amazon".into()],
            amazon: AmazonConfig::default(),
            microsoft: MicrosoftConfig::default(),
            server: ServerConfig::default(),
            database_url: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AmazonConfig {
    pub base_url: String,
    pub page_size: u32,
    pub country: String,
    pub loc_query: String,
}

impl Default for AmazonConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.amazon.jobs/en/search.json".into(),
            page_size: 100,
            country: "IND".into(),
            loc_query: "India".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MicrosoftConfig {
    pub base_url: String,
    pub page_size: u32,
    pub order: String,
    pub locale: String,
}

impl Default for MicrosoftConfig {
    fn default() -> Self {
        Self {
            base_url: "https://gcsservices.careers.microsoft.com/search/api/v1/search".into(),
            page_size: 20,
            order: "Relevance".into(),
            locale: "en_us".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".into(),
            port: 8080,
        }
    }
}

impl HarvestConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts.max(1),
            backoff_base: Duration::from_millis(self.backoff_base_ms),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.bind, self.server.port)
    }

    fn validate(&self) -> Result<()> {
        if self.max_pages == 0 {
            bail!("max_pages must be at least 1");
        }
        if self.amazon.page_size == 0 || self.microsoft.page_size == 0 {
            bail!("page_size must be at least 1");
        }
        let mut seen = HashSet::new();
        for s in &self.sources {
            let key = s.trim().to_ascii_lowercase();
            if !KNOWN_SOURCES.contains(&key.as_str()) {
                bail!("unknown source `{s}` (known: {})", KNOWN_SOURCES.join(", "));
            }
            if !seen.insert(key) {
                bail!("source `{s}` listed more than once");
            }
        }
        Ok(())
    }

    /// Apply `PORT` and `DATABASE_URL` from the environment.
    fn apply_env(mut self) -> Result<Self> {
        if let Ok(port) = std::env::var("PORT") {
            self.server.port = port
                .trim()
                .parse()
                .with_context(|| format!("PORT is not a valid port: {port}"))?;
        }
        if let Ok(url) = std::env::var("DATABASE_URL") {
            if !url.trim().is_empty() {
                self.database_url = Some(url);
            }
        }
        Ok(self)
    }
}

/// Load config from an explicit TOML path (no env overrides).
pub fn load_config_from(path: &Path) -> Result<HarvestConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading harvest config from {}", path.display()))?;
    let cfg: HarvestConfig = toml::from_str(&content)
        .with_context(|| format!("parsing harvest config {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Load config using env var + fallbacks, then apply env overrides:
/// 1) $HARVEST_CONFIG_PATH
/// 2) config/harvest.toml
/// 3) built-in defaults
pub fn load_config_default() -> Result<HarvestConfig> {
    let cfg = if let Ok(p) = std::env::var(ENV_PATH) {
        let pb = PathBuf::from(p);
        if !pb.exists() {
            return Err(anyhow!("{ENV_PATH} points to non-existent path"));
        }
        load_config_from(&pb)?
    } else {
        let fallback = PathBuf::from(DEFAULT_PATH);
        if fallback.exists() {
            load_config_from(&fallback)?
        } else {
            HarvestConfig::default()
        }
    };
    cfg.apply_env()
}
