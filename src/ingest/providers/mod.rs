// src/ingest/providers/mod.rs
pub mod amazon;
pub mod microsoft;

use std::sync::Arc;

use anyhow::{bail, Result};

use crate::ingest::config::HarvestConfig;
use crate::ingest::http::ProviderClient;
use crate::ingest::types::SourceAdapter;

pub use amazon::AmazonAdapter;
pub use microsoft::MicrosoftAdapter;

/// Build adapters in the configured order.
pub fn build_adapters(cfg: &HarvestConfig) -> Result<Vec<Arc<dyn SourceAdapter>>> {
    let client = ProviderClient::new(cfg.request_timeout(), cfg.retry_policy())?;

    let mut out: Vec<Arc<dyn SourceAdapter>> = Vec::with_capacity(cfg.sources.len());
    for name in &cfg.sources {
        match name.trim().to_ascii_lowercase().as_str() {
            "amazon" => out.push(Arc::new(AmazonAdapter::new(
                client.clone(),
                cfg.amazon.clone(),
            ))),
            "microsoft" => out.push(Arc::new(MicrosoftAdapter::new(
                client.clone(),
                cfg.microsoft.clone(),
            ))),
            other => bail!("unknown source in config: {other}"),
        }
    }
    Ok(out)
}
