// src/ingest/sync.rs
//! Run orchestration: every source in order, walk then write.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use chrono::{DateTime, Utc};
use metrics::{counter, gauge, histogram};

use crate::ingest::config::HarvestConfig;
use crate::ingest::providers::build_adapters;
use crate::ingest::types::SourceAdapter;
use crate::ingest::walker::{PageWalker, StopReason};
use crate::ingest::writer::{DedupWriter, WriteCounts};
use crate::ingest::ensure_metrics_described;
use crate::store::JobStore;

#[derive(Debug, Clone)]
pub struct SourceReport {
    pub source: String,
    pub counts: WriteCounts,
    pub pages_fetched: u32,
    /// `None` when the walk never started (checkpoint read failed).
    pub stop: Option<StopReason>,
    pub error: Option<String>,
    /// Rows stored for this source after the write, if the count succeeded.
    pub stored_total: Option<u64>,
    pub duration: Duration,
}

impl SourceReport {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub sources: Vec<SourceReport>,
    pub total_duration: Duration,
}

impl RunReport {
    pub fn totals(&self) -> WriteCounts {
        let mut t = WriteCounts::default();
        for s in &self.sources {
            t.add(s.counts);
        }
        t
    }

    pub fn source(&self, name: &str) -> Option<&SourceReport> {
        self.sources.iter().find(|s| s.source == name)
    }

    pub fn has_errors(&self) -> bool {
        self.sources.iter().any(|s| !s.is_ok())
    }

    fn log_summary(&self) {
        for s in &self.sources {
            tracing::info!(
                source = %s.source,
                new = s.counts.new,
                existing = s.counts.already_existed,
                failed = s.counts.failed,
                pages = s.pages_fetched,
                stop = ?s.stop,
                stored = ?s.stored_total,
                secs = s.duration.as_secs_f64(),
                error = s.error.as_deref().unwrap_or(""),
                "source summary"
            );
        }
        let t = self.totals();
        tracing::info!(
            new = t.new,
            existing = t.already_existed,
            failed = t.failed,
            secs = format!("{:.2}", self.total_duration.as_secs_f64()),
            finished_at = %self.finished_at,
            "harvest run completed"
        );
    }
}

/// The sync orchestrator. Holds an explicit storage handle; safe to run
/// concurrently with itself because the store enforces URL uniqueness.
pub struct Harvester {
    adapters: Vec<Arc<dyn SourceAdapter>>,
    store: Arc<dyn JobStore>,
    walker: PageWalker,
    writer: DedupWriter,
}

impl Harvester {
    pub fn new(
        adapters: Vec<Arc<dyn SourceAdapter>>,
        store: Arc<dyn JobStore>,
        walker: PageWalker,
    ) -> Self {
        let writer = DedupWriter::new(Arc::clone(&store));
        Self {
            adapters,
            store,
            walker,
            writer,
        }
    }

    pub fn from_config(cfg: &HarvestConfig, store: Arc<dyn JobStore>) -> Result<Self> {
        let adapters = build_adapters(cfg)?;
        let walker = PageWalker::new(cfg.max_pages, cfg.page_delay());
        Ok(Self::new(adapters, store, walker))
    }

    pub fn source_names(&self) -> Vec<&'static str> {
        self.adapters.iter().map(|a| a.name()).collect()
    }

    /// One full pass over every source. Never fails; per-source problems are
    /// recorded in the report.
    pub async fn run_once(&self) -> RunReport {
        ensure_metrics_described();
        let started_at = Utc::now();
        let t0 = Instant::now();
        tracing::info!(sources = ?self.source_names(), "starting harvest run");

        let mut sources = Vec::with_capacity(self.adapters.len());
        for adapter in &self.adapters {
            let report = self.run_source(adapter.as_ref()).await;
            if !report.is_ok() {
                counter!("harvest_source_errors_total", "source" => report.source.clone())
                    .increment(1);
            }
            histogram!("harvest_source_duration_ms", "source" => report.source.clone())
                .record(report.duration.as_secs_f64() * 1_000.0);
            sources.push(report);
        }

        let finished_at = Utc::now();
        gauge!("harvest_last_run_ts").set(finished_at.timestamp() as f64);

        let report = RunReport {
            started_at,
            finished_at,
            sources,
            total_duration: t0.elapsed(),
        };
        report.log_summary();
        report
    }

    async fn run_source(&self, adapter: &dyn SourceAdapter) -> SourceReport {
        let source = adapter.name();
        let t0 = Instant::now();
        tracing::info!(source, "starting source");

        let checkpoint = match self.store.latest_for_company(source).await {
            Ok(latest) => latest.map(|p| p.posted_at),
            Err(e) => {
                tracing::error!(source, error = %e, "checkpoint read failed, skipping source");
                return SourceReport {
                    source: source.to_string(),
                    counts: WriteCounts::default(),
                    pages_fetched: 0,
                    stop: None,
                    error: Some(format!("checkpoint read failed: {e}")),
                    stored_total: None,
                    duration: t0.elapsed(),
                };
            }
        };

        let walk = self.walker.walk(adapter, checkpoint).await;
        tracing::info!(
            source,
            fetched = walk.postings.len(),
            pages = walk.pages_fetched,
            checkpoint = ?walk.checkpoint,
            secs = t0.elapsed().as_secs_f64(),
            "fetch completed"
        );

        let counts = self.writer.write(source, &walk.postings).await;

        let stored_total = match self.store.count_for_company(source).await {
            Ok(n) => Some(n),
            Err(e) => {
                tracing::warn!(source, error = %e, "count failed");
                None
            }
        };

        let error = match &walk.stop {
            StopReason::FetchFailed(msg) => Some(msg.clone()),
            _ => None,
        };

        SourceReport {
            source: source.to_string(),
            counts,
            pages_fetched: walk.pages_fetched,
            stop: Some(walk.stop),
            error,
            stored_total,
            duration: t0.elapsed(),
        }
    }
}
