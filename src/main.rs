//! Job Harvester: binary entrypoint.
//! Boots storage, the harvest scheduler and the read API.

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use job_harvester::api::{self, AppState};
use job_harvester::ingest::config::load_config_default;
use job_harvester::ingest::scheduler::spawn_scheduler;
use job_harvester::ingest::Harvester;
use job_harvester::metrics::Metrics;
use job_harvester::store::{JobStore, MemoryStore, PgStore};

/// Compact logs by default, JSON lines when `LOG_FORMAT=json`.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("job_harvester=info,warn"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = load_config_default().context("loading harvest config")?;
    let metrics = Metrics::init()?;

    let store: Arc<dyn JobStore> = match cfg.database_url.as_deref() {
        Some(url) => Arc::new(PgStore::connect(url).await?),
        None => {
            tracing::warn!("DATABASE_URL not set, postings are kept in memory only");
            Arc::new(MemoryStore::new())
        }
    };

    let harvester = Arc::new(Harvester::from_config(&cfg, Arc::clone(&store))?);
    tracing::info!(
        sources = ?harvester.source_names(),
        interval_secs = cfg.interval_secs,
        "starting harvest scheduler"
    );
    let scheduler = spawn_scheduler(harvester, cfg.interval());

    let app = api::router(AppState::new(Arc::clone(&store))).merge(metrics.router());
    let addr = cfg.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, "API server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving API")?;

    tracing::info!("stopping scheduler");
    scheduler.stop();
    store.close().await;
    Ok(())
}
