// src/ingest/scheduler.rs
use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::ingest::sync::Harvester;

/// Owns the ticker task. Dropping the handle does not stop it; call `stop`.
pub struct SchedulerHandle {
    ticker: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Stop scheduling new runs. A run already in flight is left to finish.
    pub fn stop(self) {
        self.ticker.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.ticker.is_finished()
    }
}

/// Run the harvester now and then every `period`.
///
/// Each tick spawns its own run task. A tick that lands while the previous
/// run still holds the guard is skipped; `Harvester::run_once` stays safe to
/// overlap if called from elsewhere.
pub fn spawn_scheduler(harvester: Arc<Harvester>, period: Duration) -> SchedulerHandle {
    let guard = Arc::new(Mutex::new(()));
    let ticker = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            // First tick completes immediately: the eager run at startup.
            ticker.tick().await;

            let Ok(permit) = Arc::clone(&guard).try_lock_owned() else {
                tracing::warn!("previous harvest run still in progress, skipping tick");
                counter!("harvest_runs_skipped_total").increment(1);
                continue;
            };

            let harvester = Arc::clone(&harvester);
            tokio::spawn(async move {
                let _permit = permit;
                counter!("harvest_runs_total").increment(1);
                let report = harvester.run_once().await;
                if report.has_errors() {
                    tracing::warn!(target: "harvest", "scheduled run finished with source errors");
                }
            });
        }
    });
    SchedulerHandle { ticker }
}
