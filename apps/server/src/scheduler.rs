//! Background scheduler for periodic quote sync.
//!
//! Every tick runs one cycle per configured provider. Providers run
//! concurrently; each provider's cycle is sequential internally.

use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};

use crate::main_lib::AppState;
use marketcache_core::quotes::{SyncReport, SyncStatus};

/// Runs the scheduler until the process is stopped, or a single tick when
/// `run_once` is set.
pub async fn run_scheduler(state: Arc<AppState>, every: Duration, run_once: bool) {
    if run_once {
        run_tick(&state).await;
        return;
    }

    info!("Quote sync scheduler started ({}s interval)", every.as_secs());

    // First tick is immediate, subsequent ticks are `every` apart
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        run_tick(&state).await;
    }
}

/// Runs one cycle for every provider and returns the reports.
pub async fn run_tick(state: &AppState) -> Vec<SyncReport> {
    if state.sync_services.is_empty() {
        return Vec::new();
    }

    let reports = join_all(
        state
            .sync_services
            .iter()
            .map(|service| service.run_sync_cycle()),
    )
    .await;

    let failed = reports
        .iter()
        .filter(|r| r.status == SyncStatus::Failed)
        .count();
    if failed > 0 {
        warn!(
            "Sync tick finished: {} of {} provider(s) failed",
            failed,
            reports.len()
        );
    } else {
        info!("Sync tick finished for {} provider(s)", reports.len());
    }

    reports
}
