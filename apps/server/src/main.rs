mod config;
mod main_lib;
mod scheduler;

use config::Config;
use main_lib::{build_state, init_tracing};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env();
    init_tracing();
    let state = build_state(&config).await?;
    tracing::info!(
        "Quote cache ready at {} with {} provider(s)",
        state.db_path,
        state.sync_services.len()
    );

    tokio::select! {
        _ = scheduler::run_scheduler(state.clone(), config.sync_interval, config.run_once) => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }
    Ok(())
}
