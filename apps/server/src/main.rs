mod config;
mod main_lib;
mod scheduler;

use config::Config;
use main_lib::{build_state, init_tracing};
use scheduler::WatchlistRefresher;
use tokio::sync::watch;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_tracing();
    let state = build_state(&config).await?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let refresher = WatchlistRefresher::new(
        state.market_data_service.clone(),
        config.watchlist.clone(),
        config.refresh_interval,
    )
    .spawn(shutdown_rx);

    tracing::info!("Marketfeed running; press Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown requested");

    // receiver may already be gone if the refresher exited
    let _ = shutdown_tx.send(true);
    if let Err(e) = refresher.await {
        tracing::warn!("Watchlist refresher ended abnormally: {}", e);
    }

    state.shutdown();
    drop(state);
    Ok(())
}
