/// Demo chart host: sync one asset's candlestick series and render it as
/// log lines until interrupted
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use candlesync::{
    config::load_config,
    feed::{LivePoller, MarketDataClient},
    render::LogSurface,
    sync::SyncEngine,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("📈 Candlestick sync engine");

    // Load configuration
    let config = Arc::new(load_config("config.toml")?);
    info!(
        "Configuration loaded: quote={}, history_limit={}, poll={}s",
        config.quote_currency, config.history_limit, config.poll_interval_secs
    );

    let symbol = std::env::args().nth(1).unwrap_or_else(|| "BTC".to_string());

    // One client, one poller, one surface per chart session
    let client = Arc::new(MarketDataClient::new(&config));
    let poller = Arc::new(LivePoller::new(
        client.clone(),
        Duration::from_secs(config.poll_interval_secs),
    ));
    let surface = Arc::new(LogSurface);

    let engine = Arc::new(SyncEngine::new(client, poller, surface));

    info!("Selecting asset {}...", symbol);
    if let Err(e) = engine.select_asset(&symbol).await {
        error!("Initial load for {} failed: {} ({})", symbol, e, e.error_code());
        return Err(e.into());
    }

    info!("Live. Press ctrl-c to exit.");
    tokio::signal::ctrl_c().await?;

    engine.teardown().await;
    info!("Goodbye");
    Ok(())
}
