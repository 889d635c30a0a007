use anyhow::Result;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

use pulsewatch::api::{self, ApiState};
use pulsewatch::config::Config;
use pulsewatch::engine::Prober;
use pulsewatch::store;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_ansi(true)
        .init();

    let config = Config::from_env()?;
    let store = store::open(&config).await?;

    let api_state = ApiState {
        store: Arc::clone(&store),
        host: config.target_host(),
        key: config.storage_key(),
    };
    let api_port = config.api_port;
    tokio::spawn(async move {
        if let Err(err) = api::start_server(api_port, api_state).await {
            error!("status server failed: {err:#}");
        }
    });

    let prober = Prober::new(config, store);
    tokio::spawn(prober.run());

    signal::ctrl_c().await?;
    info!("shutdown signal received, stopping watcher");
    Ok(())
}
