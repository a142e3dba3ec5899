use std::sync::Arc;

use anyhow::Result;
use shelly_exporter::{
    client::ShellyClient,
    config::AppConfig,
    metrics_server, observability,
};

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let cfg = AppConfig::load()?;

    metrics_server::init_recorder();

    let client = ShellyClient::new(&cfg.device)
        .map_err(|e| anyhow::anyhow!("failed to build device client: {e}"))?;

    tracing::info!(
        device = %cfg.device.host,
        bind = %cfg.server.bind_addr,
        "starting shelly exporter"
    );

    metrics_server::serve(&cfg.server.bind_addr, Arc::new(client)).await
}
