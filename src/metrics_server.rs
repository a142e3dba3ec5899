use std::sync::Arc;

use axum::{extract::State, routing::get, Router};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

use crate::client::DeviceApi;
use crate::{emit, resolver};

static PROM_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Install the recorder backing the `metrics` macros used across the crate.
/// The rendered output is appended to every `/metrics` response.
pub fn init_recorder() {
    let builder = PrometheusBuilder::new();
    let handle = builder
        .install_recorder()
        .expect("failed to install Prometheus metrics recorder");

    // Ignore error if the handle was already set; this should only be called once.
    let _ = PROM_HANDLE.set(handle);
}

#[derive(Clone)]
struct AppState {
    device: Arc<dyn DeviceApi>,
}

/// Serve the scrape endpoint until the process exits.
pub async fn serve(bind_addr: &str, device: Arc<dyn DeviceApi>) -> anyhow::Result<()> {
    let app = Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/healthz", get(healthz_handler))
        .with_state(AppState { device });

    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .map_err(|e| anyhow::anyhow!("failed to bind scrape listener on {bind_addr}: {e}"))?;

    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}

/// One scrape cycle: resolve the device status, map it to samples, render.
///
/// Cycles are independent; a failed cycle reports `shelly_up 0` with no
/// other device samples and never affects the next scrape.
async fn metrics_handler(State(state): State<AppState>) -> String {
    metrics::counter!("shelly_scrape_cycles_total").increment(1);

    let mut samples = Vec::new();
    match resolver::resolve_status(state.device.as_ref()).await {
        Ok(status) => {
            samples.push(emit::up_sample(true));
            samples.extend(emit::collect_status(&status));
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to scrape device");
            metrics::counter!("shelly_scrape_failures_total").increment(1);
            samples.push(emit::up_sample(false));
        }
    }

    let mut body = emit::render_text(&samples);
    if let Some(handle) = PROM_HANDLE.get() {
        body.push_str(&handle.render());
    }
    body
}

async fn healthz_handler() -> &'static str {
    "ok"
}
