//! Headline Signals — Binary Entrypoint
//! Loads configuration, builds the runtime (falling back to demo mode when the
//! model backend is down) and serves the query API plus `/metrics`.

use headline_signals::metrics::Metrics;
use headline_signals::{AppRuntime, PipelineConfig};
use shuttle_axum::ShuttleAxum;
use tracing::info;

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    headline_signals::init_tracing("headline_signals=info,warn");

    let cfg = PipelineConfig::load_default()?;
    let metrics = Metrics::init()?;
    let runtime = AppRuntime::from_config(cfg).await?;
    info!(mode = %runtime.mode(), "headline signals service starting");

    let router = runtime.router().merge(metrics.router());
    Ok(router.into())
}
