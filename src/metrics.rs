use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge, describe_histogram, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series show up on /metrics).
pub fn describe_all() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("pipeline_runs_total", "Pipeline runs started.");
        describe_counter!(
            "pipeline_run_failures_total",
            "Pipeline runs that ended without publishing."
        );
        describe_counter!(
            "source_headlines_total",
            "Headlines extracted per source before de-duplication."
        );
        describe_counter!("source_errors_total", "Source fetch/parse failures.");
        describe_counter!(
            "analysis_outcomes_total",
            "Per-headline analysis outcomes (analyzed, parse_failure, unavailable)."
        );
        describe_gauge!("signals_published", "Signals in the latest published set.");
        describe_gauge!(
            "signal_cache_generation",
            "Generation counter of the signal cache."
        );
        describe_histogram!("pipeline_run_ms", "End-to-end pipeline run time in milliseconds.");
    });
}

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the global Prometheus recorder. Fails if one is already installed.
    pub fn init() -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new().install_recorder()?;
        describe_all();
        gauge!("signal_cache_generation").set(0.0);
        Ok(Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
