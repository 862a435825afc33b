// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod analyze;
pub mod api;
pub mod bootstrap;
pub mod cache;
pub mod config;
pub mod ingest;
pub mod metrics;
pub mod pipeline;
pub mod signal;
pub mod stub_backend;

// ---- Re-exports for stable public API ----
pub use crate::api::{router, AppState};
pub use crate::bootstrap::AppRuntime;
pub use crate::cache::SignalCache;
pub use crate::config::PipelineConfig;
pub use crate::pipeline::{Pipeline, PipelineError, RunReport};
pub use crate::signal::{AnalysisResult, Mode, SignalSet};

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global tracing subscriber. `RUST_LOG` wins over `default_filter`;
/// `LOG_FORMAT=json` switches to JSON lines. A no-op if a subscriber is already set.
pub fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    let _ = if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().compact()).try_init()
    };
}
