use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use tower_http::cors::CorsLayer;
use tracing::error;

use crate::analyze::ModelClient;
use crate::pipeline::Pipeline;
use crate::signal::SignalSet;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    /// `None` when the service was configured for demo mode only.
    pub model: Option<Arc<ModelClient>>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/signals", get(signals))
        .route("/signals/cached", get(signals_cached))
        .route("/health", get(health))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Serialize)]
struct SignalsOut<'a> {
    #[serde(flatten)]
    set: &'a SignalSet,
    generation: u64,
}

async fn root(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "service": env!("CARGO_PKG_NAME"),
        "status": "running",
        "mode": state.pipeline.mode(),
        "endpoints": {
            "signals": "/signals",
            "cached_signals": "/signals/cached",
            "health": "/health",
        },
    }))
}

/// Runs the pipeline once and returns what it published.
async fn signals(State(state): State<AppState>) -> Response {
    match state.pipeline.run().await {
        Ok(report) => Json(SignalsOut {
            set: &report.set,
            generation: report.generation,
        })
        .into_response(),
        Err(e) => {
            error!(target: "api", error = %e, "pipeline run failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

/// Never fails; an empty set is a valid answer.
async fn signals_cached(State(state): State<AppState>) -> Response {
    let entry = state.pipeline.cache().snapshot();
    Json(SignalsOut {
        set: &entry.set,
        generation: entry.generation,
    })
    .into_response()
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let (backend, model_available) = match &state.model {
        Some(client) => {
            let status = client.probe().await;
            (status.label(), status.model_available)
        }
        None => ("disabled", false),
    };
    let entry = state.pipeline.cache().snapshot();
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now(),
        "backend": backend,
        "model_available": model_available,
        "mode": state.pipeline.mode(),
        "cached_signals": entry.set.count(),
        "generation": entry.generation,
    }))
}
