// src/stub_backend.rs
//! Local stand-in for the model backend. Speaks the `/api/generate` + `/api/tags`
//! contract and answers with heuristic verdicts, so production mode can run
//! without a language model.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

use crate::analyze::HeuristicClassifier;
use crate::ingest::headline_id;

static RE_HEADLINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Headline:\s*(.+?)(?:\n|$)").expect("headline regex"));

#[derive(Clone)]
pub struct StubState {
    pub classifier: Arc<HeuristicClassifier>,
    pub model: String,
}

impl StubState {
    pub fn new(classifier: HeuristicClassifier, model: impl Into<String>) -> Self {
        Self {
            classifier: Arc::new(classifier),
            model: model.into(),
        }
    }
}

pub fn router(state: StubState) -> Router {
    Router::new()
        .route("/api/generate", post(generate))
        .route("/api/tags", get(tags))
        .with_state(state)
}

/// The headline on the prompt's `Headline:` line, if any.
pub fn headline_from_prompt(prompt: &str) -> Option<&str> {
    RE_HEADLINE
        .captures(prompt)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
        .filter(|h| !h.is_empty())
}

#[derive(Deserialize)]
struct GenerateIn {
    #[serde(default)]
    model: Option<String>,
    prompt: String,
}

#[derive(Serialize)]
struct GenerateOut {
    model: String,
    created_at: chrono::DateTime<chrono::Utc>,
    response: String,
    done: bool,
}

async fn generate(State(state): State<StubState>, Json(req): Json<GenerateIn>) -> Response {
    let model = req.model.unwrap_or_else(|| state.model.clone());
    let response = match headline_from_prompt(&req.prompt) {
        Some(headline) => {
            let verdict = state.classifier.verdict(headline);
            debug!(target: "stub_backend", id = %headline_id(headline), signal = %verdict.signal, "verdict");
            match serde_json::to_string_pretty(&verdict) {
                Ok(s) => s,
                Err(e) => {
                    warn!(target: "stub_backend", error = %e, "serializing verdict failed");
                    return (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        Json(json!({ "error": e.to_string() })),
                    )
                        .into_response();
                }
            }
        }
        None => json!({ "error": "No headline found in prompt" }).to_string(),
    };
    Json(GenerateOut {
        model,
        created_at: chrono::Utc::now(),
        response,
        done: true,
    })
    .into_response()
}

async fn tags(State(state): State<StubState>) -> impl IntoResponse {
    Json(json!({
        "models": [{ "name": format!("{}:latest", state.model) }],
    }))
}
