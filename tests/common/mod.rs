// tests/common/mod.rs
#![allow(dead_code)]

use axum::Router;
use headline_signals::analyze::{HeuristicClassifier, ModelClient, ModelSettings};
use headline_signals::stub_backend::{self, StubState};

/// Serve `app` on an ephemeral loopback port; returns its base URL.
pub async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind loopback");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}")
}

/// Backend double answering with seeded heuristic verdicts.
pub async fn serve_stub_backend(seed: u64) -> String {
    serve(stub_backend::router(StubState::new(
        HeuristicClassifier::seeded(seed),
        "mistral",
    )))
    .await
}

pub fn model_client(base_url: &str) -> ModelClient {
    ModelClient::new(ModelSettings {
        base_url: base_url.to_string(),
        timeout_secs: 5,
        probe_timeout_secs: 2,
        ..ModelSettings::default()
    })
    .expect("model client")
}

/// Envelope in the `/api/generate` response shape.
pub fn envelope(response: &str) -> serde_json::Value {
    serde_json::json!({
        "model": "mistral",
        "created_at": "2024-01-01T00:00:00Z",
        "response": response,
        "done": true,
    })
}
