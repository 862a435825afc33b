//! Serves the heuristic model-backend double on `STUB_BACKEND_ADDR`
//! (default 127.0.0.1:11434), so production mode can run without a model.

use anyhow::Context;
use headline_signals::analyze::{HeuristicClassifier, KeywordTables};
use headline_signals::stub_backend::{router, StubState};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    headline_signals::init_tracing("stub_backend=info,headline_signals=info,warn");

    let addr = std::env::var("STUB_BACKEND_ADDR").unwrap_or_else(|_| "127.0.0.1:11434".into());
    let model = std::env::var("MODEL_NAME").unwrap_or_else(|_| "mistral".into());
    let seed = match std::env::var("STUB_BACKEND_SEED") {
        Ok(s) => Some(s.parse::<u64>().context("invalid STUB_BACKEND_SEED")?),
        Err(_) => None,
    };
    let tables = match std::env::var("HEURISTIC_KEYWORDS_PATH") {
        Ok(p) => KeywordTables::load_from_file(p),
        Err(_) => KeywordTables::default(),
    };

    let app = router(StubState::new(HeuristicClassifier::new(tables, seed), model.clone()));
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, %model, "stub model backend listening");
    axum::serve(listener, app).await?;
    Ok(())
}
