// src/bootstrap.rs
use std::sync::Arc;

use axum::Router;
use tracing::{info, warn};

use crate::analyze::{DynAnalyzer, HeuristicClassifier, KeywordTables, ModelClient};
use crate::api::{self, AppState};
use crate::cache::SignalCache;
use crate::config::PipelineConfig;
use crate::ingest::providers::{HtmlSource, SampleSource};
use crate::ingest::types::HeadlineSource;
use crate::pipeline::Pipeline;
use crate::signal::Mode;

/// Everything a running service needs, built once from configuration.
pub struct AppRuntime {
    pub cfg: PipelineConfig,
    pub pipeline: Arc<Pipeline>,
    /// Present whenever production mode was configured, even after falling back,
    /// so health checks keep reporting backend reachability.
    pub model: Option<Arc<ModelClient>>,
}

impl AppRuntime {
    pub async fn from_config(cfg: PipelineConfig) -> anyhow::Result<Self> {
        let mut mode = cfg.mode;
        let model = match cfg.mode {
            Mode::Production => Some(Arc::new(ModelClient::new(cfg.model.clone())?)),
            Mode::Demo => None,
        };

        if let (Some(client), true) = (&model, cfg.fallback_to_demo) {
            let status = client.probe().await;
            if status.reachable {
                if !status.model_available {
                    warn!(target: "bootstrap", model = %cfg.model.model, "model not listed by backend");
                }
            } else {
                warn!(
                    target: "bootstrap",
                    base_url = %cfg.model.base_url,
                    "model backend unreachable; falling back to demo mode"
                );
                mode = Mode::Demo;
            }
        }

        let (sources, analyzer): (Vec<Arc<dyn HeadlineSource>>, DynAnalyzer) = match (mode, &model) {
            (Mode::Production, Some(client)) => (html_sources(&cfg), client.clone() as DynAnalyzer),
            _ => (demo_sources(&cfg), Arc::new(heuristic(&cfg)) as DynAnalyzer),
        };

        let cache = Arc::new(SignalCache::new(mode));
        let pipeline = Pipeline::new(sources, analyzer, cache, mode)
            .with_min_confidence(cfg.min_confidence)
            .with_max_headlines(cfg.max_headlines);

        info!(
            target: "bootstrap",
            configured = %cfg.mode,
            %mode,
            backend = %pipeline.analyzer().backend(),
            min_confidence = pipeline.min_confidence(),
            "runtime ready"
        );

        Ok(Self {
            cfg,
            pipeline: Arc::new(pipeline),
            model,
        })
    }

    pub fn mode(&self) -> Mode {
        self.pipeline.mode()
    }

    pub fn state(&self) -> AppState {
        AppState {
            pipeline: Arc::clone(&self.pipeline),
            model: self.model.clone(),
        }
    }

    pub fn router(&self) -> Router {
        api::router(self.state())
    }
}

fn html_sources(cfg: &PipelineConfig) -> Vec<Arc<dyn HeadlineSource>> {
    cfg.sources
        .iter()
        .filter_map(|d| match HtmlSource::new(d.clone()) {
            Ok(s) => Some(Arc::new(s) as Arc<dyn HeadlineSource>),
            Err(e) => {
                warn!(target: "bootstrap", source = %d.name, error = %e, "source skipped");
                None
            }
        })
        .collect()
}

fn demo_sources(cfg: &PipelineConfig) -> Vec<Arc<dyn HeadlineSource>> {
    vec![Arc::new(SampleSource::new(
        cfg.demo.headlines.clone(),
        cfg.demo.sample_min,
        cfg.demo.sample_max,
        cfg.demo.seed,
    ))]
}

fn heuristic(cfg: &PipelineConfig) -> HeuristicClassifier {
    let tables = match &cfg.heuristic.keywords_path {
        Some(p) => KeywordTables::load_from_file(p),
        None => KeywordTables::default(),
    };
    HeuristicClassifier::new(tables, cfg.heuristic.seed)
}
