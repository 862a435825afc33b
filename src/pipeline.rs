// src/pipeline.rs
//! Pipeline orchestrator: scrape → dispatch → filter → publish.
//!
//! Stage-local failures (a source down, a model answer that does not parse, a
//! backend timeout) are counted and logged, never propagated. Only a result set
//! that breaks the publication invariants aborts a run, and then the cache keeps
//! whatever it held before.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use tracing::{debug, info, warn};

use crate::analyze::{AnalysisOutcome, BackendUnavailable, DynAnalyzer};
use crate::cache::SignalCache;
use crate::ingest::types::HeadlineSource;
use crate::ingest::{headline_id, scrape_all};
use crate::signal::{filter_by_confidence, Mode, SignalSet, DEFAULT_MIN_CONFIDENCE};

/// Cap on headlines dispatched per run.
pub const DEFAULT_MAX_HEADLINES: usize = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStage {
    Idle,
    Scraping,
    Dispatching,
    Filtering,
    Published,
}

impl fmt::Display for RunStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunStage::Idle => "idle",
            RunStage::Scraping => "scraping",
            RunStage::Dispatching => "dispatching",
            RunStage::Filtering => "filtering",
            RunStage::Published => "published",
        };
        f.write_str(s)
    }
}

/// Fatal to the current run; the cached set stays as it was.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("refusing to publish invalid signal set: {0}")]
    InvalidSignal(String),
}

/// Counters for one run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunStats {
    pub sources: usize,
    pub failed_sources: usize,
    pub headlines: usize,
    pub duplicates: usize,
    pub truncated: usize,
    pub analyzed: usize,
    pub parse_failures: usize,
    pub unavailable: usize,
    pub below_confidence: usize,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub generation: u64,
    pub set: Arc<SignalSet>,
    pub stats: RunStats,
}

pub struct Pipeline {
    sources: Vec<Arc<dyn HeadlineSource>>,
    analyzer: DynAnalyzer,
    cache: Arc<SignalCache>,
    mode: Mode,
    min_confidence: u8,
    max_headlines: usize,
}

impl Pipeline {
    pub fn new(
        sources: Vec<Arc<dyn HeadlineSource>>,
        analyzer: DynAnalyzer,
        cache: Arc<SignalCache>,
        mode: Mode,
    ) -> Self {
        Self {
            sources,
            analyzer,
            cache,
            mode,
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            max_headlines: DEFAULT_MAX_HEADLINES,
        }
    }

    pub fn with_min_confidence(mut self, min_confidence: u8) -> Self {
        self.min_confidence = min_confidence.min(100);
        self
    }

    pub fn with_max_headlines(mut self, max_headlines: usize) -> Self {
        self.max_headlines = max_headlines;
        self
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn min_confidence(&self) -> u8 {
        self.min_confidence
    }

    pub fn cache(&self) -> &Arc<SignalCache> {
        &self.cache
    }

    pub fn analyzer(&self) -> &DynAnalyzer {
        &self.analyzer
    }

    /// Run every stage once and publish the result.
    pub async fn run(&self) -> Result<RunReport, PipelineError> {
        crate::metrics::describe_all();
        counter!("pipeline_runs_total").increment(1);
        let started = Instant::now();
        let mut stats = RunStats {
            sources: self.sources.len(),
            ..RunStats::default()
        };

        log_stage(RunStage::Scraping, self.mode);
        let scrape = scrape_all(&self.sources, self.max_headlines).await;
        stats.failed_sources = scrape.failed_sources();
        stats.headlines = scrape.headlines.len();
        stats.duplicates = scrape.duplicates;
        stats.truncated = scrape.truncated;

        log_stage(RunStage::Dispatching, self.mode);
        let outcomes = self.dispatch(scrape.headlines).await;
        let mut results = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            counter!("analysis_outcomes_total", "outcome" => outcome.label()).increment(1);
            match outcome {
                AnalysisOutcome::Analyzed(r) => {
                    stats.analyzed += 1;
                    results.push(r);
                }
                AnalysisOutcome::ParseFailure(_) => stats.parse_failures += 1,
                AnalysisOutcome::Unavailable(_) => stats.unavailable += 1,
            }
        }

        log_stage(RunStage::Filtering, self.mode);
        let kept = filter_by_confidence(results, self.min_confidence);
        stats.below_confidence = stats.analyzed - kept.len();
        let set = SignalSet::new(kept, self.mode);
        // An analyzer can hand back results outside the data-model bounds.
        if let Err(why) = set.validate(self.min_confidence) {
            counter!("pipeline_run_failures_total").increment(1);
            warn!(target: "pipeline", error = %why, "run aborted before publish");
            return Err(PipelineError::InvalidSignal(why));
        }

        let set = Arc::new(set);
        let generation = self.cache.publish_shared(Arc::clone(&set));
        gauge!("signals_published").set(set.count() as f64);

        stats.elapsed_ms = started.elapsed().as_millis() as u64;
        histogram!("pipeline_run_ms").record(stats.elapsed_ms as f64);
        info!(
            target: "pipeline",
            stage = %RunStage::Published,
            mode = %self.mode,
            generation,
            headlines = stats.headlines,
            failed_sources = stats.failed_sources,
            analyzed = stats.analyzed,
            parse_failures = stats.parse_failures,
            unavailable = stats.unavailable,
            below_confidence = stats.below_confidence,
            count = set.count(),
            elapsed_ms = stats.elapsed_ms,
            "run complete"
        );
        log_stage(RunStage::Idle, self.mode);

        Ok(RunReport {
            generation,
            set,
            stats,
        })
    }

    /// Outcomes come back in headline order. Inline analyzers run sequentially on
    /// this task; everything else gets one task per headline.
    async fn dispatch(&self, headlines: Vec<String>) -> Vec<AnalysisOutcome> {
        if self.analyzer.answers_inline() {
            let mut outcomes = Vec::with_capacity(headlines.len());
            for headline in &headlines {
                let outcome = self.analyzer.analyze(headline).await;
                log_outcome(headline, &outcome);
                outcomes.push(outcome);
            }
            return outcomes;
        }

        let handles: Vec<_> = headlines
            .into_iter()
            .map(|headline| {
                let analyzer = Arc::clone(&self.analyzer);
                tokio::spawn(async move {
                    let outcome = analyzer.analyze(&headline).await;
                    log_outcome(&headline, &outcome);
                    outcome
                })
            })
            .collect();

        futures::future::join_all(handles)
            .await
            .into_iter()
            .map(|joined| {
                joined.unwrap_or_else(|e| {
                    warn!(target: "pipeline", error = %e, "analysis task failed");
                    AnalysisOutcome::Unavailable(BackendUnavailable::TaskFailed(e.to_string()))
                })
            })
            .collect()
    }
}

fn log_outcome(headline: &str, outcome: &AnalysisOutcome) {
    debug!(
        target: "pipeline",
        id = %headline_id(headline),
        outcome = outcome.label(),
        "headline analyzed"
    );
}

fn log_stage(stage: RunStage, mode: Mode) {
    debug!(target: "pipeline", %stage, %mode, "stage");
}
