// src/analyze/mod.rs
//! Analysis backends: every headline goes through an `Analyzer` and comes back as a
//! tagged `AnalysisOutcome`, so the pipeline treats model and heuristic paths alike.

pub mod extract;
pub mod heuristic;
pub mod model_client;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::signal::{AnalysisResult, Backend};

pub use extract::{extract_json_object, parse_verdict};
pub use heuristic::{HeuristicClassifier, KeywordTables};
pub use model_client::{BackendStatus, ModelClient, ModelSettings};

/// Model output could not be turned into a valid verdict.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseFailure {
    #[error("no JSON object found in model output")]
    NoJsonObject,
    #[error("invalid JSON: {0}")]
    InvalidJson(String),
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    #[error("invalid value for `{field}`: {value}")]
    InvalidField { field: &'static str, value: String },
    #[error("model output too large: {0} bytes")]
    TooLarge(usize),
}

/// The backend could not be asked, or refused to answer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendUnavailable {
    #[error("backend returned HTTP {0}")]
    Status(u16),
    #[error("backend timed out")]
    Timeout,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("analysis task failed: {0}")]
    TaskFailed(String),
}

/// Result of analyzing one headline. Failures are values, never panics or errors.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisOutcome {
    Analyzed(AnalysisResult),
    ParseFailure(ParseFailure),
    Unavailable(BackendUnavailable),
}

impl AnalysisOutcome {
    /// Short label used for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            AnalysisOutcome::Analyzed(_) => "analyzed",
            AnalysisOutcome::ParseFailure(_) => "parse_failure",
            AnalysisOutcome::Unavailable(_) => "unavailable",
        }
    }
}

/// A backend able to turn a headline into a signal.
pub trait Analyzer: Send + Sync {
    fn analyze<'a>(
        &'a self,
        headline: &'a str,
    ) -> Pin<Box<dyn Future<Output = AnalysisOutcome> + Send + 'a>>;
    /// Which path this analyzer represents, for diagnostics.
    fn backend(&self) -> Backend;
    /// True when `analyze` never suspends. The pipeline then analyzes headlines
    /// one after another in headline order, so seeded randomness is reproducible.
    fn answers_inline(&self) -> bool {
        false
    }
}

pub type DynAnalyzer = Arc<dyn Analyzer>;
