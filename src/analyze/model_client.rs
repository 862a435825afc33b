// src/analyze/model_client.rs
//! Client for a remote language-model backend speaking the `/api/generate` contract.
//!
//! Every call ends in an `AnalysisOutcome`: non-2xx and transport errors are
//! `Unavailable`, unusable output is `ParseFailure`. Nothing is raised across
//! the boundary.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::analyze::extract::parse_verdict;
use crate::analyze::{AnalysisOutcome, Analyzer, BackendUnavailable, ParseFailure};
use crate::ingest::headline_id;
use crate::signal::{AnalysisResult, Backend};

/// Connection + generation settings for the model backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Per-analysis timeout. Inference is slow; keep this above source timeouts.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
}

fn default_base_url() -> String {
    "http://localhost:11434".to_string()
}
fn default_model() -> String {
    "mistral".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_probe_timeout_secs() -> u64 {
    5
}
fn default_temperature() -> f32 {
    0.1
}
fn default_top_p() -> f32 {
    0.9
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            timeout_secs: default_timeout_secs(),
            probe_timeout_secs: default_probe_timeout_secs(),
            temperature: default_temperature(),
            top_p: default_top_p(),
        }
    }
}

/// Result of a connectivity probe against `/api/tags`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendStatus {
    pub reachable: bool,
    /// The configured model is listed by the backend.
    pub model_available: bool,
}

impl BackendStatus {
    pub fn label(&self) -> &'static str {
        if self.reachable {
            "reachable"
        } else {
            "unreachable"
        }
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
    top_p: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
    #[serde(default)]
    done: bool,
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagEntry>,
}

#[derive(Deserialize)]
struct TagEntry {
    #[serde(default)]
    name: String,
}

pub struct ModelClient {
    http: reqwest::Client,
    settings: ModelSettings,
}

impl ModelClient {
    pub fn new(settings: ModelSettings) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("headline-signals/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(4))
            .build()?;
        Ok(Self { http, settings })
    }

    pub fn settings(&self) -> &ModelSettings {
        &self.settings
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.settings.base_url.trim_end_matches('/'), path)
    }

    /// Fixed-shape prompt; the headline is always on the last line.
    pub fn build_prompt(headline: &str) -> String {
        format!(
            r#"Given the following stock news headline, return a JSON object with:
{{
  "stock": "<company name>",
  "event": "<event type>",
  "sentiment": "positive/negative/neutral",
  "signal": "buy/sell/hold",
  "confidence": <score 0-100>,
  "reason": "<short explanation>"
}}
Return only JSON. Do not include commentary.
Headline: {headline}"#
        )
    }

    pub async fn analyze_headline(&self, headline: &str) -> AnalysisOutcome {
        let id = headline_id(headline);
        let prompt = Self::build_prompt(headline);
        let req = GenerateRequest {
            model: &self.settings.model,
            prompt: &prompt,
            stream: false,
            options: GenerateOptions {
                temperature: self.settings.temperature,
                top_p: self.settings.top_p,
            },
        };

        let resp = match self
            .http
            .post(self.url("/api/generate"))
            .timeout(Duration::from_secs(self.settings.timeout_secs))
            .json(&req)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                let why = classify(e);
                warn!(target: "model", %id, error = %why, "model backend unavailable");
                return AnalysisOutcome::Unavailable(why);
            }
        };

        let status = resp.status();
        if !status.is_success() {
            warn!(target: "model", %id, status = status.as_u16(), "model backend rejected request");
            return AnalysisOutcome::Unavailable(BackendUnavailable::Status(status.as_u16()));
        }

        let body: GenerateResponse = match resp.json().await {
            Ok(b) => b,
            Err(e) if e.is_timeout() => {
                return AnalysisOutcome::Unavailable(BackendUnavailable::Timeout);
            }
            Err(e) => {
                let why = ParseFailure::InvalidJson(e.to_string());
                warn!(target: "model", %id, error = %why, "unreadable model envelope");
                return AnalysisOutcome::ParseFailure(why);
            }
        };
        if !body.done {
            debug!(target: "model", %id, "model reported done=false");
        }

        match parse_verdict(&body.response) {
            Ok(verdict) => {
                debug!(target: "model", %id, confidence = verdict.confidence, "model verdict parsed");
                AnalysisOutcome::Analyzed(AnalysisResult::from_verdict(
                    verdict,
                    headline,
                    Backend::Model,
                ))
            }
            Err(why) => {
                warn!(target: "model", %id, error = %why, "model output rejected");
                AnalysisOutcome::ParseFailure(why)
            }
        }
    }

    /// Reachability + model presence, bounded by `probe_timeout_secs`.
    pub async fn probe(&self) -> BackendStatus {
        let res = self
            .http
            .get(self.url("/api/tags"))
            .timeout(Duration::from_secs(self.settings.probe_timeout_secs))
            .send()
            .await;
        let resp = match res {
            Ok(r) if r.status().is_success() => r,
            _ => {
                return BackendStatus {
                    reachable: false,
                    model_available: false,
                }
            }
        };
        let model_available = resp
            .json::<TagsResponse>()
            .await
            .map(|t| t.models.iter().any(|m| m.name.contains(&self.settings.model)))
            .unwrap_or(false);
        BackendStatus {
            reachable: true,
            model_available,
        }
    }
}

fn classify(e: reqwest::Error) -> BackendUnavailable {
    if e.is_timeout() {
        BackendUnavailable::Timeout
    } else {
        BackendUnavailable::Transport(e.to_string())
    }
}

impl Analyzer for ModelClient {
    fn analyze<'a>(
        &'a self,
        headline: &'a str,
    ) -> Pin<Box<dyn Future<Output = AnalysisOutcome> + Send + 'a>> {
        Box::pin(self.analyze_headline(headline))
    }

    fn backend(&self) -> Backend {
        Backend::Model
    }
}
