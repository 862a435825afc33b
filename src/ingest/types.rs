// src/ingest/types.rs
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Why a source contributed nothing to a run. Always non-fatal.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("source returned HTTP {0}")]
    Status(u16),
    #[error("source timed out after {0:?}")]
    Timeout(Duration),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("reading body failed: {0}")]
    Body(String),
    #[error("invalid selector {selector:?}: {message}")]
    Selector { selector: String, message: String },
    #[error("fetch task failed: {0}")]
    TaskFailed(String),
}

/// Everything needed to scrape one news page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceDescriptor {
    pub name: String,
    pub url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// CSS selectors, tried in order.
    pub selectors: Vec<String>,
    /// Headlines must be strictly longer than this many characters.
    #[serde(default = "default_min_length")]
    pub min_length: usize,
    /// If non-empty, a headline must contain at least one (case-insensitive).
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Stop collecting raw candidates after this many.
    #[serde(default = "default_scan_limit")]
    pub scan_limit: usize,
    /// Cap applied after de-duplication.
    #[serde(default = "default_max_headlines")]
    pub max_headlines: usize,
}

pub fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36".to_string()
}
fn default_timeout_secs() -> u64 {
    10
}
fn default_min_length() -> usize {
    20
}
fn default_scan_limit() -> usize {
    15
}
fn default_max_headlines() -> usize {
    10
}

impl SourceDescriptor {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[async_trait::async_trait]
pub trait HeadlineSource: Send + Sync {
    /// Fetch candidate headlines, already filtered, de-duplicated and capped.
    async fn fetch_headlines(&self) -> Result<Vec<String>, SourceError>;
    fn name(&self) -> &str;
}
