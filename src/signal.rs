//! signal.rs — trading signal records and the per-run signal set.
//!
//! An `AnalysisResult` is one headline turned into a buy/sell/hold call.
//! A `SignalSet` is the immutable batch produced by one pipeline run; it is
//! what the cache holds and what the query surface returns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Confidence gate applied before publication unless configured otherwise.
pub const DEFAULT_MIN_CONFIDENCE: u8 = 50;

/// Sentinel used when no company can be identified in a headline.
pub const UNKNOWN_STOCK: &str = "Unknown";

/// Trading action derived from a headline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Signal {
    Buy,
    Sell,
    Hold,
}

/// Tone of a headline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

/// Kind of corporate event a headline reports. Serialized as its display label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    #[serde(rename = "Earnings Report")]
    Earnings,
    #[serde(rename = "Business Contract")]
    Contract,
    #[serde(rename = "Operational Update")]
    Operational,
    #[serde(rename = "Regulatory News")]
    Regulatory,
    #[serde(rename = "Business Expansion")]
    Expansion,
    #[serde(rename = "Corporate News")]
    CorporateNews,
}

/// Which analysis path produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Model,
    Heuristic,
}

/// How a signal set was generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Live scraping + remote model analysis.
    Production,
    /// Sample headlines + heuristic classifier.
    Demo,
}

/// Error returned when a label is outside its closed set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized {kind} label: {value:?}")]
pub struct UnknownLabel {
    pub kind: &'static str,
    pub value: String,
}

impl Signal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Signal::Buy => "buy",
            Signal::Sell => "sell",
            Signal::Hold => "hold",
        }
    }
}

impl FromStr for Signal {
    type Err = UnknownLabel;

    /// Case-insensitive; surrounding whitespace is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "buy" => Ok(Signal::Buy),
            "sell" => Ok(Signal::Sell),
            "hold" => Ok(Signal::Hold),
            _ => Err(UnknownLabel {
                kind: "signal",
                value: s.to_string(),
            }),
        }
    }
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Negative => "negative",
            Sentiment::Neutral => "neutral",
        }
    }
}

impl FromStr for Sentiment {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "positive" => Ok(Sentiment::Positive),
            "negative" => Ok(Sentiment::Negative),
            "neutral" => Ok(Sentiment::Neutral),
            _ => Err(UnknownLabel {
                kind: "sentiment",
                value: s.to_string(),
            }),
        }
    }
}

impl FromStr for Mode {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Ok(Mode::Production),
            "demo" => Ok(Mode::Demo),
            _ => Err(UnknownLabel {
                kind: "mode",
                value: s.to_string(),
            }),
        }
    }
}

impl EventKind {
    /// Priority order used when several keyword groups match.
    pub const PRIORITY: [EventKind; 5] = [
        EventKind::Earnings,
        EventKind::Contract,
        EventKind::Operational,
        EventKind::Regulatory,
        EventKind::Expansion,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            EventKind::Earnings => "Earnings Report",
            EventKind::Contract => "Business Contract",
            EventKind::Operational => "Operational Update",
            EventKind::Regulatory => "Regulatory News",
            EventKind::Expansion => "Business Expansion",
            EventKind::CorporateNews => "Corporate News",
        }
    }

    /// Lenient mapping for free-form labels coming from a language model.
    /// Accepts the display label or a short alias; anything else is corporate news.
    pub fn from_label(label: &str) -> Self {
        let l = label.trim().to_ascii_lowercase();
        if l.contains("earning") || l.contains("result") || l.contains("profit") {
            EventKind::Earnings
        } else if l.contains("contract") || l.contains("deal") || l.contains("order") {
            EventKind::Contract
        } else if l.contains("operation") || l.contains("production") || l.contains("sales") {
            EventKind::Operational
        } else if l.contains("regulat") || l.contains("policy") || l.contains("legal") {
            EventKind::Regulatory
        } else if l.contains("expansion") || l.contains("launch") {
            EventKind::Expansion
        } else {
            EventKind::CorporateNews
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Backend::Model => "model",
            Backend::Heuristic => "heuristic",
        })
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Mode::Production => "production",
            Mode::Demo => "demo",
        })
    }
}

/// The verdict part of an analysis: what a backend decides about a headline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verdict {
    pub stock: String,
    pub event: EventKind,
    pub sentiment: Sentiment,
    pub signal: Signal,
    /// 0..=100
    pub confidence: u8,
    pub reason: String,
}

/// One published signal, traceable back to its headline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub stock: String,
    pub event: EventKind,
    pub sentiment: Sentiment,
    pub signal: Signal,
    pub confidence: u8,
    pub reason: String,
    pub headline: String,
    pub timestamp: DateTime<Utc>,
    pub source_backend: Backend,
}

impl AnalysisResult {
    /// Stamp a verdict with its headline, creation time and producing backend.
    pub fn from_verdict(verdict: Verdict, headline: impl Into<String>, backend: Backend) -> Self {
        Self {
            stock: verdict.stock,
            event: verdict.event,
            sentiment: verdict.sentiment,
            signal: verdict.signal,
            confidence: verdict.confidence.min(100),
            reason: verdict.reason,
            headline: headline.into(),
            timestamp: Utc::now(),
            source_backend: backend,
        }
    }
}

/// Keep results with `confidence >= min_confidence`, preserving order.
pub fn filter_by_confidence(results: Vec<AnalysisResult>, min_confidence: u8) -> Vec<AnalysisResult> {
    results
        .into_iter()
        .filter(|r| r.confidence >= min_confidence)
        .collect()
}

/// Immutable batch of results from one pipeline run.
///
/// `count` always equals `signals.len()`; fields are private so a set can only be
/// built through the constructors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignalSet {
    signals: Vec<AnalysisResult>,
    count: usize,
    timestamp: DateTime<Utc>,
    mode: Mode,
}

impl SignalSet {
    pub fn new(signals: Vec<AnalysisResult>, mode: Mode) -> Self {
        Self::at(signals, mode, Utc::now())
    }

    pub fn at(signals: Vec<AnalysisResult>, mode: Mode, timestamp: DateTime<Utc>) -> Self {
        let count = signals.len();
        Self {
            signals,
            count,
            timestamp,
            mode,
        }
    }

    pub fn empty(mode: Mode) -> Self {
        Self::new(Vec::new(), mode)
    }

    pub fn signals(&self) -> &[AnalysisResult] {
        &self.signals
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Re-apply the confidence gate; run metadata is carried over.
    pub fn filtered(&self, min_confidence: u8) -> SignalSet {
        let kept = filter_by_confidence(self.signals.clone(), min_confidence);
        SignalSet::at(kept, self.mode, self.timestamp)
    }

    /// Check the publication invariants for the given gate.
    pub fn validate(&self, min_confidence: u8) -> Result<(), String> {
        if self.count != self.signals.len() {
            return Err(format!(
                "count {} does not match {} signals",
                self.count,
                self.signals.len()
            ));
        }
        for r in &self.signals {
            if r.confidence > 100 {
                return Err(format!("confidence {} out of range", r.confidence));
            }
            if r.confidence < min_confidence {
                return Err(format!(
                    "confidence {} below gate {}",
                    r.confidence, min_confidence
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn result(conf: u8) -> AnalysisResult {
        AnalysisResult::from_verdict(
            Verdict {
                stock: "TCS".into(),
                event: EventKind::Contract,
                sentiment: Sentiment::Positive,
                signal: Signal::Buy,
                confidence: conf,
                reason: "Deal flow".into(),
            },
            "TCS announces major cloud computing deal",
            Backend::Heuristic,
        )
    }

    #[test]
    fn serialized_shape_uses_labels() {
        let v = serde_json::to_value(result(80)).unwrap();
        assert_eq!(v["event"], json!("Business Contract"));
        assert_eq!(v["signal"], json!("buy"));
        assert_eq!(v["sentiment"], json!("positive"));
        assert_eq!(v["source_backend"], json!("heuristic"));
        assert_eq!(v["confidence"], json!(80));
    }

    #[test]
    fn set_count_tracks_len_and_serializes() {
        let set = SignalSet::new(vec![result(70), result(90)], Mode::Demo);
        assert_eq!(set.count(), 2);
        let v = serde_json::to_value(&set).unwrap();
        assert_eq!(v["count"], json!(2));
        assert_eq!(v["signals"].as_array().unwrap().len(), 2);
        assert_eq!(v["mode"], json!("demo"));
    }

    #[test]
    fn filtering_is_idempotent_and_keeps_order() {
        let set = SignalSet::new(
            vec![result(49), result(50), result(30), result(99), result(51)],
            Mode::Production,
        );
        let once = set.filtered(DEFAULT_MIN_CONFIDENCE);
        let twice = once.filtered(DEFAULT_MIN_CONFIDENCE);
        assert_eq!(once, twice);
        let confs: Vec<u8> = once.signals().iter().map(|r| r.confidence).collect();
        assert_eq!(confs, vec![50, 99, 51]);
        assert!(once.validate(DEFAULT_MIN_CONFIDENCE).is_ok());
        assert!(set.validate(DEFAULT_MIN_CONFIDENCE).is_err());
    }

    #[test]
    fn labels_parse_case_insensitively() {
        assert_eq!(" BUY ".parse::<Signal>().unwrap(), Signal::Buy);
        assert_eq!("Neutral".parse::<Sentiment>().unwrap(), Sentiment::Neutral);
        assert!("strong buy".parse::<Signal>().is_err());
        assert!("bullish".parse::<Sentiment>().is_err());
    }

    #[test]
    fn free_form_events_map_into_closed_set() {
        assert_eq!(EventKind::from_label("Earnings Report"), EventKind::Earnings);
        assert_eq!(EventKind::from_label("quarterly results"), EventKind::Earnings);
        assert_eq!(EventKind::from_label("Business Contract"), EventKind::Contract);
        assert_eq!(EventKind::from_label("Regulatory News"), EventKind::Regulatory);
        assert_eq!(EventKind::from_label("merger rumour"), EventKind::CorporateNews);
    }
}
