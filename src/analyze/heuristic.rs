// src/analyze/heuristic.rs
//! Rule-based stand-in for the model backend.
//!
//! Pure and synchronous: given its keyword tables and random source, the output is
//! fully determined. Randomness only picks between allowed outcomes (buy vs hold,
//! a confidence inside a fixed band, one of several reason templates), so a seeded
//! generator makes the classifier reproducible.
//!
//! Steps:
//! 1) company: table aliases (substring match, first wins) → first whitespace token
//!    starting uppercase with more than 3 chars, taken as-is → `"Unknown"`
//! 2) sentiment: positive vs negative keyword hits; ties are neutral
//! 3) event: first matching keyword group in `EventKind::PRIORITY`, else corporate news
//! 4) signal + confidence: sentiment-conditioned bands (see `decide`)
//! 5) reason: template for (signal, sentiment), else the signal's neutral templates

use std::fs;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Mutex;

use once_cell::sync::Lazy;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use tracing::warn;

use crate::analyze::{AnalysisOutcome, Analyzer};
use crate::signal::{
    AnalysisResult, Backend, EventKind, Sentiment, Signal, Verdict, UNKNOWN_STOCK,
};

const FALLBACK_REASON: &str = "Mixed signals suggest wait-and-see approach";

static BUILTIN: Lazy<KeywordTables> = Lazy::new(|| {
    let raw = include_str!("../../config/heuristic_keywords.json");
    serde_json::from_str::<KeywordTables>(raw)
        .expect("valid heuristic keyword tables")
        .lowercased()
});

/// Seeded generator when a seed is given, OS-seeded otherwise.
pub fn rng_from_seed(seed: Option<u64>) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_os_rng(),
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompanyEntry {
    pub name: String,
    pub aliases: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventKeywords {
    #[serde(default)]
    pub earnings: Vec<String>,
    #[serde(default)]
    pub contract: Vec<String>,
    #[serde(default)]
    pub operational: Vec<String>,
    #[serde(default)]
    pub regulatory: Vec<String>,
    #[serde(default)]
    pub expansion: Vec<String>,
}

impl EventKeywords {
    fn group(&self, kind: EventKind) -> &[String] {
        match kind {
            EventKind::Earnings => &self.earnings,
            EventKind::Contract => &self.contract,
            EventKind::Operational => &self.operational,
            EventKind::Regulatory => &self.regulatory,
            EventKind::Expansion => &self.expansion,
            EventKind::CorporateNews => &[],
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SentimentReasons {
    #[serde(default)]
    pub positive: Vec<String>,
    #[serde(default)]
    pub negative: Vec<String>,
    #[serde(default)]
    pub neutral: Vec<String>,
}

impl SentimentReasons {
    fn for_sentiment(&self, s: Sentiment) -> &[String] {
        match s {
            Sentiment::Positive => &self.positive,
            Sentiment::Negative => &self.negative,
            Sentiment::Neutral => &self.neutral,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReasonTemplates {
    #[serde(default)]
    pub buy: SentimentReasons,
    #[serde(default)]
    pub sell: SentimentReasons,
    #[serde(default)]
    pub hold: SentimentReasons,
}

impl ReasonTemplates {
    /// Templates for (signal, sentiment), falling back to the signal's neutral set.
    pub fn candidates(&self, signal: Signal, sentiment: Sentiment) -> &[String] {
        let by_signal = match signal {
            Signal::Buy => &self.buy,
            Signal::Sell => &self.sell,
            Signal::Hold => &self.hold,
        };
        let exact = by_signal.for_sentiment(sentiment);
        if exact.is_empty() {
            &by_signal.neutral
        } else {
            exact
        }
    }
}

/// Keyword tables driving the classifier. Matching is case-insensitive.
#[derive(Debug, Clone, Deserialize)]
pub struct KeywordTables {
    /// Ordered: first company whose alias appears wins.
    pub companies: Vec<CompanyEntry>,
    pub positive: Vec<String>,
    pub negative: Vec<String>,
    pub strong_positive: Vec<String>,
    pub strong_negative: Vec<String>,
    pub events: EventKeywords,
    pub reasons: ReasonTemplates,
}

impl Default for KeywordTables {
    fn default() -> Self {
        BUILTIN.clone()
    }
}

impl KeywordTables {
    /// Load tables from a JSON file. Falls back to the built-in tables on error.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        let parsed = fs::read_to_string(path)
            .map_err(|e| e.to_string())
            .and_then(|s| serde_json::from_str::<KeywordTables>(&s).map_err(|e| e.to_string()));
        match parsed {
            Ok(t) => t.lowercased(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "keyword tables unreadable, using built-in");
                Self::default()
            }
        }
    }

    fn lowercased(mut self) -> Self {
        fn lower(v: &mut [String]) {
            for s in v.iter_mut() {
                *s = s.to_lowercase();
            }
        }
        for c in &mut self.companies {
            lower(&mut c.aliases);
        }
        lower(&mut self.positive);
        lower(&mut self.negative);
        lower(&mut self.strong_positive);
        lower(&mut self.strong_negative);
        lower(&mut self.events.earnings);
        lower(&mut self.events.contract);
        lower(&mut self.events.operational);
        lower(&mut self.events.regulatory);
        lower(&mut self.events.expansion);
        self
    }

    /// Aliases match anywhere in the lowercased headline, so short aliases
    /// like "ril" also hit inside longer words ("April"). The fallback token is
    /// not stripped of punctuation.
    pub fn extract_company(&self, headline: &str) -> String {
        let lower = headline.to_lowercase();
        for c in &self.companies {
            if count_hits(&lower, &c.aliases) > 0 {
                return c.name.clone();
            }
        }
        headline
            .split_whitespace()
            .find(|w| w.chars().next().is_some_and(char::is_uppercase) && w.chars().count() > 3)
            .map(str::to_string)
            .unwrap_or_else(|| UNKNOWN_STOCK.to_string())
    }

    pub fn sentiment_of(&self, headline: &str) -> Sentiment {
        let lower = headline.to_lowercase();
        let pos = count_hits(&lower, &self.positive);
        let neg = count_hits(&lower, &self.negative);
        if pos > neg {
            Sentiment::Positive
        } else if neg > pos {
            Sentiment::Negative
        } else {
            Sentiment::Neutral
        }
    }

    pub fn event_of(&self, headline: &str) -> EventKind {
        let lower = headline.to_lowercase();
        EventKind::PRIORITY
            .into_iter()
            .find(|k| count_hits(&lower, self.events.group(*k)) > 0)
            .unwrap_or(EventKind::CorporateNews)
    }
}

/// Number of keywords present in `lower` (each keyword counted once).
fn count_hits(lower: &str, keywords: &[String]) -> usize {
    keywords
        .iter()
        .filter(|k| !k.is_empty() && lower.contains(k.as_str()))
        .count()
}

/// Signal and confidence for a sentiment:
/// - positive + strong keyword → buy, 75..=95
/// - positive → buy when draw > 0.3 else hold, 60..=80
/// - negative + strong keyword → sell, 70..=90
/// - negative → sell when draw > 0.4 else hold, 55..=75
/// - neutral → hold, 50..=70
fn decide<R: Rng + ?Sized>(
    tables: &KeywordTables,
    lower: &str,
    sentiment: Sentiment,
    rng: &mut R,
) -> (Signal, u8) {
    match sentiment {
        Sentiment::Positive => {
            if count_hits(lower, &tables.strong_positive) > 0 {
                (Signal::Buy, rng.random_range(75..=95))
            } else {
                let signal = if rng.random::<f64>() > 0.3 {
                    Signal::Buy
                } else {
                    Signal::Hold
                };
                (signal, rng.random_range(60..=80))
            }
        }
        Sentiment::Negative => {
            if count_hits(lower, &tables.strong_negative) > 0 {
                (Signal::Sell, rng.random_range(70..=90))
            } else {
                let signal = if rng.random::<f64>() > 0.4 {
                    Signal::Sell
                } else {
                    Signal::Hold
                };
                (signal, rng.random_range(55..=75))
            }
        }
        Sentiment::Neutral => (Signal::Hold, rng.random_range(50..=70)),
    }
}

/// Classify one headline with an explicit random source.
pub fn classify_with<R: Rng + ?Sized>(tables: &KeywordTables, headline: &str, rng: &mut R) -> Verdict {
    let lower = headline.to_lowercase();
    let stock = tables.extract_company(headline);
    let sentiment = tables.sentiment_of(headline);
    let event = tables.event_of(headline);
    let (signal, confidence) = decide(tables, &lower, sentiment, rng);
    let reason = tables
        .reasons
        .candidates(signal, sentiment)
        .choose(rng)
        .cloned()
        .unwrap_or_else(|| FALLBACK_REASON.to_string());

    Verdict {
        stock,
        event,
        sentiment,
        signal,
        confidence,
        reason,
    }
}

/// Heuristic classifier owning its tables and random source.
pub struct HeuristicClassifier {
    tables: KeywordTables,
    rng: Mutex<StdRng>,
}

impl HeuristicClassifier {
    pub fn new(tables: KeywordTables, seed: Option<u64>) -> Self {
        Self {
            tables,
            rng: Mutex::new(rng_from_seed(seed)),
        }
    }

    /// Built-in tables with a fixed seed; reproducible.
    pub fn seeded(seed: u64) -> Self {
        Self::new(KeywordTables::default(), Some(seed))
    }

    pub fn tables(&self) -> &KeywordTables {
        &self.tables
    }

    pub fn verdict(&self, headline: &str) -> Verdict {
        let mut rng = self.rng.lock().unwrap_or_else(|p| p.into_inner());
        classify_with(&self.tables, headline, &mut *rng)
    }

    /// Never fails.
    pub fn classify(&self, headline: &str) -> AnalysisResult {
        AnalysisResult::from_verdict(self.verdict(headline), headline, Backend::Heuristic)
    }
}

impl Default for HeuristicClassifier {
    fn default() -> Self {
        Self::new(KeywordTables::default(), None)
    }
}

impl Analyzer for HeuristicClassifier {
    fn analyze<'a>(
        &'a self,
        headline: &'a str,
    ) -> Pin<Box<dyn Future<Output = AnalysisOutcome> + Send + 'a>> {
        let out = AnalysisOutcome::Analyzed(self.classify(headline));
        Box::pin(async move { out })
    }

    fn backend(&self) -> Backend {
        Backend::Heuristic
    }

    fn answers_inline(&self) -> bool {
        true
    }
}
