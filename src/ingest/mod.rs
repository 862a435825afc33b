// src/ingest/mod.rs
pub mod providers;
pub mod types;

use std::collections::HashSet;
use std::sync::Arc;

use metrics::counter;
use once_cell::sync::OnceCell;
use tracing::{info, warn};

use crate::ingest::types::{HeadlineSource, SourceError};

/// Hard cap on a single headline; anything longer is page noise, not a title.
const MAX_HEADLINE_CHARS: usize = 300;

/// Normalize text: decode entities, strip tags, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    // 3) Normalize “ ” ‘ ’ « » to ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace
    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").trim().to_string();

    if out.chars().count() > MAX_HEADLINE_CHARS {
        out = out.chars().take(MAX_HEADLINE_CHARS).collect();
    }

    out
}

/// Short stable id for a headline, so logs can correlate without echoing text.
pub fn headline_id(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let digest = Sha256::digest(text.as_bytes());
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

/// Drop exact-text duplicates, keeping the first occurrence. Returns (kept, dropped).
pub fn dedup_preserving_order(headlines: Vec<String>) -> (Vec<String>, usize) {
    let mut seen: HashSet<String> = HashSet::with_capacity(headlines.len());
    let mut keep = Vec::with_capacity(headlines.len());
    let mut dropped = 0usize;
    for h in headlines {
        if seen.insert(h.clone()) {
            keep.push(h);
        } else {
            dropped += 1;
        }
    }
    (keep, dropped)
}

/// De-duplicate, then truncate to `max`. Returns (kept, duplicates, truncated).
pub fn dedup_and_cap(headlines: Vec<String>, max: usize) -> (Vec<String>, usize, usize) {
    let (mut keep, dups) = dedup_preserving_order(headlines);
    let truncated = keep.len().saturating_sub(max);
    keep.truncate(max);
    (keep, dups, truncated)
}

/// Outcome of one source within a scrape.
#[derive(Debug)]
pub struct SourceReport {
    pub source: String,
    pub outcome: Result<usize, SourceError>,
}

/// Merged result of scraping every configured source once.
#[derive(Debug, Default)]
pub struct ScrapeReport {
    pub headlines: Vec<String>,
    pub sources: Vec<SourceReport>,
    pub duplicates: usize,
    pub truncated: usize,
}

impl ScrapeReport {
    pub fn failed_sources(&self) -> usize {
        self.sources.iter().filter(|s| s.outcome.is_err()).count()
    }
}

/// Fetch all sources concurrently, one task per source, and merge in source order.
///
/// Each source is bounded by its own timeout; there is no extra join deadline.
/// Tasks are detached rather than aborted if the caller goes away.
pub async fn scrape_all(sources: &[Arc<dyn HeadlineSource>], max_headlines: usize) -> ScrapeReport {
    crate::metrics::describe_all();

    let (names, handles): (Vec<String>, Vec<_>) = sources
        .iter()
        .map(|s| {
            let source = Arc::clone(s);
            let name = source.name().to_string();
            let handle = tokio::spawn(async move { source.fetch_headlines().await });
            (name, handle)
        })
        .unzip();

    let joined = futures::future::join_all(handles).await;

    let mut raw = Vec::new();
    let mut reports = Vec::with_capacity(names.len());
    for (name, res) in names.into_iter().zip(joined) {
        let outcome = match res {
            Ok(Ok(mut headlines)) => {
                let n = headlines.len();
                info!(target: "ingest", source = %name, count = n, "headlines extracted");
                counter!("source_headlines_total", "source" => name.clone()).increment(n as u64);
                raw.append(&mut headlines);
                Ok(n)
            }
            Ok(Err(e)) => Err(e),
            Err(join) => Err(SourceError::TaskFailed(join.to_string())),
        };
        if let Err(e) = &outcome {
            warn!(target: "ingest", source = %name, error = %e, "source unavailable");
            counter!("source_errors_total", "source" => name.clone()).increment(1);
        }
        reports.push(SourceReport {
            source: name,
            outcome,
        });
    }

    let (headlines, duplicates, truncated) = dedup_and_cap(raw, max_headlines);
    ScrapeReport {
        headlines,
        sources: reports,
        duplicates,
        truncated,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(&'static str, Vec<&'static str>);

    #[async_trait::async_trait]
    impl HeadlineSource for Fixed {
        async fn fetch_headlines(&self) -> Result<Vec<String>, SourceError> {
            Ok(self.1.iter().map(|s| s.to_string()).collect())
        }
        fn name(&self) -> &str {
            self.0
        }
    }

    struct Down;

    #[async_trait::async_trait]
    impl HeadlineSource for Down {
        async fn fetch_headlines(&self) -> Result<Vec<String>, SourceError> {
            Err(SourceError::Status(503))
        }
        fn name(&self) -> &str {
            "down"
        }
    }

    #[test]
    fn normalize_text_decodes_and_collapses() {
        let s = "  <b>Infosys&nbsp;&nbsp;stock</b>   surges \u{201C}again\u{201D} ";
        assert_eq!(normalize_text(s), r#"Infosys stock surges "again""#);
    }

    #[test]
    fn headline_id_is_stable_and_short() {
        let a = headline_id("SBI reports record quarterly profits");
        assert_eq!(a.len(), 12);
        assert_eq!(a, headline_id("SBI reports record quarterly profits"));
        assert_ne!(a, headline_id("SBI reports record quarterly losses"));
    }

    #[test]
    fn dedup_happens_before_truncation() {
        let input = vec!["a".to_string(), "a".into(), "b".into(), "a".into(), "c".into()];
        let (kept, dups, truncated) = dedup_and_cap(input, 2);
        assert_eq!(kept, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(dups, 2);
        assert_eq!(truncated, 1);
    }

    #[tokio::test]
    async fn scrape_all_merges_and_absorbs_failures() {
        let sources: Vec<Arc<dyn HeadlineSource>> = vec![
            Arc::new(Fixed("one", vec!["x headline", "y headline"])),
            Arc::new(Down),
            Arc::new(Fixed("two", vec!["y headline", "z headline"])),
        ];
        let report = scrape_all(&sources, 15).await;
        assert_eq!(report.headlines, vec!["x headline", "y headline", "z headline"]);
        assert_eq!(report.duplicates, 1);
        assert_eq!(report.failed_sources(), 1);
        assert_eq!(report.sources.len(), 3);
    }
}
