// src/ingest/providers/html.rs
use async_trait::async_trait;
use scraper::{Html, Selector};
use tracing::debug;

use crate::ingest::types::{HeadlineSource, SourceDescriptor, SourceError};
use crate::ingest::{dedup_and_cap, normalize_text};

/// Scrapes headline text out of a news listing page using CSS selectors.
pub struct HtmlSource {
    descriptor: SourceDescriptor,
    client: reqwest::Client,
}

impl HtmlSource {
    /// Selectors are validated up front so a bad config fails at startup, not per run.
    pub fn new(descriptor: SourceDescriptor) -> Result<Self, SourceError> {
        for s in &descriptor.selectors {
            parse_selector(s)?;
        }
        let client = reqwest::Client::builder()
            .user_agent(descriptor.user_agent.clone())
            .connect_timeout(descriptor.timeout())
            .timeout(descriptor.timeout())
            .build()
            .map_err(|e| SourceError::Transport(e.to_string()))?;
        Ok(Self { descriptor, client })
    }

    pub fn descriptor(&self) -> &SourceDescriptor {
        &self.descriptor
    }

    fn classify(&self, e: reqwest::Error) -> SourceError {
        if e.is_timeout() {
            SourceError::Timeout(self.descriptor.timeout())
        } else {
            SourceError::Transport(e.to_string())
        }
    }
}

#[async_trait]
impl HeadlineSource for HtmlSource {
    async fn fetch_headlines(&self) -> Result<Vec<String>, SourceError> {
        let resp = self
            .client
            .get(&self.descriptor.url)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(SourceError::Status(status.as_u16()));
        }

        let body = resp.text().await.map_err(|e| {
            if e.is_timeout() {
                SourceError::Timeout(self.descriptor.timeout())
            } else {
                SourceError::Body(e.to_string())
            }
        })?;

        let headlines = extract_headlines(&body, &self.descriptor)?;
        debug!(
            target: "ingest",
            source = %self.descriptor.name,
            bytes = body.len(),
            count = headlines.len(),
            "page parsed"
        );
        Ok(headlines)
    }

    fn name(&self) -> &str {
        &self.descriptor.name
    }
}

fn parse_selector(s: &str) -> Result<Selector, SourceError> {
    Selector::parse(s).map_err(|e| SourceError::Selector {
        selector: s.to_string(),
        message: format!("{e:?}"),
    })
}

/// Extract headlines from a page.
///
/// Selectors are tried in priority order; collection stops once `scan_limit` raw
/// candidates are gathered. Candidates are then de-duplicated by exact text and
/// truncated to `max_headlines`. Malformed markup is parsed leniently and simply
/// yields fewer (or no) matches.
pub fn extract_headlines(html: &str, d: &SourceDescriptor) -> Result<Vec<String>, SourceError> {
    let document = Html::parse_document(html);
    let keywords: Vec<String> = d.keywords.iter().map(|k| k.to_lowercase()).collect();

    let mut raw: Vec<String> = Vec::new();
    'selectors: for s in &d.selectors {
        let selector = parse_selector(s)?;
        for element in document.select(&selector) {
            let text = normalize_text(&element.text().collect::<Vec<_>>().join(" "));
            if !accepts(&text, d.min_length, &keywords) {
                continue;
            }
            raw.push(text);
            if raw.len() >= d.scan_limit {
                break 'selectors;
            }
        }
    }

    let (kept, _dups, _truncated) = dedup_and_cap(raw, d.max_headlines);
    Ok(kept)
}

fn accepts(text: &str, min_length: usize, keywords: &[String]) -> bool {
    if text.chars().count() <= min_length {
        return false;
    }
    if keywords.is_empty() {
        return true;
    }
    let lower = text.to_lowercase();
    keywords.iter().any(|k| lower.contains(k.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(selectors: &[&str], keywords: &[&str]) -> SourceDescriptor {
        SourceDescriptor {
            name: "Test".into(),
            url: "http://127.0.0.1:1/".into(),
            user_agent: "test-agent".into(),
            timeout_secs: 1,
            selectors: selectors.iter().map(|s| s.to_string()).collect(),
            min_length: 20,
            keywords: keywords.iter().map(|s| s.to_string()).collect(),
            scan_limit: 15,
            max_headlines: 10,
        }
    }

    const PAGE: &str = r#"
        <html><body>
          <h2><a href="/news/1">Infosys stock surges after raising revenue guidance</a></h2>
          <h2><a href="/news/2">Short one</a></h2>
          <h3><a href="/news/3">Monsoon arrives early over the southern coast region</a></h3>
          <div class="title"><a href="/news/4">ITC shares gain on strong cigarette volume growth</a></div>
          <h3><a href="/news/5">Infosys stock surges after raising revenue guidance</a></h3>
        </body></html>
    "#;

    #[test]
    fn applies_length_keyword_and_dedup() {
        let d = descriptor(&["h2 a", "h3 a", ".title a"], &["stock", "share"]);
        let out = extract_headlines(PAGE, &d).unwrap();
        assert_eq!(
            out,
            vec![
                "Infosys stock surges after raising revenue guidance".to_string(),
                "ITC shares gain on strong cigarette volume growth".to_string(),
            ]
        );
    }

    #[test]
    fn no_keywords_means_length_only() {
        let d = descriptor(&["h3 a"], &[]);
        let out = extract_headlines(PAGE, &d).unwrap();
        assert_eq!(out.len(), 2);
        assert!(out[0].starts_with("Monsoon"));
    }

    #[test]
    fn scan_limit_stops_before_later_selectors() {
        let mut d = descriptor(&["h2 a", ".title a"], &[]);
        d.scan_limit = 1;
        let out = extract_headlines(PAGE, &d).unwrap();
        assert_eq!(out, vec!["Infosys stock surges after raising revenue guidance"]);
    }

    #[test]
    fn cap_applies_after_dedup() {
        let mut d = descriptor(&["h2 a", "h3 a", ".title a"], &[]);
        d.max_headlines = 2;
        let out = extract_headlines(PAGE, &d).unwrap();
        assert_eq!(out.len(), 2);
        assert_ne!(out[0], out[1]);
    }

    #[test]
    fn garbage_markup_yields_empty() {
        let d = descriptor(&["h2 a"], &[]);
        let out = extract_headlines("<<<not html at all", &d).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn invalid_selector_is_rejected_at_construction() {
        let d = descriptor(&["h2 >>> ???"], &[]);
        assert!(matches!(
            HtmlSource::new(d),
            Err(SourceError::Selector { .. })
        ));
    }
}
