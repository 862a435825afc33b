// tests/html_source.rs
mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{http::StatusCode, response::Html, routing::get, Router};
use headline_signals::ingest::providers::HtmlSource;
use headline_signals::ingest::scrape_all;
use headline_signals::ingest::types::{HeadlineSource, SourceDescriptor, SourceError};

const PAGE: &str = r#"<html><body>
  <h2><a href="/news/1">Reliance shares climb after strong quarter results</a></h2>
  <h2><a href="/news/2">Short</a></h2>
  <h3><a href="/news/3">Monsoon forecast revised by weather office today</a></h3>
  <div class="title"><a href="/news/4">Reliance shares climb after strong quarter results</a></div>
  <div class="title"><a href="/news/5">HDFC Bank stock slips on lending scrutiny</a></div>
</body></html>"#;

fn descriptor(url: String, keywords: &[&str]) -> SourceDescriptor {
    SourceDescriptor {
        name: "local".into(),
        url,
        user_agent: "headline-signals-test".into(),
        timeout_secs: 2,
        selectors: vec!["h2 a".into(), "h3 a".into(), ".title a".into()],
        min_length: 20,
        keywords: keywords.iter().map(|s| s.to_string()).collect(),
        scan_limit: 15,
        max_headlines: 10,
    }
}

async fn site() -> String {
    let app = Router::new()
        .route("/markets", get(|| async { Html(PAGE) }))
        .route("/gone", get(|| async { (StatusCode::NOT_FOUND, "nope") }))
        .route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Html(PAGE)
            }),
        );
    common::serve(app).await
}

#[tokio::test]
async fn scrapes_filters_and_dedups() {
    let base = site().await;
    let src = HtmlSource::new(descriptor(format!("{base}/markets"), &["share", "stock"])).unwrap();
    let got = src.fetch_headlines().await.unwrap();
    assert_eq!(
        got,
        vec![
            "Reliance shares climb after strong quarter results".to_string(),
            "HDFC Bank stock slips on lending scrutiny".to_string(),
        ]
    );
    assert_eq!(src.name(), "local");
}

#[tokio::test]
async fn no_keywords_keeps_every_long_headline() {
    let base = site().await;
    let src = HtmlSource::new(descriptor(format!("{base}/markets"), &[])).unwrap();
    let got = src.fetch_headlines().await.unwrap();
    assert_eq!(got.len(), 3);
    assert_eq!(got[1], "Monsoon forecast revised by weather office today");
}

#[tokio::test]
async fn not_found_is_status_error() {
    let base = site().await;
    let src = HtmlSource::new(descriptor(format!("{base}/gone"), &[])).unwrap();
    assert!(matches!(
        src.fetch_headlines().await,
        Err(SourceError::Status(404))
    ));
}

#[tokio::test]
async fn connection_refused_is_transport_error() {
    let src = HtmlSource::new(descriptor("http://127.0.0.1:9/".into(), &[])).unwrap();
    assert!(matches!(
        src.fetch_headlines().await,
        Err(SourceError::Transport(_))
    ));
}

fn slow_source(base: &str, name: &str) -> Arc<dyn HeadlineSource> {
    let mut d = descriptor(format!("{base}/slow"), &[]);
    d.name = name.into();
    d.timeout_secs = 1;
    Arc::new(HtmlSource::new(d).unwrap())
}

#[tokio::test]
async fn slow_site_times_out_at_its_own_deadline() {
    let base = site().await;
    let started = Instant::now();
    let report = scrape_all(&[slow_source(&base, "slow")], 15).await;
    let elapsed = started.elapsed();

    assert!(report.headlines.is_empty());
    assert_eq!(report.failed_sources(), 1);
    assert!(matches!(
        report.sources[0].outcome,
        Err(SourceError::Timeout(d)) if d == Duration::from_secs(1)
    ));
    assert!(elapsed >= Duration::from_millis(900), "{elapsed:?}");
    assert!(elapsed < Duration::from_secs(3), "{elapsed:?}");
}

#[tokio::test]
async fn slow_sources_time_out_concurrently() {
    let base = site().await;
    let sources = vec![
        slow_source(&base, "slow-a"),
        slow_source(&base, "slow-b"),
        Arc::new(HtmlSource::new(descriptor(format!("{base}/markets"), &["share", "stock"])).unwrap())
            as Arc<dyn HeadlineSource>,
    ];
    let started = Instant::now();
    let report = scrape_all(&sources, 15).await;
    let elapsed = started.elapsed();

    // bounded by the slowest timeout, not the sum
    assert!(elapsed < Duration::from_millis(1900), "{elapsed:?}");
    assert_eq!(report.failed_sources(), 2);
    for r in &report.sources[..2] {
        assert!(matches!(r.outcome, Err(SourceError::Timeout(_))), "{}: {:?}", r.source, r.outcome);
    }
    assert_eq!(report.headlines.len(), 2);
}

#[test]
fn invalid_selector_is_rejected_up_front() {
    let mut d = descriptor("http://127.0.0.1:9/".into(), &[]);
    d.selectors.push("h2[".into());
    assert!(matches!(HtmlSource::new(d), Err(SourceError::Selector { .. })));
}
