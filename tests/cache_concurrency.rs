// tests/cache_concurrency.rs
use std::sync::Arc;

use headline_signals::cache::SignalCache;
use headline_signals::signal::{
    AnalysisResult, Backend, EventKind, Mode, Sentiment, Signal, SignalSet, Verdict,
};

fn set_of(n: usize) -> SignalSet {
    let signals = (0..n)
        .map(|i| {
            AnalysisResult::from_verdict(
                Verdict {
                    stock: format!("Stock{i}"),
                    event: EventKind::CorporateNews,
                    sentiment: Sentiment::Neutral,
                    signal: Signal::Hold,
                    confidence: 60,
                    reason: "steady".into(),
                },
                format!("headline {i}"),
                Backend::Heuristic,
            )
        })
        .collect();
    SignalSet::new(signals, Mode::Demo)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn readers_never_see_partial_sets() {
    let cache = Arc::new(SignalCache::new(Mode::Demo));

    let writers: Vec<_> = (0..8)
        .map(|w| {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move {
                for i in 0..50 {
                    cache.publish(set_of((w * 7 + i) % 13));
                    tokio::task::yield_now().await;
                }
            })
        })
        .collect();

    let readers: Vec<_> = (0..8)
        .map(|_| {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move {
                let mut last_generation = 0;
                for _ in 0..200 {
                    let entry = cache.snapshot();
                    assert_eq!(entry.set.count(), entry.set.signals().len());
                    assert!(entry.generation >= last_generation);
                    last_generation = entry.generation;
                    tokio::task::yield_now().await;
                }
            })
        })
        .collect();

    for h in writers.into_iter().chain(readers) {
        h.await.unwrap();
    }
    assert_eq!(cache.generation(), 400);
}
