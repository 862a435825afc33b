// src/ingest/providers/sample.rs
//! Demo-mode source: draws a random subset of canned headlines on every fetch.

use std::sync::Mutex;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::Rng;

use crate::analyze::heuristic::rng_from_seed;
use crate::ingest::types::{HeadlineSource, SourceError};

pub struct SampleSource {
    headlines: Vec<String>,
    min: usize,
    max: usize,
    rng: Mutex<StdRng>,
}

impl SampleSource {
    pub fn new(headlines: Vec<String>, min: usize, max: usize, seed: Option<u64>) -> Self {
        let (min, max) = if min > max { (max, min) } else { (min, max) };
        Self {
            headlines,
            min,
            max,
            rng: Mutex::new(rng_from_seed(seed)),
        }
    }

    /// Draw `min..=max` distinct headlines (bounded by the pool size).
    pub fn draw(&self) -> Vec<String> {
        let mut rng = self.rng.lock().unwrap_or_else(|p| p.into_inner());
        let hi = self.max.min(self.headlines.len());
        let lo = self.min.min(hi);
        let k = rng.random_range(lo..=hi);
        self.headlines
            .choose_multiple(&mut *rng, k)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl HeadlineSource for SampleSource {
    async fn fetch_headlines(&self) -> Result<Vec<String>, SourceError> {
        Ok(self.draw())
    }

    fn name(&self) -> &str {
        "sample"
    }
}
