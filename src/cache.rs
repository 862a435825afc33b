//! Process-wide holder of the last published signal set.
//!
//! Readers get an owned `Arc` snapshot and never block; a publish swaps the whole
//! entry (set + generation) in one pointer store, so a reader sees either the old
//! or the new set, never a mix.

use std::sync::Arc;

use arc_swap::ArcSwap;
use tracing::info;

use crate::signal::{Mode, SignalSet};

/// One published generation.
#[derive(Debug)]
pub struct CacheEntry {
    pub generation: u64,
    pub set: Arc<SignalSet>,
}

pub struct SignalCache {
    inner: ArcSwap<CacheEntry>,
}

impl SignalCache {
    /// Empty cache at generation 0.
    pub fn new(mode: Mode) -> Self {
        Self {
            inner: ArcSwap::from_pointee(CacheEntry {
                generation: 0,
                set: Arc::new(SignalSet::empty(mode)),
            }),
        }
    }

    /// Current set; returns immediately, possibly empty.
    pub fn get_current(&self) -> Arc<SignalSet> {
        Arc::clone(&self.inner.load().set)
    }

    /// Set and generation as one consistent snapshot.
    pub fn snapshot(&self) -> Arc<CacheEntry> {
        self.inner.load_full()
    }

    pub fn generation(&self) -> u64 {
        self.inner.load().generation
    }

    /// Replace the current set. Overlapping publishers are linearized: each gets a
    /// distinct generation and the last store wins. Returns the new generation.
    pub fn publish(&self, set: SignalSet) -> u64 {
        self.publish_shared(Arc::new(set))
    }

    /// As `publish`, for a set the caller keeps a handle to.
    pub fn publish_shared(&self, set: Arc<SignalSet>) -> u64 {
        let previous = self.inner.rcu(|cur| CacheEntry {
            generation: cur.generation + 1,
            set: Arc::clone(&set),
        });
        let generation = previous.generation + 1;
        metrics::gauge!("signal_cache_generation").set(generation as f64);
        info!(
            target: "cache",
            generation,
            count = set.count(),
            mode = %set.mode(),
            "signal set published"
        );
        generation
    }
}
