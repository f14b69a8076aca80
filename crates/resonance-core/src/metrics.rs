//! Process-wide atomic counters for the resonance subsystem.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single `tracing::info!`
//! event (e.g. at the end of a task).

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

/// Lightweight atomic counters, no allocations and no locking.
pub struct Metrics {
    events_processed: AtomicU64,
    propagations: AtomicU64,
    nodes_affected: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    persist_failures: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            events_processed: AtomicU64::new(0),
            propagations: AtomicU64::new(0),
            nodes_affected: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            cache_misses: AtomicU64::new(0),
            persist_failures: AtomicU64::new(0),
        }
    }

    pub fn inc_events_processed(&self) {
        self.events_processed.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "events_processed", "counter incremented");
    }

    /// Record one propagation and the number of nodes it touched.
    pub fn record_propagation(&self, nodes_affected: usize) {
        self.propagations.fetch_add(1, Ordering::Relaxed);
        self.nodes_affected
            .fetch_add(nodes_affected as u64, Ordering::Relaxed);
        tracing::trace!(metric = "propagations", "counter incremented");
    }

    pub fn inc_cache_hits(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_cache_misses(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_persist_failures(&self) {
        self.persist_failures.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "persist_failures", "counter incremented");
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            events_processed = self.events_processed(),
            propagations = self.propagations(),
            nodes_affected = self.nodes_affected(),
            cache_hits = self.cache_hits(),
            cache_misses = self.cache_misses(),
            persist_failures = self.persist_failures(),
        );
    }

    pub fn events_processed(&self) -> u64 {
        self.events_processed.load(Ordering::Relaxed)
    }

    pub fn propagations(&self) -> u64 {
        self.propagations.load(Ordering::Relaxed)
    }

    pub fn nodes_affected(&self) -> u64 {
        self.nodes_affected.load(Ordering::Relaxed)
    }

    pub fn cache_hits(&self) -> u64 {
        self.cache_hits.load(Ordering::Relaxed)
    }

    pub fn cache_misses(&self) -> u64 {
        self.cache_misses.load(Ordering::Relaxed)
    }

    pub fn persist_failures(&self) -> u64 {
        self.persist_failures.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        self.events_processed.store(0, Ordering::Relaxed);
        self.propagations.store(0, Ordering::Relaxed);
        self.nodes_affected.store(0, Ordering::Relaxed);
        self.cache_hits.store(0, Ordering::Relaxed);
        self.cache_misses.store(0, Ordering::Relaxed);
        self.persist_failures.store(0, Ordering::Relaxed);
    }
}
