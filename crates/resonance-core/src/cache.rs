//! Owner-scoped TTL cache of hydrated graphs, plus dirty-only write-back.
//!
//! One `ResonanceCache` is created per process and shared by the task
//! pipeline. Each cached graph sits behind its own async mutex; holding that
//! guard is how callers get single-writer access for one owner.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use resonance_state::{MemoryRecordStore, OwnerKey, ResonanceStore};
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, instrument};

use crate::config::ResonanceConfig;
use crate::events::EventProcessor;
use crate::graph::ResonanceGraph;
use crate::hydrate::GraphLoader;
use crate::metrics::METRICS;
use crate::obs;

/// A cached graph. Lock it to read or mutate.
pub type SharedGraph = Arc<Mutex<ResonanceGraph>>;

struct CacheEntry {
    graph: SharedGraph,
    built_at: Instant,
}

/// Outcome of one persist call. Failures are reported here, never raised.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PersistReport {
    pub nodes_written: usize,
    pub edges_written: usize,
    /// True if either write failed; the matching dirty set was kept.
    pub failed: bool,
}

pub struct ResonanceCache {
    loader: GraphLoader,
    resonance: Arc<dyn ResonanceStore>,
    ttl: Duration,
    entries: Mutex<HashMap<OwnerKey, CacheEntry>>,
}

impl ResonanceCache {
    pub fn new(
        records: Arc<dyn MemoryRecordStore>,
        resonance: Arc<dyn ResonanceStore>,
        config: &ResonanceConfig,
    ) -> Self {
        let loader = GraphLoader::new(records, Arc::clone(&resonance));
        Self::with_loader(loader, resonance, config.cache_ttl)
    }

    /// Use a preconfigured loader (e.g. with a custom matcher).
    pub fn with_loader(
        loader: GraphLoader,
        resonance: Arc<dyn ResonanceStore>,
        ttl: Duration,
    ) -> Self {
        Self {
            loader,
            resonance,
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Event processor sharing this cache's edge matcher, so
    /// `document_edited` relates dimensions the same way wiring did.
    pub fn processor(&self, config: &ResonanceConfig) -> EventProcessor {
        EventProcessor::new(config).with_matcher(self.loader.matcher())
    }

    /// Cached graph for `owner`, hydrating on a miss or once the entry is
    /// older than the TTL.
    #[instrument(skip(self), fields(owner = %owner))]
    pub async fn load(&self, owner: &OwnerKey) -> SharedGraph {
        {
            let entries = self.entries.lock().await;
            if let Some(entry) = entries.get(owner) {
                if entry.built_at.elapsed() < self.ttl {
                    METRICS.inc_cache_hits();
                    obs::emit_cache_lookup(owner, true);
                    return Arc::clone(&entry.graph);
                }
            }
        }
        METRICS.inc_cache_misses();
        obs::emit_cache_lookup(owner, false);

        let started = Instant::now();
        let graph = Arc::new(Mutex::new(self.loader.load(owner).await));

        let mut entries = self.entries.lock().await;
        // Another task may have hydrated the same owner while we were
        // reading; keep one live instance per owner.
        if let Some(entry) = entries.get(owner) {
            if entry.built_at >= started {
                return Arc::clone(&entry.graph);
            }
        }
        entries.insert(
            owner.clone(),
            CacheEntry {
                graph: Arc::clone(&graph),
                built_at: Instant::now(),
            },
        );
        graph
    }

    /// Drop the cached graph for `owner`. Returns whether one was cached.
    pub async fn invalidate(&self, owner: &OwnerKey) -> bool {
        let removed = self.entries.lock().await.remove(owner).is_some();
        debug!(owner = %owner, removed, "cache entry invalidated");
        removed
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    /// Write back dirty charges and edges. Each dirty set is cleared only
    /// when its own write succeeds.
    #[instrument(skip(self, graph), fields(owner = %graph.owner()))]
    pub async fn persist(&self, graph: &mut ResonanceGraph) -> PersistReport {
        let owner = graph.owner().clone();
        let mut report = PersistReport::default();

        let charges = graph.dirty_charge_records();
        if !charges.is_empty() {
            match self.resonance.upsert_charges(&owner, &charges).await {
                Ok(()) => {
                    graph.clear_dirty_nodes();
                    report.nodes_written = charges.len();
                }
                Err(e) => {
                    METRICS.inc_persist_failures();
                    obs::emit_persist_failed(&owner, "charges", charges.len(), &e);
                    report.failed = true;
                }
            }
        }

        let edges = graph.dirty_edge_records();
        if !edges.is_empty() {
            match self.resonance.upsert_edges(&owner, &edges).await {
                Ok(()) => {
                    graph.clear_dirty_edges();
                    report.edges_written = edges.len();
                }
                Err(e) => {
                    METRICS.inc_persist_failures();
                    obs::emit_persist_failed(&owner, "edges", edges.len(), &e);
                    report.failed = true;
                }
            }
        }

        if !report.failed {
            obs::emit_persist_completed(&owner, report.nodes_written, report.edges_written);
        }
        report
    }
}
