//! Cache lookups must not touch storage within the TTL window.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use resonance_core::{
    EdgeMatcher, EventProcessor, GraphLoader, MemoryCategory, NodeType, OwnerKey, ResonanceCache,
    ResonanceConfig, ResonanceEvent,
};
use resonance_state::fakes::{MemoryFragmentStore, MemoryResonanceStore};
use resonance_state::{FragmentQuery, MemoryFragment, MemoryRecordStore, StorageResult};

/// Wraps a record store and counts reads.
struct CountingRecords {
    inner: MemoryFragmentStore,
    reads: AtomicUsize,
}

#[async_trait]
impl MemoryRecordStore for CountingRecords {
    async fn list_fragments(
        &self,
        owner: &OwnerKey,
        query: &FragmentQuery,
    ) -> StorageResult<Vec<MemoryFragment>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.list_fragments(owner, query).await
    }
}

fn owner() -> OwnerKey {
    OwnerKey::new("u", "f")
}

fn counting() -> Arc<CountingRecords> {
    let inner = MemoryFragmentStore::new();
    inner.insert(
        &owner(),
        MemoryCategory::IdentityDimensions,
        MemoryFragment::new("tone", 0.6),
    );
    inner.insert(
        &owner(),
        MemoryCategory::EditSignals,
        MemoryFragment::new("TONE-shift", 0.9),
    );
    Arc::new(CountingRecords {
        inner,
        reads: AtomicUsize::new(0),
    })
}

#[tokio::test(start_paused = true)]
async fn hits_within_ttl_skip_storage() {
    let records = counting();
    let cache = ResonanceCache::new(
        records.clone(),
        Arc::new(MemoryResonanceStore::new()),
        &ResonanceConfig::default().with_cache_ttl(Duration::from_secs(60)),
    );

    cache.load(&owner()).await;
    let per_load = records.reads.load(Ordering::SeqCst);
    assert!(per_load > 0);

    for _ in 0..5 {
        tokio::time::advance(Duration::from_secs(10)).await;
        cache.load(&owner()).await;
    }
    assert_eq!(records.reads.load(Ordering::SeqCst), per_load);

    tokio::time::advance(Duration::from_secs(11)).await;
    cache.load(&owner()).await;
    assert_eq!(records.reads.load(Ordering::SeqCst), per_load * 2);
}

#[tokio::test]
async fn in_process_mutations_are_visible_to_later_lookups() {
    let records = counting();
    let cache = ResonanceCache::new(
        records,
        Arc::new(MemoryResonanceStore::new()),
        &ResonanceConfig::default(),
    );

    {
        let shared = cache.load(&owner()).await;
        let mut graph = shared.lock().await;
        let id = graph.node_id(NodeType::IdentityDimension, "tone").unwrap();
        graph.apply_delta(id, 0.3);
    }
    let shared = cache.load(&owner()).await;
    let graph = shared.lock().await;
    assert!((graph.get_charge(NodeType::IdentityDimension, "tone") - 0.9).abs() < 1e-9);
}

/// Only exact, case-sensitive matches.
struct Exact;

impl EdgeMatcher for Exact {
    fn related(&self, a: &str, b: &str) -> bool {
        a == b
    }
}

#[tokio::test]
async fn loader_matcher_is_pluggable() {
    let store: Arc<MemoryResonanceStore> = Arc::new(MemoryResonanceStore::new());
    let default_loader = GraphLoader::new(counting(), store.clone());
    let graph = default_loader.load(&owner()).await;
    assert_eq!(graph.get_connected(NodeType::EditSignal, "TONE-shift").len(), 1);

    let exact = GraphLoader::new(counting(), store.clone()).with_matcher(Arc::new(Exact));
    let cache = ResonanceCache::with_loader(exact, store, Duration::from_secs(300));
    let shared = cache.load(&owner()).await;
    let graph = shared.lock().await;
    assert!(graph
        .get_connected(NodeType::EditSignal, "TONE-shift")
        .is_empty());
}

#[tokio::test]
async fn cache_processor_uses_the_wiring_matcher() {
    let inner = MemoryFragmentStore::new();
    inner.insert(
        &owner(),
        MemoryCategory::IdentityDimensions,
        MemoryFragment::new("tone:formal", 0.5),
    );
    inner.insert(
        &owner(),
        MemoryCategory::EditSignals,
        MemoryFragment::new("tone", 0.7),
    );
    let records = Arc::new(inner);
    let store = Arc::new(MemoryResonanceStore::new());
    let loader = GraphLoader::new(records, store.clone()).with_matcher(Arc::new(Exact));
    let cache = ResonanceCache::with_loader(loader, store, Duration::from_secs(300));
    let config = ResonanceConfig::default();
    let edit = ResonanceEvent::DocumentEdited {
        dimension: "tone".into(),
        signal_type: None,
    };

    let shared = cache.load(&owner()).await;
    let mut graph = shared.lock().await;
    assert!(graph.get_connected(NodeType::EditSignal, "tone").is_empty());

    cache.processor(&config).process(&mut graph, &edit);
    assert!((graph.get_charge(NodeType::EditSignal, "tone") - 0.82).abs() < 1e-9);
    assert!((graph.get_charge(NodeType::IdentityDimension, "tone:formal") - 0.5).abs() < 1e-9);

    // The default substring policy would have boosted the identity.
    let mut fresh = graph.clone();
    EventProcessor::new(&config).process(&mut fresh, &edit);
    assert!((fresh.get_charge(NodeType::IdentityDimension, "tone:formal") - 0.58).abs() < 1e-9);
}
