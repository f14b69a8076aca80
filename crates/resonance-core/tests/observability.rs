//! Observability tests for graph lifecycle tracing and counters.

use std::sync::Arc;

use resonance_core::metrics::METRICS;
use resonance_core::obs::{
    emit_cache_lookup, emit_event_processed, emit_graph_hydrated, emit_hydration_step_failed,
    emit_persist_completed, emit_persist_failed, emit_propagation, GraphSpan,
};
use resonance_core::{
    EventProcessor, MemoryCategory, NodeType, OwnerKey, PropagationResult, ResonanceCache,
    ResonanceConfig, ResonanceEvent,
};
use resonance_state::fakes::{MemoryFragmentStore, MemoryResonanceStore};
use resonance_state::{MemoryFragment, StorageError};
use tracing_test::traced_test;

fn owner() -> OwnerKey {
    OwnerKey::new("obs-user", "obs-firm")
}

#[traced_test]
#[test]
fn test_emitters_log_event_names() {
    let result = PropagationResult {
        nodes_affected: 3,
        hops: 2,
        total_delta: 0.2,
    };
    emit_propagation(NodeType::ToolChain, "research", &result, Some("approved"));
    emit_event_processed(&owner(), "approved", 4, 0);
    emit_graph_hydrated(&owner(), 12, 9, 0, 3);
    emit_persist_completed(&owner(), 5, 2);
    emit_cache_lookup(&owner(), true);

    assert!(logs_contain("graph.propagated"));
    assert!(logs_contain("graph.event_processed"));
    assert!(logs_contain("graph.hydrated"));
    assert!(logs_contain("graph.persisted"));
    assert!(logs_contain("graph.cache_lookup"));
}

#[traced_test]
#[test]
fn test_failures_log_at_warn() {
    let err = StorageError::Backend("connection reset".into());
    emit_hydration_step_failed(&owner(), "category", Some(MemoryCategory::Exemplars), &err);
    emit_persist_failed(&owner(), "edges", 7, &err);

    assert!(logs_contain("WARN"));
    assert!(logs_contain("graph.hydration_step_failed"));
    assert!(logs_contain("graph.persist_failed"));
    assert!(logs_contain("connection reset"));
}

#[traced_test]
#[test]
fn test_graph_span_tags_owner() {
    let _span = GraphSpan::enter(&owner());
    tracing::info!("inside span");
    assert!(logs_contain("obs-user/obs-firm"));
}

#[tokio::test]
#[traced_test]
async fn test_pipeline_updates_counters() {
    let records = Arc::new(MemoryFragmentStore::new());
    records.insert(
        &owner(),
        MemoryCategory::ToolChains,
        MemoryFragment::new("review", 0.5),
    );
    let cache = ResonanceCache::new(
        records,
        Arc::new(MemoryResonanceStore::new()),
        &ResonanceConfig::default(),
    );

    // Counters are process-wide and other tests run in parallel, so only
    // check that they moved.
    let events_before = METRICS.events_processed();
    let misses_before = METRICS.cache_misses();
    let hits_before = METRICS.cache_hits();

    let shared = cache.load(&owner()).await;
    let _again = cache.load(&owner()).await;
    {
        let mut graph = shared.lock().await;
        EventProcessor::default().process(
            &mut graph,
            &ResonanceEvent::TaskComplete {
                work_type: "review".into(),
            },
        );
    }

    assert!(METRICS.events_processed() > events_before);
    assert!(METRICS.cache_misses() > misses_before);
    assert!(METRICS.cache_hits() > hits_before);
    assert!(logs_contain("graph.hydrated"));

    METRICS.flush();
    assert!(logs_contain("flush"));
}
