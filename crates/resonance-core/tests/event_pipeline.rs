//! End-to-end: hydrate through the cache, apply events, persist, reload.
//!
//! The round-trip runs against both the in-memory fakes and the in-memory
//! SurrealDB backend.

use std::sync::Arc;

use resonance_core::{
    render_for_prompt, EventProcessor, MemoryCategory, NodeType, OwnerKey, ResonanceCache,
    ResonanceConfig, ResonanceEvent,
};
use resonance_state::fakes::{MemoryFragmentStore, MemoryResonanceStore};
use resonance_state::{MemoryFragment, MemoryRecordStore, ResonanceStore, SurrealResonanceStore};

const EPS: f64 = 1e-9;

fn owner() -> OwnerKey {
    OwnerKey::new("user-7", "firm-2")
}

fn seed() -> Vec<(MemoryCategory, MemoryFragment)> {
    vec![
        (
            MemoryCategory::IdentityDimensions,
            MemoryFragment::new("tone", 0.6).with_content("Plain, direct tone"),
        ),
        (
            MemoryCategory::IdentityDimensions,
            MemoryFragment::new("citation-style", 0.7),
        ),
        (
            MemoryCategory::EditSignals,
            MemoryFragment::new("tone:softer", 0.8),
        ),
        (
            MemoryCategory::Corrections,
            MemoryFragment::new("pinpoint-cites", 0.5).with_content("Always pinpoint cite"),
        ),
        (
            MemoryCategory::Exemplars,
            MemoryFragment::new("research-memo-2024", 0.5),
        ),
        (
            MemoryCategory::Associations,
            MemoryFragment::new("laches", 0.4).with_concepts(["delay", "equity"]),
        ),
        (
            MemoryCategory::Associations,
            MemoryFragment::new("estoppel", 0.4).with_concepts(["equity"]),
        ),
        (
            MemoryCategory::Principles,
            MemoryFragment::new("answer-first", 0.5),
        ),
        (
            MemoryCategory::QualityRules,
            MemoryFragment::new("define-terms", 0.5),
        ),
        (
            MemoryCategory::ToolChains,
            MemoryFragment::new("research", 0.5),
        ),
    ]
}

async fn round_trip(records: Arc<dyn MemoryRecordStore>, store: Arc<dyn ResonanceStore>) {
    let cache = ResonanceCache::new(records, store, &ResonanceConfig::default());
    let processor = EventProcessor::default();

    let shared = cache.load(&owner()).await;
    let (snapshot, edges_before) = {
        let mut graph = shared.lock().await;
        assert!(graph.contains(NodeType::ToolChain, "research"));
        assert!(graph.edge_count() > 0);

        processor.process(
            &mut graph,
            &ResonanceEvent::Approved {
                work_type: "research".into(),
                task_id: Some("task-1".into()),
                score: Some(80.0),
            },
        );
        processor.process(
            &mut graph,
            &ResonanceEvent::DocumentEdited {
                dimension: "tone".into(),
                signal_type: Some("softened".into()),
            },
        );
        processor.process(&mut graph, &ResonanceEvent::Feedback { rating: 5.0 });

        let snapshot = graph.dirty_charge_records();
        assert!(!snapshot.is_empty());
        let edges_before = graph.edge_count();

        let report = cache.persist(&mut graph).await;
        assert!(!report.failed);
        assert_eq!(report.nodes_written, snapshot.len());
        assert!(!graph.is_dirty());
        (snapshot, edges_before)
    };

    assert!(cache.invalidate(&owner()).await);
    let reloaded = cache.load(&owner()).await;
    assert!(!Arc::ptr_eq(&shared, &reloaded));

    let graph = reloaded.lock().await;
    for record in &snapshot {
        let charge = graph.get_charge(record.node_type, &record.node_ref);
        assert!(
            (charge - record.charge).abs() < EPS,
            "{}:{} reloaded as {} expected {}",
            record.node_type,
            record.node_ref,
            charge,
            record.charge
        );
    }
    assert_eq!(graph.edge_count(), edges_before);
    // Persisted edges come back clean and wiring adds nothing new.
    assert!(!graph.is_dirty());
}

#[tokio::test]
async fn round_trip_with_fakes() {
    let records = Arc::new(MemoryFragmentStore::new());
    for (category, fragment) in seed() {
        records.insert(&owner(), category, fragment);
    }
    round_trip(records, Arc::new(MemoryResonanceStore::new())).await;
}

#[tokio::test]
async fn round_trip_with_surreal() {
    let store = SurrealResonanceStore::in_memory().await.unwrap();
    for (category, fragment) in seed() {
        store.put_fragment(&owner(), category, fragment).await.unwrap();
    }
    let store = Arc::new(store);
    round_trip(store.clone(), store).await;
}

#[tokio::test]
async fn approved_scenario_from_cold_load() {
    let records = Arc::new(MemoryFragmentStore::new());
    records.insert(
        &owner(),
        MemoryCategory::ToolChains,
        MemoryFragment::new("research", 0.5),
    );
    let cache = ResonanceCache::new(
        records,
        Arc::new(MemoryResonanceStore::new()),
        &ResonanceConfig::default(),
    );

    let shared = cache.load(&owner()).await;
    let mut graph = shared.lock().await;
    let outcome = EventProcessor::default()
        .process_raw(
            &mut graph,
            "approved",
            serde_json::json!({"work_type": "research", "score": 80}),
        )
        .unwrap();
    assert_eq!(outcome.propagations.len(), 1);
    assert!((graph.get_charge(NodeType::ToolChain, "research") - 0.62).abs() < EPS);
}

#[tokio::test]
async fn rejected_scenario_from_cold_load() {
    let records = Arc::new(MemoryFragmentStore::new());
    records.insert(
        &owner(),
        MemoryCategory::Corrections,
        MemoryFragment::new("c1", 0.5),
    );
    let cache = ResonanceCache::new(
        records,
        Arc::new(MemoryResonanceStore::new()),
        &ResonanceConfig::default(),
    );

    let shared = cache.load(&owner()).await;
    let mut graph = shared.lock().await;
    EventProcessor::default().process(
        &mut graph,
        &ResonanceEvent::Rejected {
            work_type: "x".into(),
            feedback: None,
        },
    );
    assert!((graph.get_charge(NodeType::Correction, "c1") - 0.58).abs() < EPS);
}

#[tokio::test]
async fn failing_reads_and_writes_never_abort() {
    let records = Arc::new(MemoryFragmentStore::new());
    for (category, fragment) in seed() {
        records.insert(&owner(), category, fragment);
    }
    records.fail_category(MemoryCategory::Associations);
    let store = Arc::new(MemoryResonanceStore::new());
    store.set_fail_reads(true);
    store.set_fail_writes(true);

    let cache = ResonanceCache::new(records, store.clone(), &ResonanceConfig::default());
    let shared = cache.load(&owner()).await;
    let mut graph = shared.lock().await;

    // Sparser, but usable.
    assert!(!graph.contains(NodeType::Association, "laches"));
    assert!(graph.contains(NodeType::Correction, "pinpoint-cites"));

    EventProcessor::default().process(
        &mut graph,
        &ResonanceEvent::TaskComplete {
            work_type: "research".into(),
        },
    );
    let report = cache.persist(&mut graph).await;
    assert!(report.failed);
    assert!(graph.is_dirty());
    assert_eq!(store.charge_writes(), 0);

    let text = render_for_prompt(&graph, 500);
    assert!(text.contains("Always pinpoint cite"));
    assert!(text.chars().count() <= 500);
}
