//! Graph hydration: build one owner's graph from persisted state plus the
//! memory record store.
//!
//! Precedence, in order:
//! 1. persisted charges (authoritative prior state)
//! 2. persisted edges, creating endpoints with persisted or default charge
//! 3. memory categories, each capped, charge from persistence else the
//!    record's own strength
//! 4. persisted-only nodes, highest charge first
//! 5. the heuristic wiring pass
//!
//! Every step is isolated. A failing read is logged and skipped and the
//! graph comes out sparser but usable.

pub mod wiring;

use std::collections::HashMap;
use std::sync::Arc;

use resonance_state::{
    FragmentQuery, MemoryCategory, MemoryRecordStore, NodeType, OwnerKey, ResonanceStore,
};
use tokio::time::Instant;
use tracing::{debug, instrument};

use crate::graph::{NodeId, ResonanceGraph, DEFAULT_CHARGE, MAX_EDGES_PER_NODE, MAX_NODES};
use crate::obs;
pub use wiring::{EdgeMatcher, SubstringMatcher};

/// How many records of one category hydration reads, and which.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CategoryPlan {
    pub category: MemoryCategory,
    pub limit: usize,
    pub min_strength: Option<f64>,
    pub active_only: bool,
}

impl CategoryPlan {
    const fn top(category: MemoryCategory, limit: usize) -> Self {
        Self {
            category,
            limit,
            min_strength: None,
            active_only: false,
        }
    }

    const fn above(category: MemoryCategory, limit: usize, floor: f64) -> Self {
        Self {
            category,
            limit,
            min_strength: Some(floor),
            active_only: false,
        }
    }

    pub fn query(&self) -> FragmentQuery {
        let mut query = FragmentQuery::new(self.category, self.limit);
        query.min_strength = self.min_strength;
        query.active_only = self.active_only;
        query
    }
}

/// Category caps, read in this order.
pub const CATEGORY_PLAN: [CategoryPlan; 8] = [
    CategoryPlan::above(MemoryCategory::IdentityDimensions, 30, 0.3),
    CategoryPlan::top(MemoryCategory::Exemplars, 20),
    CategoryPlan::top(MemoryCategory::Corrections, 20),
    CategoryPlan::above(MemoryCategory::Associations, 30, 0.2),
    CategoryPlan::above(MemoryCategory::EditSignals, 15, 0.6),
    CategoryPlan {
        category: MemoryCategory::QualityRules,
        limit: 10,
        min_strength: None,
        active_only: true,
    },
    CategoryPlan::top(MemoryCategory::Principles, 15),
    CategoryPlan::top(MemoryCategory::ToolChains, 10),
];

/// What a hydration produced, for logging and tests.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HydrationReport {
    /// Steps that failed and were skipped, e.g. `charges` or `category:exemplars`.
    pub failed_steps: Vec<String>,
    pub restored_edges: usize,
    pub wired_edges: usize,
    /// Nodes or edges dropped by the node and edge ceilings.
    pub capped: usize,
}

/// Builds graphs from the two storage seams.
#[derive(Clone)]
pub struct GraphLoader {
    records: Arc<dyn MemoryRecordStore>,
    resonance: Arc<dyn ResonanceStore>,
    matcher: Arc<dyn EdgeMatcher>,
}

impl GraphLoader {
    pub fn new(records: Arc<dyn MemoryRecordStore>, resonance: Arc<dyn ResonanceStore>) -> Self {
        Self {
            records,
            resonance,
            matcher: Arc::new(SubstringMatcher),
        }
    }

    pub fn with_matcher(mut self, matcher: Arc<dyn EdgeMatcher>) -> Self {
        self.matcher = matcher;
        self
    }

    pub fn matcher(&self) -> Arc<dyn EdgeMatcher> {
        Arc::clone(&self.matcher)
    }

    /// Hydrate a graph, discarding the report.
    pub async fn load(&self, owner: &OwnerKey) -> ResonanceGraph {
        self.hydrate(owner).await.0
    }

    #[instrument(skip(self), fields(owner = %owner))]
    pub async fn hydrate(&self, owner: &OwnerKey) -> (ResonanceGraph, HydrationReport) {
        let started = Instant::now();
        let mut graph = ResonanceGraph::new(owner.clone());
        let mut report = HydrationReport::default();

        // 1. persisted charges
        let mut persisted: HashMap<(NodeType, String), f64> = HashMap::new();
        match self.resonance.load_charges(owner).await {
            Ok(rows) => {
                for row in rows {
                    persisted.insert((row.node_type, row.node_ref), row.charge);
                }
            }
            Err(e) => {
                obs::emit_hydration_step_failed(owner, "charges", None, &e);
                report.failed_steps.push("charges".to_string());
            }
        }
        let charge_of = |node_type: NodeType, reference: &str, fallback: f64| {
            persisted
                .get(&(node_type, reference.to_string()))
                .copied()
                .unwrap_or(fallback)
        };

        // 2. persisted edges
        match self.resonance.load_edges(owner).await {
            Ok(rows) => {
                for row in rows {
                    let a = ensure_node(
                        &mut graph,
                        row.a_type,
                        &row.a_ref,
                        charge_of(row.a_type, &row.a_ref, DEFAULT_CHARGE),
                    );
                    let b = ensure_node(
                        &mut graph,
                        row.b_type,
                        &row.b_ref,
                        charge_of(row.b_type, &row.b_ref, DEFAULT_CHARGE),
                    );
                    let (Some(a), Some(b)) = (a, b) else {
                        report.capped += 1;
                        continue;
                    };
                    if graph.degree(a) >= MAX_EDGES_PER_NODE
                        || graph.degree(b) >= MAX_EDGES_PER_NODE
                    {
                        report.capped += 1;
                        continue;
                    }
                    if graph.restore_edge(a, b, row.edge_type, row.weight) {
                        report.restored_edges += 1;
                    }
                }
            }
            Err(e) => {
                obs::emit_hydration_step_failed(owner, "edges", None, &e);
                report.failed_steps.push("edges".to_string());
            }
        }

        // 3. memory categories
        let mut concepts: HashMap<String, Vec<String>> = HashMap::new();
        for plan in CATEGORY_PLAN {
            let node_type = plan.category.node_type();
            let fragments = match self.records.list_fragments(owner, &plan.query()).await {
                Ok(fragments) => fragments,
                Err(e) => {
                    obs::emit_hydration_step_failed(owner, "category", Some(plan.category), &e);
                    report
                        .failed_steps
                        .push(format!("category:{}", plan.category));
                    continue;
                }
            };
            debug!(category = %plan.category, count = fragments.len(), "fragments loaded");
            for fragment in fragments {
                let charge = charge_of(node_type, &fragment.reference, fragment.strength);
                if ensure_node(&mut graph, node_type, &fragment.reference, charge).is_none() {
                    report.capped += 1;
                    continue;
                }
                graph.set_label(node_type, &fragment.reference, fragment.content.clone());
                if node_type == NodeType::Association && !fragment.concepts.is_empty() {
                    concepts.insert(fragment.reference, fragment.concepts);
                }
            }
        }

        // 4. persisted-only nodes
        let mut orphans: Vec<((NodeType, String), f64)> = persisted
            .into_iter()
            .filter(|((t, r), _)| !graph.contains(*t, r))
            .collect();
        orphans.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        for ((node_type, reference), charge) in orphans {
            if ensure_node(&mut graph, node_type, &reference, charge).is_none() {
                report.capped += 1;
            }
        }

        // 5. wiring
        report.wired_edges = wiring::wire(&mut graph, &concepts, self.matcher.as_ref());

        obs::emit_graph_hydrated(
            owner,
            graph.node_count(),
            graph.edge_count(),
            report.failed_steps.len(),
            started.elapsed().as_millis() as u64,
        );
        (graph, report)
    }
}

/// Existing node, or a new one if the graph is below [`MAX_NODES`].
fn ensure_node(
    graph: &mut ResonanceGraph,
    node_type: NodeType,
    reference: &str,
    charge: f64,
) -> Option<NodeId> {
    if let Some(id) = graph.node_id(node_type, reference) {
        return Some(id);
    }
    if graph.node_count() >= MAX_NODES {
        return None;
    }
    Some(graph.add_node(node_type, reference, charge))
}
