//! Bounded, decaying breadth-first signal flood.
//!
//! A delta applied to one trigger node spreads outwards hop by hop. Each
//! crossing multiplies the signal by the edge weight and [`DECAY`];
//! `contradicts` edges flip its sign. Signals weaker than [`THRESHOLD`] stop
//! locally, and nothing travels further than [`MAX_PROPAGATION_HOPS`].
//!
//! A node is visited at most once per call. When a node is reachable over
//! several paths, the first path to reach it in breadth-first order wins,
//! even if a later path would carry a stronger signal.

use std::collections::HashSet;

use resonance_state::NodeType;
use serde::Serialize;
use tracing::debug;

use crate::graph::{NodeId, ResonanceGraph};

pub const MAX_PROPAGATION_HOPS: usize = 3;
pub const DECAY: f64 = 0.4;
pub const THRESHOLD: f64 = 0.01;

/// Tunables for one propagation call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PropagationParams {
    pub max_hops: usize,
    pub decay: f64,
    pub threshold: f64,
}

impl Default for PropagationParams {
    fn default() -> Self {
        Self {
            max_hops: MAX_PROPAGATION_HOPS,
            decay: DECAY,
            threshold: THRESHOLD,
        }
    }
}

/// Observability summary of one propagation. Not used for correctness.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PropagationResult {
    /// Nodes whose charge was written, trigger included.
    pub nodes_affected: usize,
    /// Deepest hop that reached at least one node.
    pub hops: usize,
    /// Sum of absolute requested deltas, before clamping.
    pub total_delta: f64,
}

impl PropagationResult {
    pub fn is_noop(&self) -> bool {
        self.nodes_affected == 0
    }
}

/// Propagate `delta` from the node `(node_type, reference)` using the
/// default parameters. A missing trigger is a no-op.
pub fn propagate(
    graph: &mut ResonanceGraph,
    node_type: NodeType,
    reference: &str,
    delta: f64,
    reason: Option<&str>,
) -> PropagationResult {
    propagate_with(
        graph,
        node_type,
        reference,
        delta,
        reason,
        &PropagationParams::default(),
    )
}

pub fn propagate_with(
    graph: &mut ResonanceGraph,
    node_type: NodeType,
    reference: &str,
    delta: f64,
    reason: Option<&str>,
    params: &PropagationParams,
) -> PropagationResult {
    let Some(trigger) = graph.node_id(node_type, reference) else {
        debug!(%node_type, reference, "propagation trigger not in graph");
        return PropagationResult::default();
    };
    if !delta.is_finite() {
        debug!(%node_type, reference, "ignoring non-finite delta");
        return PropagationResult::default();
    }

    let result = propagate_from(graph, trigger, delta, params);
    debug!(
        %node_type,
        reference,
        delta,
        reason = reason.unwrap_or(""),
        nodes_affected = result.nodes_affected,
        hops = result.hops,
        "propagated"
    );
    result
}

fn propagate_from(
    graph: &mut ResonanceGraph,
    trigger: NodeId,
    delta: f64,
    params: &PropagationParams,
) -> PropagationResult {
    graph.apply_delta(trigger, delta);

    let mut visited: HashSet<NodeId> = HashSet::new();
    visited.insert(trigger);

    let mut result = PropagationResult {
        nodes_affected: 1,
        hops: 0,
        total_delta: delta.abs(),
    };

    let mut frontier: Vec<(NodeId, f64)> = vec![(trigger, delta)];
    for hop in 1..=params.max_hops {
        let mut next = Vec::new();
        for (source, incoming) in &frontier {
            // Edges are Copy; snapshot them so charges can be written while
            // walking the list.
            let edges = graph.node(*source).edges().to_vec();
            for edge in edges {
                if visited.contains(&edge.target) {
                    continue;
                }
                let mut propagated = incoming * edge.weight * params.decay;
                if edge.edge_type.is_inhibitory() {
                    propagated = -propagated;
                }
                if propagated.abs() < params.threshold {
                    continue;
                }
                graph.apply_delta(edge.target, propagated);
                visited.insert(edge.target);
                result.nodes_affected += 1;
                result.total_delta += propagated.abs();
                next.push((edge.target, propagated));
            }
        }
        if next.is_empty() {
            break;
        }
        result.hops = hop;
        frontier = next;
    }
    result
}
