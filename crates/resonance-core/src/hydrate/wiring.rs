//! Heuristic cross-category edges added after hydration.
//!
//! Matching policy lives behind [`EdgeMatcher`] so it can be swapped and
//! tested without touching the graph or the propagation engine.

use std::collections::HashMap;

use resonance_state::{EdgeType, NodeType};

use crate::graph::{NodeId, ResonanceGraph, MAX_EDGES_PER_NODE};

pub const SAME_DIMENSION_WEIGHT: f64 = 0.7;
pub const PRINCIPLE_RULE_WEIGHT: f64 = 0.5;
pub const EXEMPLAR_WEIGHT: f64 = 0.4;
pub const CORRECTION_WEIGHT: f64 = 0.6;
pub const ASSOCIATION_WEIGHT: f64 = 0.5;

/// Exemplars and corrections attach to this many identity dimensions.
pub const IDENTITY_FANOUT: usize = 5;
/// Each association is compared with this many later associations.
pub const ASSOCIATION_WINDOW: usize = 5;

/// Decides whether two references describe the same thing.
pub trait EdgeMatcher: Send + Sync {
    fn related(&self, a: &str, b: &str) -> bool;
}

/// Case-insensitive substring match in either direction. Empty strings
/// never match.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubstringMatcher;

impl EdgeMatcher for SubstringMatcher {
    fn related(&self, a: &str, b: &str) -> bool {
        let a = a.trim().to_lowercase();
        let b = b.trim().to_lowercase();
        if a.is_empty() || b.is_empty() {
            return false;
        }
        a.contains(&b) || b.contains(&a)
    }
}

/// Lowercased alphanumeric tokens of a reference. Used as the concept set of
/// an association whose record carried none.
pub fn reference_concepts(reference: &str) -> Vec<String> {
    reference
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn shares_concept(a: &[String], b: &[String]) -> bool {
    a.iter().any(|x| b.iter().any(|y| x.eq_ignore_ascii_case(y)))
}

/// Link two nodes unless either is already at its edge ceiling.
fn try_link(
    graph: &mut ResonanceGraph,
    a: NodeId,
    b: NodeId,
    edge_type: EdgeType,
    weight: f64,
) -> bool {
    if graph.degree(a) >= MAX_EDGES_PER_NODE || graph.degree(b) >= MAX_EDGES_PER_NODE {
        return false;
    }
    graph.connect(a, b, edge_type, weight)
}

fn ids_of(graph: &ResonanceGraph, node_type: NodeType) -> Vec<NodeId> {
    graph.nodes_of_type(node_type).map(|(id, _)| id).collect()
}

/// Run the fixed wiring pass. `concepts` maps association references to
/// their recorded concepts. Returns the number of edges added.
pub fn wire(
    graph: &mut ResonanceGraph,
    concepts: &HashMap<String, Vec<String>>,
    matcher: &dyn EdgeMatcher,
) -> usize {
    let identities = ids_of(graph, NodeType::IdentityDimension);
    let mut added = 0;

    // identity <-> edit signal
    for signal in ids_of(graph, NodeType::EditSignal) {
        for identity in &identities {
            let related = matcher.related(
                graph.node(*identity).reference(),
                graph.node(signal).reference(),
            );
            if related
                && try_link(
                    graph,
                    *identity,
                    signal,
                    EdgeType::SameDimension,
                    SAME_DIMENSION_WEIGHT,
                )
            {
                added += 1;
            }
        }
    }

    // principle <-> quality rule, full mesh
    let rules = ids_of(graph, NodeType::QualityRule);
    for principle in ids_of(graph, NodeType::Principle) {
        for rule in &rules {
            if try_link(
                graph,
                principle,
                *rule,
                EdgeType::CoOccurred,
                PRINCIPLE_RULE_WEIGHT,
            ) {
                added += 1;
            }
        }
    }

    // exemplars and corrections -> leading identity dimensions
    let leading: Vec<NodeId> = identities.iter().copied().take(IDENTITY_FANOUT).collect();
    for (node_type, edge_type, weight) in [
        (NodeType::Exemplar, EdgeType::Reinforces, EXEMPLAR_WEIGHT),
        (NodeType::Correction, EdgeType::DerivedFrom, CORRECTION_WEIGHT),
    ] {
        for source in ids_of(graph, node_type) {
            for identity in &leading {
                if try_link(graph, source, *identity, edge_type, weight) {
                    added += 1;
                }
            }
        }
    }

    // association <-> association on a shared concept, windowed
    let associations = ids_of(graph, NodeType::Association);
    let concept_sets: Vec<Vec<String>> = associations
        .iter()
        .map(|id| {
            let reference = graph.node(*id).reference();
            match concepts.get(reference) {
                Some(c) if !c.is_empty() => c.clone(),
                _ => reference_concepts(reference),
            }
        })
        .collect();
    for (i, a) in associations.iter().enumerate() {
        let window = associations
            .iter()
            .enumerate()
            .skip(i + 1)
            .take(ASSOCIATION_WINDOW);
        for (j, b) in window {
            if shares_concept(&concept_sets[i], &concept_sets[j])
                && try_link(graph, *a, *b, EdgeType::CoOccurred, ASSOCIATION_WEIGHT)
            {
                added += 1;
            }
        }
    }

    added
}
