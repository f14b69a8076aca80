//! Property-style checks for the propagation engine over larger graphs.

use resonance_core::{
    propagate, EdgeType, NodeType, OwnerKey, ResonanceGraph, CHARGE_MAX, CHARGE_MIN,
    MAX_PROPAGATION_HOPS,
};

const EPS: f64 = 1e-9;

/// Small deterministic generator so runs are reproducible.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0 >> 33
    }

    fn unit(&mut self) -> f64 {
        (self.next() % 10_000) as f64 / 10_000.0
    }
}

fn random_graph(seed: u64, nodes: usize, edges: usize) -> ResonanceGraph {
    let mut rng = Lcg(seed);
    let mut g = ResonanceGraph::new(OwnerKey::new("user", "firm"));
    for i in 0..nodes {
        g.add_node(NodeType::Association, &format!("n{i}"), rng.unit());
    }
    for _ in 0..edges {
        let a = rng.next() as usize % nodes;
        let b = rng.next() as usize % nodes;
        let edge_type = if rng.next() % 3 == 0 {
            EdgeType::Contradicts
        } else {
            EdgeType::Reinforces
        };
        g.add_edge(
            NodeType::Association,
            &format!("n{a}"),
            NodeType::Association,
            &format!("n{b}"),
            edge_type,
            rng.unit(),
        );
    }
    g
}

#[test]
fn charges_stay_in_bounds_under_random_events() {
    for seed in 1..=5 {
        let mut g = random_graph(seed, 60, 200);
        let mut rng = Lcg(seed * 31);
        for _ in 0..300 {
            let target = format!("n{}", rng.next() % 60);
            let delta = (rng.unit() - 0.5) * 4.0;
            propagate(&mut g, NodeType::Association, &target, delta, None);
        }
        for (_, node) in g.nodes() {
            assert!(
                node.charge() >= CHARGE_MIN && node.charge() <= CHARGE_MAX,
                "{} out of bounds: {}",
                node.key(),
                node.charge()
            );
        }
    }
}

#[test]
fn hop_count_is_bounded_on_dense_graphs() {
    let mut g = random_graph(7, 120, 800);
    for i in 0..120 {
        let r = propagate(&mut g, NodeType::Association, &format!("n{i}"), 1.0, None);
        assert!(r.hops <= MAX_PROPAGATION_HOPS);
        assert!(r.nodes_affected >= 1);
    }
}

#[test]
fn each_node_updated_at_most_once_per_call() {
    // Complete graph: every node is reachable over many paths.
    let mut g = ResonanceGraph::new(OwnerKey::new("user", "firm"));
    let names: Vec<String> = (0..8).map(|i| format!("k{i}")).collect();
    for a in &names {
        for b in &names {
            g.add_edge(
                NodeType::Association,
                a,
                NodeType::Association,
                b,
                EdgeType::Reinforces,
                1.0,
            );
        }
    }
    let r = propagate(&mut g, NodeType::Association, "k0", 0.25, None);
    assert_eq!(r.nodes_affected, 8);
    assert_eq!(r.hops, 1);
    for name in &names[1..] {
        // 0.25 * 1.0 * 0.4 exactly once.
        assert!((g.get_charge(NodeType::Association, name) - 0.6).abs() < EPS);
    }
}

#[test]
fn contradicts_applies_negated_decayed_delta() {
    for (delta, weight) in [(0.2, 0.5), (-0.3, 0.9), (0.5, 0.25)] {
        let mut g = ResonanceGraph::new(OwnerKey::new("user", "firm"));
        g.add_edge(
            NodeType::Correction,
            "a",
            NodeType::Principle,
            "b",
            EdgeType::Contradicts,
            weight,
        );
        propagate(&mut g, NodeType::Correction, "a", delta, None);
        let expected = 0.5 - delta * weight * 0.4;
        assert!((g.get_charge(NodeType::Principle, "b") - expected).abs() < EPS);
    }
}

#[test]
fn total_delta_sums_requested_magnitudes() {
    let mut g = ResonanceGraph::new(OwnerKey::new("user", "firm"));
    g.add_node(NodeType::Association, "a", 0.9);
    g.add_edge(
        NodeType::Association,
        "a",
        NodeType::Association,
        "b",
        EdgeType::Contradicts,
        1.0,
    );
    // Trigger saturates at the ceiling; the requested delta is still counted.
    let r = propagate(&mut g, NodeType::Association, "a", 0.5, None);
    assert!((r.total_delta - (0.5 + 0.2)).abs() < EPS);
    assert_eq!(g.get_charge(NodeType::Association, "a"), CHARGE_MAX);
}
