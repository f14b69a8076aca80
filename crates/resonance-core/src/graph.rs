//! Weighted, typed resonance graph over memory fragments.
//!
//! Nodes live in an arena (`Vec<Node>`) addressed by [`NodeId`]; a
//! `(NodeType, reference)` lookup table resolves opaque references to ids.
//! Every edge is stored twice, once in each endpoint's adjacency list, so
//! traversal is symmetric. Charges are clamped to
//! `[CHARGE_MIN, CHARGE_MAX]` on every write.
//!
//! The graph has no internal locking. One owner's graph is mutated by one
//! task at a time.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use resonance_state::{ChargeRecord, EdgeRecord, EdgeType, NodeType, OwnerKey};
use serde::{Deserialize, Serialize};

use crate::error::ResonanceError;

pub const CHARGE_MIN: f64 = 0.01;
pub const CHARGE_MAX: f64 = 1.0;
pub const DEFAULT_CHARGE: f64 = 0.5;

/// Node ceiling enforced during hydration.
pub const MAX_NODES: usize = 300;
/// Per-node edge ceiling enforced during hydration.
pub const MAX_EDGES_PER_NODE: usize = 15;

/// Clamp a charge into the legal range.
pub fn clamp_charge(charge: f64) -> f64 {
    if charge.is_nan() {
        return DEFAULT_CHARGE;
    }
    charge.clamp(CHARGE_MIN, CHARGE_MAX)
}

/// Identity of a node: its type plus an opaque reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeKey {
    pub node_type: NodeType,
    pub reference: String,
}

impl NodeKey {
    pub fn new(node_type: NodeType, reference: impl Into<String>) -> Self {
        Self {
            node_type,
            reference: reference.into(),
        }
    }
}

impl std::fmt::Display for NodeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.node_type, self.reference)
    }
}

/// Parses `node_type:reference`; the reference may itself contain `:`.
impl std::str::FromStr for NodeKey {
    type Err = ResonanceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (node_type, reference) =
            s.split_once(':')
                .ok_or_else(|| ResonanceError::UnknownKind {
                    kind: "node key",
                    value: s.to_string(),
                })?;
        let node_type = node_type
            .parse::<NodeType>()
            .map_err(|_| ResonanceError::UnknownKind {
                kind: "node type",
                value: node_type.to_string(),
            })?;
        if reference.is_empty() {
            return Err(ResonanceError::UnknownKind {
                kind: "node key",
                value: s.to_string(),
            });
        }
        Ok(NodeKey::new(node_type, reference))
    }
}

/// Arena index of a node. Ids are assigned in insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// One directed adjacency entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    pub target: NodeId,
    pub edge_type: EdgeType,
    pub weight: f64,
}

#[derive(Debug, Clone)]
pub struct Node {
    key: NodeKey,
    charge: f64,
    label: Option<String>,
    edges: Vec<Edge>,
}

impl Node {
    pub fn key(&self) -> &NodeKey {
        &self.key
    }

    pub fn node_type(&self) -> NodeType {
        self.key.node_type
    }

    pub fn reference(&self) -> &str {
        &self.key.reference
    }

    pub fn charge(&self) -> f64 {
        self.charge
    }

    /// Display text, falling back to the reference.
    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.key.reference)
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }
}

/// A neighbour ranked by resonance score (`charge × weight`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Neighbor {
    pub key: NodeKey,
    pub edge_type: EdgeType,
    pub weight: f64,
    pub charge: f64,
    pub resonance: f64,
}

/// Per-type slice of a [`GraphSummary`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeSummary {
    pub count: usize,
    pub avg_charge: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphSummary {
    pub owner: String,
    pub node_count: usize,
    pub by_type: BTreeMap<NodeType, TypeSummary>,
    /// Undirected edge count (adjacency entries halved).
    pub total_edges: usize,
    pub dirty_nodes: usize,
    pub dirty_edges: usize,
}

type DirtyEdge = (NodeId, NodeId, EdgeType);

/// In-memory resonance graph owned by one (user, firm) pair.
#[derive(Debug, Clone)]
pub struct ResonanceGraph {
    owner: OwnerKey,
    nodes: Vec<Node>,
    index: HashMap<NodeKey, NodeId>,
    dirty_nodes: BTreeSet<NodeId>,
    dirty_edges: BTreeSet<DirtyEdge>,
}

impl ResonanceGraph {
    pub fn new(owner: OwnerKey) -> Self {
        Self {
            owner,
            nodes: Vec::new(),
            index: HashMap::new(),
            dirty_nodes: BTreeSet::new(),
            dirty_edges: BTreeSet::new(),
        }
    }

    pub fn owner(&self) -> &OwnerKey {
        &self.owner
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Add a node. Idempotent: an existing node keeps its charge.
    pub fn add_node(
        &mut self,
        node_type: NodeType,
        reference: &str,
        initial_charge: f64,
    ) -> NodeId {
        let key = NodeKey::new(node_type, reference);
        if let Some(id) = self.index.get(&key) {
            return *id;
        }
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            key: key.clone(),
            charge: clamp_charge(initial_charge),
            label: None,
            edges: Vec::new(),
        });
        self.index.insert(key, id);
        id
    }

    /// Add an undirected edge, creating missing endpoints at the default
    /// charge. Returns `false` when an edge of the same type already joins
    /// the two nodes (or both ends are the same node).
    pub fn add_edge(
        &mut self,
        type_a: NodeType,
        ref_a: &str,
        type_b: NodeType,
        ref_b: &str,
        edge_type: EdgeType,
        weight: f64,
    ) -> bool {
        let a = self.add_node(type_a, ref_a, DEFAULT_CHARGE);
        let b = self.add_node(type_b, ref_b, DEFAULT_CHARGE);
        self.link(a, b, edge_type, weight, true)
    }

    /// Add an edge between existing nodes and mark it dirty.
    pub(crate) fn connect(
        &mut self,
        a: NodeId,
        b: NodeId,
        edge_type: EdgeType,
        weight: f64,
    ) -> bool {
        self.link(a, b, edge_type, weight, true)
    }

    /// Insert an edge read back from storage; it is not marked dirty.
    pub(crate) fn restore_edge(
        &mut self,
        a: NodeId,
        b: NodeId,
        edge_type: EdgeType,
        weight: f64,
    ) -> bool {
        self.link(a, b, edge_type, weight, false)
    }

    fn link(
        &mut self,
        a: NodeId,
        b: NodeId,
        edge_type: EdgeType,
        weight: f64,
        dirty: bool,
    ) -> bool {
        if a == b || self.has_edge(a, b, edge_type) {
            return false;
        }
        let weight = if weight.is_nan() { 0.0 } else { weight.clamp(0.0, 1.0) };
        self.nodes[a.0].edges.push(Edge {
            target: b,
            edge_type,
            weight,
        });
        self.nodes[b.0].edges.push(Edge {
            target: a,
            edge_type,
            weight,
        });
        if dirty {
            self.dirty_edges.insert((a, b, edge_type));
        }
        true
    }

    fn has_edge(&self, a: NodeId, b: NodeId, edge_type: EdgeType) -> bool {
        self.nodes[a.0]
            .edges
            .iter()
            .any(|e| e.target == b && e.edge_type == edge_type)
    }

    pub fn contains(&self, node_type: NodeType, reference: &str) -> bool {
        self.node_id(node_type, reference).is_some()
    }

    pub fn node_id(&self, node_type: NodeType, reference: &str) -> Option<NodeId> {
        // Lookup keys are owned; building one per call keeps the map simple.
        self.index.get(&NodeKey::new(node_type, reference)).copied()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    /// Charge of a node, or [`DEFAULT_CHARGE`] if it does not exist.
    pub fn get_charge(&self, node_type: NodeType, reference: &str) -> f64 {
        self.node_id(node_type, reference)
            .map(|id| self.nodes[id.0].charge)
            .unwrap_or(DEFAULT_CHARGE)
    }

    /// Add `delta` to a node's charge (clamped) and mark it dirty.
    /// Returns the new charge. Non-finite deltas leave the charge untouched.
    pub fn apply_delta(&mut self, id: NodeId, delta: f64) -> f64 {
        let node = &mut self.nodes[id.0];
        if delta.is_finite() {
            node.charge = clamp_charge(node.charge + delta);
        }
        self.dirty_nodes.insert(id);
        node.charge
    }

    /// Attach display text to an existing node.
    pub fn set_label(&mut self, node_type: NodeType, reference: &str, label: impl Into<String>) {
        if let Some(id) = self.node_id(node_type, reference) {
            let label = label.into();
            if !label.is_empty() {
                self.nodes[id.0].label = Some(label);
            }
        }
    }

    /// Nodes of one type in insertion order.
    pub fn nodes_of_type(&self, node_type: NodeType) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes
            .iter()
            .enumerate()
            .filter(move |(_, n)| n.key.node_type == node_type)
            .map(|(i, n)| (NodeId(i), n))
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    /// Nodes of a type by charge, highest first; equal charges keep
    /// insertion order.
    pub fn get_top_nodes(&self, node_type: NodeType, limit: usize) -> Vec<&Node> {
        let mut nodes: Vec<&Node> = self.nodes_of_type(node_type).map(|(_, n)| n).collect();
        nodes.sort_by(|a, b| b.charge.total_cmp(&a.charge));
        nodes.truncate(limit);
        nodes
    }

    /// Neighbours of a node ranked by resonance score, highest first.
    pub fn get_connected(&self, node_type: NodeType, reference: &str) -> Vec<Neighbor> {
        let Some(id) = self.node_id(node_type, reference) else {
            return Vec::new();
        };
        let mut neighbors: Vec<Neighbor> = self.nodes[id.0]
            .edges
            .iter()
            .map(|e| {
                let target = &self.nodes[e.target.0];
                Neighbor {
                    key: target.key.clone(),
                    edge_type: e.edge_type,
                    weight: e.weight,
                    charge: target.charge,
                    resonance: target.charge * e.weight,
                }
            })
            .collect();
        neighbors.sort_by(|a, b| b.resonance.total_cmp(&a.resonance));
        neighbors
    }

    /// Number of adjacency entries on a node.
    pub fn degree(&self, id: NodeId) -> usize {
        self.nodes[id.0].edges.len()
    }

    /// Undirected edge count.
    pub fn edge_count(&self) -> usize {
        self.nodes.iter().map(|n| n.edges.len()).sum::<usize>() / 2
    }

    pub fn get_summary(&self) -> GraphSummary {
        let mut totals: BTreeMap<NodeType, (usize, f64)> = BTreeMap::new();
        for node in &self.nodes {
            let entry = totals.entry(node.key.node_type).or_insert((0, 0.0));
            entry.0 += 1;
            entry.1 += node.charge;
        }
        let by_type = totals
            .into_iter()
            .map(|(t, (count, sum))| {
                (
                    t,
                    TypeSummary {
                        count,
                        avg_charge: sum / count as f64,
                    },
                )
            })
            .collect();

        GraphSummary {
            owner: self.owner.to_string(),
            node_count: self.nodes.len(),
            by_type,
            total_edges: self.edge_count(),
            dirty_nodes: self.dirty_nodes.len(),
            dirty_edges: self.dirty_edges.len(),
        }
    }

    // ---------------------------------------------------------------------
    // Dirty tracking
    // ---------------------------------------------------------------------

    pub fn is_dirty(&self) -> bool {
        !self.dirty_nodes.is_empty() || !self.dirty_edges.is_empty()
    }

    pub fn dirty_node_count(&self) -> usize {
        self.dirty_nodes.len()
    }

    pub fn dirty_edge_count(&self) -> usize {
        self.dirty_edges.len()
    }

    /// Current charge of every dirty node.
    pub fn dirty_charge_records(&self) -> Vec<ChargeRecord> {
        self.dirty_nodes
            .iter()
            .map(|id| {
                let node = &self.nodes[id.0];
                ChargeRecord {
                    node_type: node.key.node_type,
                    node_ref: node.key.reference.clone(),
                    charge: node.charge,
                }
            })
            .collect()
    }

    /// Every dirty edge, oriented as first inserted.
    pub fn dirty_edge_records(&self) -> Vec<EdgeRecord> {
        self.dirty_edges
            .iter()
            .map(|(a, b, edge_type)| {
                let weight = self.nodes[a.0]
                    .edges
                    .iter()
                    .find(|e| e.target == *b && e.edge_type == *edge_type)
                    .map(|e| e.weight)
                    .unwrap_or(0.0);
                let (a, b) = (&self.nodes[a.0].key, &self.nodes[b.0].key);
                EdgeRecord {
                    a_type: a.node_type,
                    a_ref: a.reference.clone(),
                    b_type: b.node_type,
                    b_ref: b.reference.clone(),
                    edge_type: *edge_type,
                    weight,
                }
            })
            .collect()
    }

    pub fn clear_dirty_nodes(&mut self) {
        self.dirty_nodes.clear();
    }

    pub fn clear_dirty_edges(&mut self) {
        self.dirty_edges.clear();
    }
}
