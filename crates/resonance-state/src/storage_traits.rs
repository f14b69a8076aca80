//! Storage trait definitions for the resonance graph
//!
//! These traits define the two storage seams the graph depends on:
//! - `MemoryRecordStore`: owner-scoped source of truth for memory fragments
//! - `ResonanceStore`: persisted charges and edges (keyed upserts)
//!
//! All traits are async and backend-agnostic. In-memory fakes are provided
//! for testing via the `fakes` module.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::kinds::{EdgeType, MemoryCategory, NodeType, OwnerKey};

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

// ---------------------------------------------------------------------------
// MemoryRecordStore: memory fragments by category
// ---------------------------------------------------------------------------

/// Read model of one memory record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryFragment {
    /// Opaque key, unique within (owner, category)
    pub reference: String,
    /// Human-readable text of the fragment
    #[serde(default)]
    pub content: String,
    /// Confidence or strength in [0, 1]
    pub strength: f64,
    /// Concepts the fragment touches (associations use these for wiring)
    #[serde(default)]
    pub concepts: Vec<String>,
    /// Inactive records (e.g. retired quality rules) are kept but skipped
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl MemoryFragment {
    pub fn new(reference: impl Into<String>, strength: f64) -> Self {
        Self {
            reference: reference.into(),
            content: String::new(),
            strength,
            concepts: Vec::new(),
            active: true,
        }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn with_concepts<I, S>(mut self, concepts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.concepts = concepts.into_iter().map(Into::into).collect();
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }
}

/// One per-category fragment request.
#[derive(Debug, Clone, PartialEq)]
pub struct FragmentQuery {
    pub category: MemoryCategory,
    /// Only fragments with `strength > min_strength`
    pub min_strength: Option<f64>,
    /// Skip fragments with `active == false`
    pub active_only: bool,
    pub limit: usize,
}

impl FragmentQuery {
    pub fn new(category: MemoryCategory, limit: usize) -> Self {
        Self {
            category,
            min_strength: None,
            active_only: false,
            limit,
        }
    }

    pub fn with_min_strength(mut self, floor: f64) -> Self {
        self.min_strength = Some(floor);
        self
    }

    pub fn active_only(mut self) -> Self {
        self.active_only = true;
        self
    }

    /// Whether a fragment passes the strength and activity filters.
    pub fn admits(&self, fragment: &MemoryFragment) -> bool {
        if self.active_only && !fragment.active {
            return false;
        }
        match self.min_strength {
            Some(floor) => fragment.strength > floor,
            None => true,
        }
    }
}

/// Owner-scoped source of truth for memory fragments.
///
/// Guarantees:
/// - Results contain only fragments of `query.category` for `owner`.
/// - Results are ordered by strength descending and truncated to `query.limit`.
#[async_trait]
pub trait MemoryRecordStore: Send + Sync {
    async fn list_fragments(
        &self,
        owner: &OwnerKey,
        query: &FragmentQuery,
    ) -> StorageResult<Vec<MemoryFragment>>;
}

// ---------------------------------------------------------------------------
// ResonanceStore: persisted charges and edges
// ---------------------------------------------------------------------------

/// Persisted charge of one node, keyed by (owner, node_type, node_ref).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChargeRecord {
    pub node_type: NodeType,
    pub node_ref: String,
    pub charge: f64,
}

/// Persisted edge, keyed by (owner, a_type, a_ref, b_type, b_ref, edge_type).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub a_type: NodeType,
    pub a_ref: String,
    pub b_type: NodeType,
    pub b_ref: String,
    pub edge_type: EdgeType,
    pub weight: f64,
}

/// Persisted graph state.
///
/// Guarantees:
/// - `upsert_*` is idempotent: writing the same key twice leaves one row
///   holding the last value.
/// - `load_*` returns only rows written for `owner`.
#[async_trait]
pub trait ResonanceStore: Send + Sync {
    async fn load_charges(&self, owner: &OwnerKey) -> StorageResult<Vec<ChargeRecord>>;

    async fn load_edges(&self, owner: &OwnerKey) -> StorageResult<Vec<EdgeRecord>>;

    async fn upsert_charges(&self, owner: &OwnerKey, rows: &[ChargeRecord]) -> StorageResult<()>;

    async fn upsert_edges(&self, owner: &OwnerKey, rows: &[EdgeRecord]) -> StorageResult<()>;
}
