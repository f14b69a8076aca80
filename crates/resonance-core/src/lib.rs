//! Resonance Core Library
//!
//! An in-memory graph of an agent's learned memory fragments. Domain events
//! propagate through it as bounded, decaying signals; the charged part is
//! rendered into prompt text and dirty state is written back through
//! `resonance-state`.
//!
//! Typical flow:
//! 1. [`ResonanceCache::load`] an owner's graph (hydrating on a miss)
//! 2. [`EventProcessor::process`] events against it
//! 3. [`render_for_prompt`] for prompt assembly
//! 4. [`ResonanceCache::persist`] at checkpoints

pub mod cache;
pub mod config;
pub mod error;
pub mod events;
pub mod graph;
pub mod hydrate;
pub mod metrics;
pub mod obs;
pub mod propagation;
pub mod render;
pub mod telemetry;

pub use cache::{PersistReport, ResonanceCache, SharedGraph};
pub use config::ResonanceConfig;
pub use error::{ResonanceError, Result};
pub use events::{EventOutcome, EventProcessor, ResonanceEvent};
pub use graph::{
    GraphSummary, Neighbor, Node, NodeId, NodeKey, ResonanceGraph, TypeSummary, CHARGE_MAX,
    CHARGE_MIN, DEFAULT_CHARGE, MAX_EDGES_PER_NODE, MAX_NODES,
};
pub use hydrate::{CategoryPlan, EdgeMatcher, GraphLoader, HydrationReport, SubstringMatcher};
pub use propagation::{
    propagate, propagate_with, PropagationParams, PropagationResult, DECAY, MAX_PROPAGATION_HOPS,
    THRESHOLD,
};
pub use render::{render_for_prompt, render_with, RenderOptions};

pub use resonance_state::{EdgeType, MemoryCategory, NodeType, OwnerKey};
