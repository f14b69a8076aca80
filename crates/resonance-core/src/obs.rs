//! Structured observability hooks for graph lifecycle events.
//!
//! This module provides:
//! - Owner-scoped tracing spans via the `GraphSpan` RAII guard
//! - Emission functions for propagation, events, hydration, persistence and cache lookups
//!
//! Events are emitted at `info!` level, failures at `warn!`. Filter with
//! `RUST_LOG`.

use resonance_state::{MemoryCategory, NodeType, OwnerKey};
use tracing::{info, warn};

use crate::propagation::PropagationResult;

/// RAII guard that enters an owner-scoped span for its lifetime.
///
/// ```ignore
/// let _span = GraphSpan::enter(&owner);
/// // tracing calls now carry owner = "user/firm"
/// ```
pub struct GraphSpan {
    _span: tracing::span::EnteredSpan,
}

impl GraphSpan {
    pub fn enter(owner: &OwnerKey) -> Self {
        let span = tracing::info_span!("resonance.graph", owner = %owner);
        Self {
            _span: span.entered(),
        }
    }
}

/// Emit event: one propagation finished.
pub fn emit_propagation(
    node_type: NodeType,
    reference: &str,
    result: &PropagationResult,
    reason: Option<&str>,
) {
    info!(
        event = "graph.propagated",
        node_type = %node_type,
        reference = %reference,
        nodes_affected = result.nodes_affected,
        hops = result.hops,
        total_delta = result.total_delta,
        reason = reason.unwrap_or(""),
    );
}

/// Emit event: a domain event was applied to the graph.
pub fn emit_event_processed(
    owner: &OwnerKey,
    event_type: &str,
    propagations: usize,
    direct_updates: usize,
) {
    info!(
        event = "graph.event_processed",
        owner = %owner,
        event_type = %event_type,
        propagations = propagations,
        direct_updates = direct_updates,
    );
}

/// Emit event: a hydration step failed and was skipped (warning level).
pub fn emit_hydration_step_failed(
    owner: &OwnerKey,
    step: &str,
    category: Option<MemoryCategory>,
    error: &dyn std::fmt::Display,
) {
    let category = category.map(|c| c.as_str()).unwrap_or("");
    warn!(
        event = "graph.hydration_step_failed",
        owner = %owner,
        step = %step,
        category = %category,
        error = %error,
    );
}

/// Emit event: a graph finished hydrating.
pub fn emit_graph_hydrated(
    owner: &OwnerKey,
    nodes: usize,
    edges: usize,
    failed_steps: usize,
    duration_ms: u64,
) {
    info!(
        event = "graph.hydrated",
        owner = %owner,
        nodes = nodes,
        edges = edges,
        failed_steps = failed_steps,
        duration_ms = duration_ms,
    );
}

/// Emit event: dirty state written back.
pub fn emit_persist_completed(owner: &OwnerKey, nodes_written: usize, edges_written: usize) {
    info!(
        event = "graph.persisted",
        owner = %owner,
        nodes_written = nodes_written,
        edges_written = edges_written,
    );
}

/// Emit event: a persistence write failed; dirty state kept (warning level).
pub fn emit_persist_failed(
    owner: &OwnerKey,
    what: &str,
    pending: usize,
    error: &dyn std::fmt::Display,
) {
    warn!(
        event = "graph.persist_failed",
        owner = %owner,
        what = %what,
        pending = pending,
        error = %error,
    );
}

/// Emit event: cache lookup outcome.
pub fn emit_cache_lookup(owner: &OwnerKey, hit: bool) {
    info!(event = "graph.cache_lookup", owner = %owner, hit = hit);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graph_span_create() {
        let _span = GraphSpan::enter(&OwnerKey::new("u", "f"));
    }
}
