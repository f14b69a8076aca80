//! Domain events and their effect on the graph.
//!
//! Each event becomes a handful of propagations (or, for feedback, direct
//! charge increments). Processing is synchronous and performs no I/O; the
//! caller persists afterwards.

use std::sync::Arc;

use resonance_state::NodeType;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::ResonanceConfig;
use crate::error::{ResonanceError, Result};
use crate::graph::{ResonanceGraph, DEFAULT_CHARGE};
use crate::hydrate::{EdgeMatcher, SubstringMatcher};
use crate::metrics::METRICS;
use crate::obs::{self, GraphSpan};
use crate::propagation::{propagate_with, PropagationParams, PropagationResult};

pub const DEFAULT_APPROVAL_BOOST: f64 = 0.10;
/// Boost per point of score, scaled from a 0..=100 score.
pub const SCORED_APPROVAL_FACTOR: f64 = 0.15;
pub const IDENTITY_SHARE: f64 = 0.5;
pub const EXEMPLAR_SHARE: f64 = 0.3;
pub const REJECTION_PENALTY: f64 = -0.10;
pub const CORRECTION_BOOST: f64 = 0.08;
pub const EDIT_SIGNAL_BOOST: f64 = 0.12;
pub const EDIT_IDENTITY_BOOST: f64 = 0.08;
pub const TASK_COMPLETE_BOOST: f64 = 0.03;
pub const POSITIVE_RATING: f64 = 4.0;

pub const EVENT_TYPES: [&str; 5] = [
    "approved",
    "rejected",
    "document_edited",
    "task_complete",
    "feedback",
];

/// One domain event. Payload fields accept snake_case and camelCase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum ResonanceEvent {
    Approved {
        #[serde(alias = "workType")]
        work_type: String,
        #[serde(default, alias = "taskId")]
        task_id: Option<String>,
        #[serde(default)]
        score: Option<f64>,
    },
    Rejected {
        #[serde(alias = "workType")]
        work_type: String,
        #[serde(default)]
        feedback: Option<String>,
    },
    DocumentEdited {
        dimension: String,
        #[serde(default, alias = "signalType")]
        signal_type: Option<String>,
    },
    TaskComplete {
        #[serde(alias = "workType")]
        work_type: String,
    },
    Feedback {
        rating: f64,
    },
}

impl ResonanceEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            ResonanceEvent::Approved { .. } => "approved",
            ResonanceEvent::Rejected { .. } => "rejected",
            ResonanceEvent::DocumentEdited { .. } => "document_edited",
            ResonanceEvent::TaskComplete { .. } => "task_complete",
            ResonanceEvent::Feedback { .. } => "feedback",
        }
    }

    /// Build an event from an untyped `(event_type, payload)` pair.
    pub fn from_parts(event_type: &str, payload: Value) -> Result<Self> {
        if !EVENT_TYPES.contains(&event_type) {
            return Err(ResonanceError::UnknownEventType(event_type.to_string()));
        }
        let invalid = |message: String| ResonanceError::InvalidPayload {
            event: event_type.to_string(),
            message,
        };
        let mut object = match payload {
            Value::Object(map) => map,
            Value::Null => serde_json::Map::new(),
            other => return Err(invalid(format!("expected an object, got {other}"))),
        };
        object.insert("event_type".into(), Value::String(event_type.to_string()));
        serde_json::from_value(Value::Object(object)).map_err(|e| invalid(e.to_string()))
    }
}

/// What one event did to the graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EventOutcome {
    pub event_type: String,
    pub propagations: Vec<PropagationResult>,
    /// Charges changed without propagation (feedback).
    pub direct_updates: usize,
}

impl EventOutcome {
    fn new(event_type: &str) -> Self {
        Self {
            event_type: event_type.to_string(),
            ..Self::default()
        }
    }

    /// Node writes across all propagations, triggers included.
    pub fn nodes_affected(&self) -> usize {
        self.propagations.iter().map(|p| p.nodes_affected).sum::<usize>() + self.direct_updates
    }
}

/// Translates events into propagations over one graph.
#[derive(Clone)]
pub struct EventProcessor {
    params: PropagationParams,
    feedback_step: f64,
    matcher: Arc<dyn EdgeMatcher>,
}

impl Default for EventProcessor {
    fn default() -> Self {
        Self::new(&ResonanceConfig::default())
    }
}

impl EventProcessor {
    pub fn new(config: &ResonanceConfig) -> Self {
        Self {
            params: PropagationParams::default(),
            feedback_step: config.feedback_step,
            matcher: Arc::new(SubstringMatcher),
        }
    }

    pub fn with_params(mut self, params: PropagationParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_matcher(mut self, matcher: Arc<dyn EdgeMatcher>) -> Self {
        self.matcher = matcher;
        self
    }

    /// Apply an untyped event. Unknown types and malformed payloads are
    /// errors; the graph is untouched in that case.
    pub fn process_raw(
        &self,
        graph: &mut ResonanceGraph,
        event_type: &str,
        payload: Value,
    ) -> Result<EventOutcome> {
        let event = ResonanceEvent::from_parts(event_type, payload)?;
        Ok(self.process(graph, &event))
    }

    pub fn process(&self, graph: &mut ResonanceGraph, event: &ResonanceEvent) -> EventOutcome {
        let _span = GraphSpan::enter(graph.owner());
        let mut outcome = EventOutcome::new(event.event_type());

        match event {
            ResonanceEvent::Approved {
                work_type, score, ..
            } => {
                let boost = match *score {
                    Some(s) if s.is_finite() => {
                        (s.clamp(0.0, 100.0) / 100.0) * SCORED_APPROVAL_FACTOR
                    }
                    _ => DEFAULT_APPROVAL_BOOST,
                };
                let reason = format!("approved:{work_type}");
                self.fire(graph, &mut outcome, NodeType::ToolChain, work_type, boost, &reason);

                let shared = boost * IDENTITY_SHARE;
                let targets = refs_where(
                    graph,
                    &[NodeType::IdentityDimension, NodeType::Principle],
                    |_| true,
                );
                for (node_type, reference) in targets {
                    self.fire(graph, &mut outcome, node_type, &reference, shared, &reason);
                }

                if !work_type.is_empty() {
                    let needle = work_type.to_lowercase();
                    let shared = boost * EXEMPLAR_SHARE;
                    let targets = refs_where(graph, &[NodeType::Exemplar, NodeType::Replay], |r| {
                        r.to_lowercase().contains(&needle)
                    });
                    for (node_type, reference) in targets {
                        self.fire(graph, &mut outcome, node_type, &reference, shared, &reason);
                    }
                }
            }
            ResonanceEvent::Rejected { work_type, .. } => {
                let reason = format!("rejected:{work_type}");
                self.fire(
                    graph,
                    &mut outcome,
                    NodeType::ToolChain,
                    work_type,
                    REJECTION_PENALTY,
                    &reason,
                );

                let targets = refs_where(
                    graph,
                    &[NodeType::Correction, NodeType::QualityRule],
                    |_| true,
                );
                for (node_type, reference) in targets {
                    self.fire(
                        graph,
                        &mut outcome,
                        node_type,
                        &reference,
                        CORRECTION_BOOST,
                        &reason,
                    );
                }
            }
            ResonanceEvent::DocumentEdited { dimension, .. } => {
                let reason = format!("edited:{dimension}");
                self.fire(
                    graph,
                    &mut outcome,
                    NodeType::EditSignal,
                    dimension,
                    EDIT_SIGNAL_BOOST,
                    &reason,
                );

                let matcher = Arc::clone(&self.matcher);
                let targets = refs_where(graph, &[NodeType::IdentityDimension], |r| {
                    matcher.related(r, dimension)
                });
                for (node_type, reference) in targets {
                    self.fire(
                        graph,
                        &mut outcome,
                        node_type,
                        &reference,
                        EDIT_IDENTITY_BOOST,
                        &reason,
                    );
                }
            }
            ResonanceEvent::TaskComplete { work_type } => {
                let reason = format!("complete:{work_type}");
                self.fire(
                    graph,
                    &mut outcome,
                    NodeType::ToolChain,
                    work_type,
                    TASK_COMPLETE_BOOST,
                    &reason,
                );
            }
            ResonanceEvent::Feedback { rating } => {
                if *rating >= POSITIVE_RATING {
                    let ids: Vec<_> = graph
                        .nodes_of_type(NodeType::IdentityDimension)
                        .filter(|(_, n)| n.charge() > DEFAULT_CHARGE)
                        .map(|(id, _)| id)
                        .collect();
                    for id in ids {
                        graph.apply_delta(id, self.feedback_step);
                        outcome.direct_updates += 1;
                    }
                }
            }
        }

        METRICS.inc_events_processed();
        obs::emit_event_processed(
            graph.owner(),
            &outcome.event_type,
            outcome.propagations.len(),
            outcome.direct_updates,
        );
        outcome
    }

    fn fire(
        &self,
        graph: &mut ResonanceGraph,
        outcome: &mut EventOutcome,
        node_type: NodeType,
        reference: &str,
        delta: f64,
        reason: &str,
    ) {
        let result = propagate_with(graph, node_type, reference, delta, Some(reason), &self.params);
        if result.is_noop() {
            return;
        }
        METRICS.record_propagation(result.nodes_affected);
        obs::emit_propagation(node_type, reference, &result, Some(reason));
        outcome.propagations.push(result);
    }
}

/// References of the given types, in insertion order, filtered by `keep`.
/// Collected up front so propagation can mutate the graph afterwards.
fn refs_where(
    graph: &ResonanceGraph,
    types: &[NodeType],
    keep: impl Fn(&str) -> bool,
) -> Vec<(NodeType, String)> {
    graph
        .nodes()
        .filter(|(_, n)| types.contains(&n.node_type()) && keep(n.reference()))
        .map(|(_, n)| (n.node_type(), n.reference().to_string()))
        .collect()
}
