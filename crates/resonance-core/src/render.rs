//! Project the charged part of a graph into bounded prompt text.
//!
//! Selection is greedy: groups are emitted in a fixed priority order, nodes
//! within a group by charge, and output stops at the first line that would
//! overflow the budget.

use resonance_state::NodeType;

use crate::config::{DEFAULT_RENDER_FLOOR, DEFAULT_RENDER_MAX_CHARS};
use crate::graph::{Node, ResonanceGraph};

/// Rendered groups, highest priority first.
pub const RENDER_GROUPS: [(&str, &[NodeType]); 3] = [
    (
        "Learned Principles",
        &[NodeType::Correction, NodeType::EditSignal],
    ),
    ("Reasoning Patterns", &[NodeType::Association]),
    ("Quality Gates", &[NodeType::QualityRule]),
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderOptions {
    /// Nodes at or below this charge are left out.
    pub floor: f64,
    /// Budget in characters, not bytes.
    pub max_chars: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            floor: DEFAULT_RENDER_FLOOR,
            max_chars: DEFAULT_RENDER_MAX_CHARS,
        }
    }
}

/// Render with the default floor. The result never exceeds `max_chars`.
pub fn render_for_prompt(graph: &ResonanceGraph, max_chars: usize) -> String {
    render_with(
        graph,
        &RenderOptions {
            max_chars,
            ..RenderOptions::default()
        },
    )
}

pub fn render_with(graph: &ResonanceGraph, options: &RenderOptions) -> String {
    let mut out = String::new();
    let mut used = 0usize;

    for (title, types) in RENDER_GROUPS {
        let mut nodes: Vec<&Node> = graph
            .nodes()
            .map(|(_, n)| n)
            .filter(|n| types.contains(&n.node_type()) && n.charge() > options.floor)
            .collect();
        nodes.sort_by(|a, b| b.charge().total_cmp(&a.charge()));

        let mut header = Some(if out.is_empty() {
            format!("## {title}\n")
        } else {
            format!("\n## {title}\n")
        });
        for node in nodes {
            let line = format!("- {} (charge {:.2})\n", node.label(), node.charge());
            let mut cost = line.chars().count();
            if let Some(h) = &header {
                cost += h.chars().count();
            }
            if used + cost > options.max_chars {
                return out;
            }
            if let Some(h) = header.take() {
                out.push_str(&h);
            }
            out.push_str(&line);
            used += cost;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use resonance_state::OwnerKey;

    fn sample() -> ResonanceGraph {
        let mut g = ResonanceGraph::new(OwnerKey::new("u", "f"));
        g.add_node(NodeType::QualityRule, "define-terms", 0.8);
        g.add_node(NodeType::Association, "laches", 0.6);
        g.add_node(NodeType::Correction, "pinpoint", 0.5);
        g.add_node(NodeType::EditSignal, "tone", 0.9);
        g.add_node(NodeType::Correction, "faint", 0.3);
        g.add_node(NodeType::Principle, "stated-principle", 0.9);
        g.add_node(NodeType::IdentityDimension, "not-rendered", 1.0);
        g.set_label(NodeType::Correction, "pinpoint", "Cite pinpoint pages");
        g
    }

    #[test]
    fn groups_in_priority_order() {
        let text = render_for_prompt(&sample(), 10_000);
        let expected = "## Learned Principles\n\
                        - tone (charge 0.90)\n\
                        - Cite pinpoint pages (charge 0.50)\n\
                        \n## Reasoning Patterns\n\
                        - laches (charge 0.60)\n\
                        \n## Quality Gates\n\
                        - define-terms (charge 0.80)\n";
        assert_eq!(text, expected);
    }

    #[test]
    fn floor_is_exclusive() {
        let text = render_for_prompt(&sample(), 10_000);
        assert!(!text.contains("faint"));
        assert!(!text.contains("not-rendered"));
    }

    #[test]
    fn only_correction_and_edit_signal_learnings_are_principles() {
        let text = render_for_prompt(&sample(), 10_000);
        assert!(!text.contains("stated-principle"));
    }

    #[test]
    fn stops_at_first_overflow() {
        let full = render_for_prompt(&sample(), 10_000);
        let budget = "## Learned Principles\n- tone (charge 0.90)\n".len() + 5;
        let text = render_for_prompt(&sample(), budget);
        assert_eq!(text, "## Learned Principles\n- tone (charge 0.90)\n");
        assert!(full.starts_with(&text));
    }

    #[test]
    fn never_exceeds_budget() {
        let g = sample();
        for budget in 0..200 {
            assert!(render_for_prompt(&g, budget).chars().count() <= budget);
        }
    }

    #[test]
    fn empty_graph_renders_nothing() {
        let g = ResonanceGraph::new(OwnerKey::new("u", "f"));
        assert!(render_for_prompt(&g, 100).is_empty());
    }

    #[test]
    fn budget_counts_characters() {
        let mut g = ResonanceGraph::new(OwnerKey::new("u", "f"));
        g.add_node(NodeType::Correction, "p", 0.9);
        g.set_label(NodeType::Correction, "p", "Prüfung über Gründlichkeit");
        let text = render_with(
            &g,
            &RenderOptions {
                floor: 0.3,
                max_chars: 80,
            },
        );
        assert!(text.contains("Prüfung"));
        assert!(text.chars().count() <= 80);
    }
}
