//! Closed enumerations shared by the graph and its persistence layer.
//!
//! Every persisted row names its node and edge kinds by the snake_case
//! strings produced here, so `Display`, `FromStr` and serde must agree.

use serde::{Deserialize, Serialize};

use crate::error::StorageError;

/// Kind of memory fragment a graph node stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    IdentityDimension,
    Exemplar,
    Correction,
    Replay,
    Association,
    EditSignal,
    QualityRule,
    ToolChain,
    MatterMemory,
    CognitiveSignatureDimension,
    Learning,
    Principle,
}

impl NodeType {
    pub const ALL: [NodeType; 12] = [
        NodeType::IdentityDimension,
        NodeType::Exemplar,
        NodeType::Correction,
        NodeType::Replay,
        NodeType::Association,
        NodeType::EditSignal,
        NodeType::QualityRule,
        NodeType::ToolChain,
        NodeType::MatterMemory,
        NodeType::CognitiveSignatureDimension,
        NodeType::Learning,
        NodeType::Principle,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::IdentityDimension => "identity_dimension",
            NodeType::Exemplar => "exemplar",
            NodeType::Correction => "correction",
            NodeType::Replay => "replay",
            NodeType::Association => "association",
            NodeType::EditSignal => "edit_signal",
            NodeType::QualityRule => "quality_rule",
            NodeType::ToolChain => "tool_chain",
            NodeType::MatterMemory => "matter_memory",
            NodeType::CognitiveSignatureDimension => "cognitive_signature_dimension",
            NodeType::Learning => "learning",
            NodeType::Principle => "principle",
        }
    }
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for NodeType {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NodeType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| StorageError::InvalidKind {
                kind: "node type",
                value: s.to_string(),
            })
    }
}

/// Relationship carried by a graph edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeType {
    Reinforces,
    Contradicts,
    SameDimension,
    CoOccurred,
    DerivedFrom,
}

impl EdgeType {
    /// Whether a signal crossing this edge flips sign.
    pub fn is_inhibitory(&self) -> bool {
        matches!(self, EdgeType::Contradicts)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeType::Reinforces => "reinforces",
            EdgeType::Contradicts => "contradicts",
            EdgeType::SameDimension => "same_dimension",
            EdgeType::CoOccurred => "co_occurred",
            EdgeType::DerivedFrom => "derived_from",
        }
    }
}

impl std::fmt::Display for EdgeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EdgeType {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reinforces" => Ok(EdgeType::Reinforces),
            "contradicts" => Ok(EdgeType::Contradicts),
            "same_dimension" => Ok(EdgeType::SameDimension),
            "co_occurred" => Ok(EdgeType::CoOccurred),
            "derived_from" => Ok(EdgeType::DerivedFrom),
            _ => Err(StorageError::InvalidKind {
                kind: "edge type",
                value: s.to_string(),
            }),
        }
    }
}

/// Memory record categories read during hydration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryCategory {
    IdentityDimensions,
    Exemplars,
    Corrections,
    Associations,
    EditSignals,
    QualityRules,
    Principles,
    ToolChains,
}

impl MemoryCategory {
    /// The node type records of this category hydrate into.
    pub fn node_type(&self) -> NodeType {
        match self {
            MemoryCategory::IdentityDimensions => NodeType::IdentityDimension,
            MemoryCategory::Exemplars => NodeType::Exemplar,
            MemoryCategory::Corrections => NodeType::Correction,
            MemoryCategory::Associations => NodeType::Association,
            MemoryCategory::EditSignals => NodeType::EditSignal,
            MemoryCategory::QualityRules => NodeType::QualityRule,
            MemoryCategory::Principles => NodeType::Principle,
            MemoryCategory::ToolChains => NodeType::ToolChain,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryCategory::IdentityDimensions => "identity_dimensions",
            MemoryCategory::Exemplars => "exemplars",
            MemoryCategory::Corrections => "corrections",
            MemoryCategory::Associations => "associations",
            MemoryCategory::EditSignals => "edit_signals",
            MemoryCategory::QualityRules => "quality_rules",
            MemoryCategory::Principles => "principles",
            MemoryCategory::ToolChains => "tool_chains",
        }
    }
}

impl std::fmt::Display for MemoryCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MemoryCategory {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "identity_dimensions" => Ok(MemoryCategory::IdentityDimensions),
            "exemplars" => Ok(MemoryCategory::Exemplars),
            "corrections" => Ok(MemoryCategory::Corrections),
            "associations" => Ok(MemoryCategory::Associations),
            "edit_signals" => Ok(MemoryCategory::EditSignals),
            "quality_rules" => Ok(MemoryCategory::QualityRules),
            "principles" => Ok(MemoryCategory::Principles),
            "tool_chains" => Ok(MemoryCategory::ToolChains),
            _ => Err(StorageError::InvalidKind {
                kind: "memory category",
                value: s.to_string(),
            }),
        }
    }
}

/// The (user, firm) pair that exclusively owns one graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OwnerKey {
    pub user_id: String,
    pub firm_id: String,
}

impl OwnerKey {
    pub fn new(user_id: impl Into<String>, firm_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            firm_id: firm_id.into(),
        }
    }
}

impl std::fmt::Display for OwnerKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.user_id, self.firm_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_type_names_parse_back() {
        for t in NodeType::ALL {
            assert_eq!(t.as_str().parse::<NodeType>().unwrap(), t);
        }
        assert!("nonsense".parse::<NodeType>().is_err());
    }

    #[test]
    fn serde_names_match_display() {
        let json = serde_json::to_string(&NodeType::CognitiveSignatureDimension).unwrap();
        assert_eq!(json, "\"cognitive_signature_dimension\"");
        let json = serde_json::to_string(&EdgeType::SameDimension).unwrap();
        assert_eq!(json, "\"same_dimension\"");
    }

    #[test]
    fn only_contradicts_is_inhibitory() {
        assert!(EdgeType::Contradicts.is_inhibitory());
        assert!(!EdgeType::Reinforces.is_inhibitory());
        assert!(!EdgeType::CoOccurred.is_inhibitory());
    }

    #[test]
    fn categories_map_to_node_types() {
        assert_eq!(
            MemoryCategory::EditSignals.node_type(),
            NodeType::EditSignal
        );
        assert_eq!(
            "tool_chains".parse::<MemoryCategory>().unwrap(),
            MemoryCategory::ToolChains
        );
    }

    #[test]
    fn owner_display() {
        assert_eq!(OwnerKey::new("u1", "f9").to_string(), "u1/f9");
    }
}
