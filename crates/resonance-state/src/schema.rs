//! Schema definitions for resonance SurrealDB tables
//!
//! Tables:
//! - memory_fragments: memory records by owner and category
//! - resonance_charges: persisted node charges
//! - resonance_edges: persisted graph edges
//!
//! Kind columns are stored as their snake_case names and parsed back at the
//! storage boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::kinds::{MemoryCategory, OwnerKey};
use crate::storage_traits::{ChargeRecord, EdgeRecord, MemoryFragment, StorageResult};

/// Module for serializing chrono DateTime to SurrealDB datetime format
mod surreal_datetime {
    use chrono::{DateTime, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};
    use surrealdb::sql::Datetime as SurrealDatetime;

    pub fn serialize<S>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let sd = SurrealDatetime::from(*date);
        serde::Serialize::serialize(&sd, serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let sd = SurrealDatetime::deserialize(deserializer)?;
        Ok(DateTime::from(sd))
    }
}

/// Memory fragment row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FragmentRow {
    /// SurrealDB record ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<surrealdb::sql::Thing>,
    pub user_id: String,
    pub firm_id: String,
    /// Category name, e.g. "identity_dimensions"
    pub category: String,
    pub reference: String,
    pub content: String,
    pub strength: f64,
    pub concepts: Vec<String>,
    pub active: bool,
    #[serde(with = "surreal_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl FragmentRow {
    pub fn new(owner: &OwnerKey, category: MemoryCategory, fragment: MemoryFragment) -> Self {
        FragmentRow {
            id: None,
            user_id: owner.user_id.clone(),
            firm_id: owner.firm_id.clone(),
            category: category.to_string(),
            reference: fragment.reference,
            content: fragment.content,
            strength: fragment.strength,
            concepts: fragment.concepts,
            active: fragment.active,
            updated_at: Utc::now(),
        }
    }

    pub fn into_fragment(self) -> MemoryFragment {
        MemoryFragment {
            reference: self.reference,
            content: self.content,
            strength: self.strength,
            concepts: self.concepts,
            active: self.active,
        }
    }
}

/// Persisted node charge row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChargeRow {
    /// SurrealDB record ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<surrealdb::sql::Thing>,
    pub user_id: String,
    pub firm_id: String,
    pub node_type: String,
    pub node_ref: String,
    pub charge: f64,
    #[serde(with = "surreal_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl ChargeRow {
    pub fn new(owner: &OwnerKey, record: &ChargeRecord) -> Self {
        ChargeRow {
            id: None,
            user_id: owner.user_id.clone(),
            firm_id: owner.firm_id.clone(),
            node_type: record.node_type.to_string(),
            node_ref: record.node_ref.clone(),
            charge: record.charge,
            updated_at: Utc::now(),
        }
    }

    pub fn into_record(self) -> StorageResult<ChargeRecord> {
        Ok(ChargeRecord {
            node_type: self.node_type.parse()?,
            node_ref: self.node_ref,
            charge: self.charge,
        })
    }
}

/// Persisted edge row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeRow {
    /// SurrealDB record ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<surrealdb::sql::Thing>,
    pub user_id: String,
    pub firm_id: String,
    pub a_type: String,
    pub a_ref: String,
    pub b_type: String,
    pub b_ref: String,
    pub edge_type: String,
    pub weight: f64,
    #[serde(with = "surreal_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl EdgeRow {
    pub fn new(owner: &OwnerKey, record: &EdgeRecord) -> Self {
        EdgeRow {
            id: None,
            user_id: owner.user_id.clone(),
            firm_id: owner.firm_id.clone(),
            a_type: record.a_type.to_string(),
            a_ref: record.a_ref.clone(),
            b_type: record.b_type.to_string(),
            b_ref: record.b_ref.clone(),
            edge_type: record.edge_type.to_string(),
            weight: record.weight,
            updated_at: Utc::now(),
        }
    }

    pub fn into_record(self) -> Result<EdgeRecord, StorageError> {
        Ok(EdgeRecord {
            a_type: self.a_type.parse()?,
            a_ref: self.a_ref,
            b_type: self.b_type.parse()?,
            b_ref: self.b_ref,
            edge_type: self.edge_type.parse()?,
            weight: self.weight,
        })
    }
}
