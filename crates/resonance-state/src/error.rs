//! Error types for resonance-state

use thiserror::Error;

/// Errors raised while connecting to or preparing the SurrealDB backend
#[derive(Error, Debug)]
pub enum StateError {
    /// Database connection error
    #[error("Database connection failed: {0}")]
    Connection(String),

    /// Database query error
    #[error("Database query failed: {0}")]
    Query(String),

    /// Schema setup error
    #[error("Schema setup failed: {0}")]
    SchemaSetup(String),
}

impl From<surrealdb::Error> for StateError {
    fn from(err: surrealdb::Error) -> Self {
        StateError::Query(err.to_string())
    }
}

/// Errors surfaced through the storage traits
#[derive(Error, Debug)]
pub enum StorageError {
    /// The backing store rejected or failed the operation
    #[error("storage backend error: {0}")]
    Backend(String),

    /// A row could not be encoded or decoded
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// A persisted kind column held a name outside the closed enumeration
    #[error("invalid {kind}: {value}")]
    InvalidKind { kind: &'static str, value: String },
}

impl From<surrealdb::Error> for StorageError {
    fn from(err: surrealdb::Error) -> Self {
        StorageError::Backend(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}
