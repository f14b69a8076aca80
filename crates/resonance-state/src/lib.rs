//! Resonance-State: storage contracts and SurrealDB backend
//!
//! This crate provides the persistence layer for the knowledge-resonance
//! graph. It owns every byte of I/O the graph performs: reading memory
//! fragments by category and writing back charges and edges.
//!
//! ## Layer 0 - Data/Persistence
//!
//! ## Key Components
//!
//! - `MemoryRecordStore`: owner-scoped memory fragments by category
//! - `ResonanceStore`: persisted charges and edges with keyed upserts
//! - `SurrealResonanceStore`: SurrealDB implementation of both
//! - `fakes`: in-memory implementations for tests

mod error;
pub mod fakes;
pub mod handle;
pub mod kinds;
pub mod migrations;
mod schema;
pub mod storage_traits;
pub mod surreal_store;

pub use error::{StateError, StorageError};
pub use handle::CloudConfig;
pub use kinds::{EdgeType, MemoryCategory, NodeType, OwnerKey};
pub use schema::{ChargeRow, EdgeRow, FragmentRow};
pub use storage_traits::{
    ChargeRecord, EdgeRecord, FragmentQuery, MemoryFragment, MemoryRecordStore, ResonanceStore,
    StorageResult,
};
pub use surreal_store::SurrealResonanceStore;

/// Result type for connection and schema setup
pub type Result<T> = std::result::Result<T, StateError>;
