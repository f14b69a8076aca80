//! SurrealDB schema migrations and initialization
//!
//! Sets up the fragment, charge and edge tables with the composite unique
//! indexes that back keyed upserts.

use crate::Result;
use surrealdb::engine::any::Any;
use surrealdb::Surreal;
use tracing::{debug, info};

/// Initialize all resonance tables in SurrealDB
///
/// Safe to call multiple times (idempotent).
pub async fn init_schema(db: &Surreal<Any>) -> Result<()> {
    info!("Initializing resonance SurrealDB schema");

    init_memory_fragments_table(db).await?;
    init_charges_table(db).await?;
    init_edges_table(db).await?;

    info!("Resonance schema initialization complete");
    Ok(())
}

/// Initialize `memory_fragments` table
///
/// Schema:
/// ```text
/// TABLE memory_fragments {
///   user_id, firm_id:  STRING (owner)
///   category:          STRING (e.g. identity_dimensions)
///   reference:         STRING (unique within owner + category)
///   content:           STRING
///   strength:          FLOAT
///   concepts:          ARRAY<STRING>
///   active:            BOOL
///   updated_at:        DATETIME
/// }
/// ```
async fn init_memory_fragments_table(db: &Surreal<Any>) -> Result<()> {
    debug!("Initializing memory_fragments table");

    let sql = r#"
        DEFINE TABLE IF NOT EXISTS memory_fragments SCHEMALESS;

        DEFINE INDEX IF NOT EXISTS idx_fragment_key ON TABLE memory_fragments
            COLUMNS user_id, firm_id, category, reference UNIQUE;

        -- Owner + category scan for hydration
        DEFINE INDEX IF NOT EXISTS idx_fragment_owner_category ON TABLE memory_fragments
            COLUMNS user_id, firm_id, category;
    "#;

    db.query(sql).await?.check()?;
    info!("✓ memory_fragments table initialized");
    Ok(())
}

/// Initialize `resonance_charges` table
///
/// Keyed by (user_id, firm_id, node_type, node_ref).
async fn init_charges_table(db: &Surreal<Any>) -> Result<()> {
    debug!("Initializing resonance_charges table");

    let sql = r#"
        DEFINE TABLE IF NOT EXISTS resonance_charges SCHEMALESS;

        DEFINE INDEX IF NOT EXISTS idx_charge_key ON TABLE resonance_charges
            COLUMNS user_id, firm_id, node_type, node_ref UNIQUE;
    "#;

    db.query(sql).await?.check()?;
    info!("✓ resonance_charges table initialized");
    Ok(())
}

/// Initialize `resonance_edges` table
///
/// Keyed by (user_id, firm_id, a_type, a_ref, b_type, b_ref, edge_type).
async fn init_edges_table(db: &Surreal<Any>) -> Result<()> {
    debug!("Initializing resonance_edges table");

    let sql = r#"
        DEFINE TABLE IF NOT EXISTS resonance_edges SCHEMALESS;

        DEFINE INDEX IF NOT EXISTS idx_edge_key ON TABLE resonance_edges
            COLUMNS user_id, firm_id, a_type, a_ref, b_type, b_ref, edge_type UNIQUE;

        DEFINE INDEX IF NOT EXISTS idx_edge_owner ON TABLE resonance_edges
            COLUMNS user_id, firm_id;
    "#;

    db.query(sql).await?.check()?;
    info!("✓ resonance_edges table initialized");
    Ok(())
}
