//! Integration tests for SurrealDB schema initialization
//!
//! Migrations must be idempotent: every connection path runs them, so a
//! second run against the same database has to succeed.

use resonance_state::{migrations, ChargeRecord, ChargeRow, NodeType, OwnerKey};

#[tokio::test]
async fn test_init_schema_is_idempotent() {
    let db = resonance_state::handle::connect_in_memory().await.unwrap();
    migrations::init_schema(&db).await.unwrap();
    migrations::init_schema(&db).await.unwrap();
}

#[test]
fn test_charge_row_serialization() {
    let row = ChargeRow::new(
        &OwnerKey::new("u", "f"),
        &ChargeRecord {
            node_type: NodeType::EditSignal,
            node_ref: "tone".into(),
            charge: 0.55,
        },
    );

    let json = serde_json::to_string(&row).expect("Failed to serialize");
    assert!(json.contains("\"node_type\":\"edit_signal\""));
    assert!(json.contains("\"node_ref\":\"tone\""));
    assert!(json.contains("\"charge\":0.55"));
}
