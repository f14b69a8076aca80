//! SurrealDB-backed `MemoryRecordStore` and `ResonanceStore`
//!
//! Uses `schema::{FragmentRow, ChargeRow, EdgeRow}` for persistence,
//! converting to/from `storage_traits` types at the boundary. Upserts update
//! by key first and create the row only when nothing matched.

use async_trait::async_trait;
use surrealdb::engine::any::Any;
use surrealdb::sql::Datetime as SurrealDatetime;
use surrealdb::Surreal;
use tracing::{debug, instrument};

use crate::handle;
use crate::kinds::{MemoryCategory, OwnerKey};
use crate::schema::{ChargeRow, EdgeRow, FragmentRow};
use crate::storage_traits::{
    ChargeRecord, EdgeRecord, FragmentQuery, MemoryFragment, MemoryRecordStore, ResonanceStore,
    StorageResult,
};

/// SurrealDB-backed implementation of both storage traits.
#[derive(Clone)]
pub struct SurrealResonanceStore {
    db: Surreal<Any>,
}

impl SurrealResonanceStore {
    /// Wrap an already-initialized connection.
    pub fn new(db: Surreal<Any>) -> Self {
        Self { db }
    }

    /// Create an in-memory instance for testing.
    pub async fn in_memory() -> crate::Result<Self> {
        Ok(Self::new(handle::connect_in_memory().await?))
    }

    /// Create from environment variables (see [`handle::connect_from_env`]).
    pub async fn from_env() -> crate::Result<Self> {
        Ok(Self::new(handle::connect_from_env().await?))
    }

    /// Insert or replace one memory fragment.
    #[instrument(skip(self, fragment), fields(owner = %owner, category = %category, reference = %fragment.reference))]
    pub async fn put_fragment(
        &self,
        owner: &OwnerKey,
        category: MemoryCategory,
        fragment: MemoryFragment,
    ) -> StorageResult<()> {
        let row = FragmentRow::new(owner, category, fragment);

        let mut res = self
            .db
            .query(
                "UPDATE memory_fragments SET content = $content, strength = $strength, \
                 concepts = $concepts, active = $active, updated_at = $now \
                 WHERE user_id = $user AND firm_id = $firm AND category = $category \
                 AND reference = $reference",
            )
            .bind(("content", row.content.clone()))
            .bind(("strength", row.strength))
            .bind(("concepts", row.concepts.clone()))
            .bind(("active", row.active))
            .bind(("now", SurrealDatetime::from(row.updated_at)))
            .bind(("user", row.user_id.clone()))
            .bind(("firm", row.firm_id.clone()))
            .bind(("category", row.category.clone()))
            .bind(("reference", row.reference.clone()))
            .await?;
        let updated: Vec<FragmentRow> = res.take(0)?;

        if updated.is_empty() {
            debug!("creating fragment row");
            let _created: Option<FragmentRow> =
                self.db.create("memory_fragments").content(row).await?;
        }
        Ok(())
    }

    async fn upsert_charge(&self, row: ChargeRow) -> StorageResult<()> {
        let mut res = self
            .db
            .query(
                "UPDATE resonance_charges SET charge = $charge, updated_at = $now \
                 WHERE user_id = $user AND firm_id = $firm \
                 AND node_type = $node_type AND node_ref = $node_ref",
            )
            .bind(("charge", row.charge))
            .bind(("now", SurrealDatetime::from(row.updated_at)))
            .bind(("user", row.user_id.clone()))
            .bind(("firm", row.firm_id.clone()))
            .bind(("node_type", row.node_type.clone()))
            .bind(("node_ref", row.node_ref.clone()))
            .await?;
        let updated: Vec<ChargeRow> = res.take(0)?;

        if updated.is_empty() {
            let _created: Option<ChargeRow> =
                self.db.create("resonance_charges").content(row).await?;
        }
        Ok(())
    }

    async fn upsert_edge(&self, row: EdgeRow) -> StorageResult<()> {
        let mut res = self
            .db
            .query(
                "UPDATE resonance_edges SET weight = $weight, updated_at = $now \
                 WHERE user_id = $user AND firm_id = $firm \
                 AND a_type = $a_type AND a_ref = $a_ref \
                 AND b_type = $b_type AND b_ref = $b_ref \
                 AND edge_type = $edge_type",
            )
            .bind(("weight", row.weight))
            .bind(("now", SurrealDatetime::from(row.updated_at)))
            .bind(("user", row.user_id.clone()))
            .bind(("firm", row.firm_id.clone()))
            .bind(("a_type", row.a_type.clone()))
            .bind(("a_ref", row.a_ref.clone()))
            .bind(("b_type", row.b_type.clone()))
            .bind(("b_ref", row.b_ref.clone()))
            .bind(("edge_type", row.edge_type.clone()))
            .await?;
        let updated: Vec<EdgeRow> = res.take(0)?;

        if updated.is_empty() {
            let _created: Option<EdgeRow> = self.db.create("resonance_edges").content(row).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl MemoryRecordStore for SurrealResonanceStore {
    #[instrument(skip(self, query), fields(owner = %owner, category = %query.category))]
    async fn list_fragments(
        &self,
        owner: &OwnerKey,
        query: &FragmentQuery,
    ) -> StorageResult<Vec<MemoryFragment>> {
        let mut res = self
            .db
            .query(
                "SELECT * FROM memory_fragments \
                 WHERE user_id = $user AND firm_id = $firm AND category = $category \
                 ORDER BY strength DESC",
            )
            .bind(("user", owner.user_id.clone()))
            .bind(("firm", owner.firm_id.clone()))
            .bind(("category", query.category.to_string()))
            .await?;
        let rows: Vec<FragmentRow> = res.take(0)?;

        // Filtering and the limit run here so the contract does not depend
        // on SurrealQL numeric comparison semantics.
        Ok(rows
            .into_iter()
            .map(FragmentRow::into_fragment)
            .filter(|f| query.admits(f))
            .take(query.limit)
            .collect())
    }
}

#[async_trait]
impl ResonanceStore for SurrealResonanceStore {
    #[instrument(skip(self), fields(owner = %owner))]
    async fn load_charges(&self, owner: &OwnerKey) -> StorageResult<Vec<ChargeRecord>> {
        let mut res = self
            .db
            .query("SELECT * FROM resonance_charges WHERE user_id = $user AND firm_id = $firm")
            .bind(("user", owner.user_id.clone()))
            .bind(("firm", owner.firm_id.clone()))
            .await?;
        let rows: Vec<ChargeRow> = res.take(0)?;
        rows.into_iter().map(ChargeRow::into_record).collect()
    }

    #[instrument(skip(self), fields(owner = %owner))]
    async fn load_edges(&self, owner: &OwnerKey) -> StorageResult<Vec<EdgeRecord>> {
        let mut res = self
            .db
            .query("SELECT * FROM resonance_edges WHERE user_id = $user AND firm_id = $firm")
            .bind(("user", owner.user_id.clone()))
            .bind(("firm", owner.firm_id.clone()))
            .await?;
        let rows: Vec<EdgeRow> = res.take(0)?;
        rows.into_iter().map(EdgeRow::into_record).collect()
    }

    #[instrument(skip(self, rows), fields(owner = %owner, rows = rows.len()))]
    async fn upsert_charges(&self, owner: &OwnerKey, rows: &[ChargeRecord]) -> StorageResult<()> {
        for record in rows {
            self.upsert_charge(ChargeRow::new(owner, record)).await?;
        }
        debug!("charges upserted");
        Ok(())
    }

    #[instrument(skip(self, rows), fields(owner = %owner, rows = rows.len()))]
    async fn upsert_edges(&self, owner: &OwnerKey, rows: &[EdgeRecord]) -> StorageResult<()> {
        for record in rows {
            self.upsert_edge(EdgeRow::new(owner, record)).await?;
        }
        debug!("edges upserted");
        Ok(())
    }
}

