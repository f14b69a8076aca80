//! In-memory fakes for storage traits (testing only)
//!
//! Provides `MemoryFragmentStore` and `MemoryResonanceStore` that satisfy the
//! trait contracts without any external dependencies. Both can be told to
//! fail so callers can exercise their degradation paths.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::StorageError;
use crate::kinds::{EdgeType, MemoryCategory, NodeType, OwnerKey};
use crate::storage_traits::*;

// ---------------------------------------------------------------------------
// MemoryFragmentStore
// ---------------------------------------------------------------------------

/// In-memory fragment store backed by `HashMap<(owner, category), Vec<fragment>>`.
#[derive(Debug, Default)]
pub struct MemoryFragmentStore {
    fragments: Mutex<HashMap<(OwnerKey, MemoryCategory), Vec<MemoryFragment>>>,
    failing: Mutex<HashSet<MemoryCategory>>,
}

impl MemoryFragmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a fragment (matched by reference).
    pub fn insert(&self, owner: &OwnerKey, category: MemoryCategory, fragment: MemoryFragment) {
        let mut fragments = self.fragments.lock().unwrap();
        let list = fragments.entry((owner.clone(), category)).or_default();
        match list.iter_mut().find(|f| f.reference == fragment.reference) {
            Some(existing) => *existing = fragment,
            None => list.push(fragment),
        }
    }

    /// Make every `list_fragments` call for `category` fail.
    pub fn fail_category(&self, category: MemoryCategory) {
        self.failing.lock().unwrap().insert(category);
    }
}

#[async_trait]
impl MemoryRecordStore for MemoryFragmentStore {
    async fn list_fragments(
        &self,
        owner: &OwnerKey,
        query: &FragmentQuery,
    ) -> StorageResult<Vec<MemoryFragment>> {
        if self.failing.lock().unwrap().contains(&query.category) {
            return Err(StorageError::Backend(format!(
                "injected failure for {}",
                query.category
            )));
        }
        let fragments = self.fragments.lock().unwrap();
        let mut matched: Vec<MemoryFragment> = fragments
            .get(&(owner.clone(), query.category))
            .map(|list| list.iter().filter(|f| query.admits(f)).cloned().collect())
            .unwrap_or_default();
        // Stable sort keeps insertion order among equal strengths.
        matched.sort_by(|a, b| b.strength.total_cmp(&a.strength));
        matched.truncate(query.limit);
        Ok(matched)
    }
}

// ---------------------------------------------------------------------------
// MemoryResonanceStore
// ---------------------------------------------------------------------------

type ChargeKey = (OwnerKey, NodeType, String);
type EdgeKey = (OwnerKey, NodeType, String, NodeType, String, EdgeType);

/// In-memory charge/edge store with keyed upserts.
///
/// Rows are returned in first-write order so hydration is deterministic.
#[derive(Debug, Default)]
pub struct MemoryResonanceStore {
    charges: Mutex<Vec<(ChargeKey, f64)>>,
    edges: Mutex<Vec<(EdgeKey, f64)>>,
    fail_reads: AtomicBool,
    fail_charge_writes: AtomicBool,
    fail_edge_writes: AtomicBool,
    charge_writes: AtomicUsize,
    edge_writes: AtomicUsize,
}

impl MemoryResonanceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Fail both charge and edge upserts.
    pub fn set_fail_writes(&self, fail: bool) {
        self.set_fail_charge_writes(fail);
        self.set_fail_edge_writes(fail);
    }

    pub fn set_fail_charge_writes(&self, fail: bool) {
        self.fail_charge_writes.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_edge_writes(&self, fail: bool) {
        self.fail_edge_writes.store(fail, Ordering::SeqCst);
    }

    /// Total charge rows written across all upserts.
    pub fn charge_writes(&self) -> usize {
        self.charge_writes.load(Ordering::SeqCst)
    }

    /// Total edge rows written across all upserts.
    pub fn edge_writes(&self) -> usize {
        self.edge_writes.load(Ordering::SeqCst)
    }

    /// Number of distinct charge rows held for `owner`.
    pub fn charge_count(&self, owner: &OwnerKey) -> usize {
        let charges = self.charges.lock().unwrap();
        charges.iter().filter(|(k, _)| &k.0 == owner).count()
    }

    /// Number of distinct edge rows held for `owner`.
    pub fn edge_count(&self, owner: &OwnerKey) -> usize {
        let edges = self.edges.lock().unwrap();
        edges.iter().filter(|(k, _)| &k.0 == owner).count()
    }

    fn check(&self, flag: &AtomicBool, op: &str) -> StorageResult<()> {
        if flag.load(Ordering::SeqCst) {
            return Err(StorageError::Backend(format!("injected {op} failure")));
        }
        Ok(())
    }
}

#[async_trait]
impl ResonanceStore for MemoryResonanceStore {
    async fn load_charges(&self, owner: &OwnerKey) -> StorageResult<Vec<ChargeRecord>> {
        self.check(&self.fail_reads, "read")?;
        let charges = self.charges.lock().unwrap();
        Ok(charges
            .iter()
            .filter(|(k, _)| &k.0 == owner)
            .map(|((_, node_type, node_ref), charge)| ChargeRecord {
                node_type: *node_type,
                node_ref: node_ref.clone(),
                charge: *charge,
            })
            .collect())
    }

    async fn load_edges(&self, owner: &OwnerKey) -> StorageResult<Vec<EdgeRecord>> {
        self.check(&self.fail_reads, "read")?;
        let edges = self.edges.lock().unwrap();
        Ok(edges
            .iter()
            .filter(|(k, _)| &k.0 == owner)
            .map(|((_, a_type, a_ref, b_type, b_ref, edge_type), weight)| EdgeRecord {
                a_type: *a_type,
                a_ref: a_ref.clone(),
                b_type: *b_type,
                b_ref: b_ref.clone(),
                edge_type: *edge_type,
                weight: *weight,
            })
            .collect())
    }

    async fn upsert_charges(&self, owner: &OwnerKey, rows: &[ChargeRecord]) -> StorageResult<()> {
        self.check(&self.fail_charge_writes, "charge write")?;
        let mut charges = self.charges.lock().unwrap();
        for row in rows {
            let key = (owner.clone(), row.node_type, row.node_ref.clone());
            match charges.iter_mut().find(|(k, _)| *k == key) {
                Some((_, charge)) => *charge = row.charge,
                None => charges.push((key, row.charge)),
            }
        }
        self.charge_writes.fetch_add(rows.len(), Ordering::SeqCst);
        Ok(())
    }

    async fn upsert_edges(&self, owner: &OwnerKey, rows: &[EdgeRecord]) -> StorageResult<()> {
        self.check(&self.fail_edge_writes, "edge write")?;
        let mut edges = self.edges.lock().unwrap();
        for row in rows {
            let key = (
                owner.clone(),
                row.a_type,
                row.a_ref.clone(),
                row.b_type,
                row.b_ref.clone(),
                row.edge_type,
            );
            match edges.iter_mut().find(|(k, _)| *k == key) {
                Some((_, weight)) => *weight = row.weight,
                None => edges.push((key, row.weight)),
            }
        }
        self.edge_writes.fetch_add(rows.len(), Ordering::SeqCst);
        Ok(())
    }
}
