//! The index store contract (spec §4.5) — backend-independent.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use psi_core::{Field, IndexKey, RecordRef, StoreError, Timestamp};

/// One key's stored state: its posting list, the field it was created under
/// (audit only — plays no role in matching), and its lifecycle timestamps.
#[derive(Debug, Clone)]
pub struct PostingEntry {
    pub refs: HashSet<RecordRef>,
    pub field_tag: Field,
    pub created_at: Timestamp,
    pub expires_at: Timestamp,
}

/// Aggregate store health, reported by `stats()` (spec §4.5).
///
/// Unlike the teacher's `CacheStats`, hit/miss counters are not meaningful
/// for a committed index rather than a read-through cache, so this instead
/// reports the shape of the stored data.
#[derive(Debug, Clone, Default)]
pub struct StoreStats {
    pub total_keys: u64,
    pub per_tag_counts: HashMap<String, u64>,
    pub oldest: Option<Timestamp>,
    pub newest: Option<Timestamp>,
    pub expired_pending: u64,
}

/// Backend-independent contract for the index store (spec §4.5).
///
/// Both `MemoryStore` and `RelationalStore` implement this trait and MUST
/// answer identical lookups with identical sets for the same logical state
/// (P6 — bi-equivalence), proven by the shared conformance suite in
/// `tests/conformance.rs`.
#[async_trait]
pub trait IndexStore: Send + Sync {
    /// Append `r` to the posting list at `key`, creating the entry if
    /// absent. `expires_at` is widened to the later of the old and new
    /// value; `field_tag` is recorded only on first create.
    async fn add(
        &self,
        key: &IndexKey,
        r: &RecordRef,
        field_tag: Field,
        expires_at: Timestamp,
    ) -> Result<(), StoreError>;

    /// Idempotent removal of `r` from `key`'s posting list. An empty posting
    /// list is garbage-collected.
    async fn remove(&self, key: &IndexKey, r: &RecordRef) -> Result<(), StoreError>;

    /// The posting list at `key`, or the empty set if the key is absent or
    /// expired.
    async fn lookup(&self, key: &IndexKey) -> Result<HashSet<RecordRef>, StoreError>;

    /// Set intersection of the posting lists at every key in `keys`.
    ///
    /// Semantically equivalent to folding `lookup` with set intersection;
    /// the default implementation does exactly that. Backends MAY override
    /// this with a native set operation (the relational backend does, via a
    /// grouped `IN`-clause query).
    async fn intersect(&self, keys: &[IndexKey]) -> Result<HashSet<RecordRef>, StoreError> {
        let mut keys = keys.iter();
        let Some(first) = keys.next() else {
            return Ok(HashSet::new());
        };
        let mut acc = self.lookup(first).await?;
        for key in keys {
            if acc.is_empty() {
                break;
            }
            let next = self.lookup(key).await?;
            acc.retain(|r| next.contains(r));
        }
        Ok(acc)
    }

    /// Remove every entry whose `expires_at <= now`. Returns the count
    /// removed.
    async fn expire_sweep(&self, now: Timestamp) -> Result<u64, StoreError>;

    /// Aggregate statistics over the current store state.
    async fn stats(&self) -> Result<StoreStats, StoreError>;
}
