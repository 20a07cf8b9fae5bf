//! In-memory index store (spec §4.5a): a `dashmap` keyed on the rendered
//! index key, giving per-key sharded locking — the natural Rust analogue of
//! the teacher's per-key LMDB locking in `caliber-storage::cache`.

use std::collections::HashSet;

use async_trait::async_trait;
use dashmap::DashMap;
use psi_core::{Field, IndexKey, RecordRef, StoreError, Timestamp};

use crate::traits::{IndexStore, PostingEntry, StoreStats};

/// Whole index held in RAM. Read latency is a single hash probe;
/// intersections run in native set-intersection time.
#[derive(Default)]
pub struct MemoryStore {
    entries: DashMap<IndexKey, PostingEntry>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn is_live(entry: &PostingEntry, now: Timestamp) -> bool {
        entry.expires_at > now
    }
}

#[async_trait]
impl IndexStore for MemoryStore {
    async fn add(
        &self,
        key: &IndexKey,
        r: &RecordRef,
        field_tag: Field,
        expires_at: Timestamp,
    ) -> Result<(), StoreError> {
        self.entries
            .entry(key.clone())
            .and_modify(|entry| {
                entry.refs.insert(r.clone());
                if expires_at > entry.expires_at {
                    entry.expires_at = expires_at;
                }
            })
            .or_insert_with(|| {
                let mut refs = HashSet::new();
                refs.insert(r.clone());
                PostingEntry {
                    refs,
                    field_tag,
                    created_at: chrono::Utc::now(),
                    expires_at,
                }
            });
        Ok(())
    }

    async fn remove(&self, key: &IndexKey, r: &RecordRef) -> Result<(), StoreError> {
        let mut empty_after = false;
        if let Some(mut entry) = self.entries.get_mut(key) {
            entry.refs.remove(r);
            empty_after = entry.refs.is_empty();
        }
        if empty_after {
            self.entries.remove(key);
        }
        Ok(())
    }

    async fn lookup(&self, key: &IndexKey) -> Result<HashSet<RecordRef>, StoreError> {
        let now = chrono::Utc::now();
        Ok(self
            .entries
            .get(key)
            .filter(|entry| Self::is_live(entry.value(), now))
            .map(|entry| entry.refs.clone())
            .unwrap_or_default())
    }

    async fn expire_sweep(&self, now: Timestamp) -> Result<u64, StoreError> {
        let expired: Vec<IndexKey> = self
            .entries
            .iter()
            .filter(|entry| entry.expires_at <= now)
            .map(|entry| entry.key().clone())
            .collect();
        for key in &expired {
            self.entries.remove(key);
        }
        Ok(expired.len() as u64)
    }

    async fn stats(&self) -> Result<StoreStats, StoreError> {
        let now = chrono::Utc::now();
        let mut stats = StoreStats::default();
        for entry in self.entries.iter() {
            stats.total_keys += 1;
            let tag = entry
                .key()
                .as_str()
                .split(':')
                .nth(2)
                .unwrap_or("unknown")
                .to_string();
            *stats.per_tag_counts.entry(tag).or_insert(0) += 1;
            stats.oldest = Some(match stats.oldest {
                Some(o) if o <= entry.created_at => o,
                _ => entry.created_at,
            });
            stats.newest = Some(match stats.newest {
                Some(n) if n >= entry.created_at => n,
                _ => entry.created_at,
            });
            if entry.expires_at <= now {
                stats.expired_pending += 1;
            }
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use psi_core::Field;

    fn later(secs: i64) -> Timestamp {
        chrono::Utc::now() + Duration::seconds(secs)
    }

    fn key(s: &str) -> IndexKey {
        IndexKey::from_raw(s.to_string())
    }

    fn record(s: &str) -> RecordRef {
        RecordRef::new(s.to_string()).unwrap()
    }

    #[tokio::test]
    async fn add_then_lookup_returns_ref() {
        let store = MemoryStore::new();
        let k = key("idx:email:eq:abc");
        store.add(&k, &record("r1"), Field::Email, later(60)).await.unwrap();
        let found = store.lookup(&k).await.unwrap();
        assert!(found.contains(&record("r1")));
    }

    #[tokio::test]
    async fn lookup_of_absent_key_is_empty() {
        let store = MemoryStore::new();
        let found = store.lookup(&key("idx:email:eq:missing")).await.unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn add_widens_expiry_to_the_later_value() {
        let store = MemoryStore::new();
        let k = key("idx:email:eq:abc");
        store.add(&k, &record("r1"), Field::Email, later(10)).await.unwrap();
        store.add(&k, &record("r2"), Field::Email, later(1000)).await.unwrap();
        store.expire_sweep(later(500)).await.unwrap();
        let found = store.lookup(&k).await.unwrap();
        assert_eq!(found.len(), 2, "entry must still be live at the wider expiry");
    }

    #[tokio::test]
    async fn remove_is_idempotent_and_garbage_collects_empty_lists() {
        let store = MemoryStore::new();
        let k = key("idx:email:eq:abc");
        store.add(&k, &record("r1"), Field::Email, later(60)).await.unwrap();
        store.remove(&k, &record("r1")).await.unwrap();
        store.remove(&k, &record("r1")).await.unwrap();
        let stats = store.stats().await.unwrap();
        assert_eq!(stats.total_keys, 0);
    }

    #[tokio::test]
    async fn expired_entry_is_invisible_to_lookup() {
        let store = MemoryStore::new();
        let k = key("idx:email:eq:abc");
        store.add(&k, &record("r1"), Field::Email, later(-1)).await.unwrap();
        let found = store.lookup(&k).await.unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn expire_sweep_removes_expired_and_reports_count() {
        let store = MemoryStore::new();
        store.add(&key("a"), &record("r1"), Field::Email, later(-10)).await.unwrap();
        store.add(&key("b"), &record("r2"), Field::Email, later(1000)).await.unwrap();
        let swept = store.expire_sweep(chrono::Utc::now()).await.unwrap();
        assert_eq!(swept, 1);
        let stats = store.stats().await.unwrap();
        assert_eq!(stats.total_keys, 1);
    }

    #[tokio::test]
    async fn intersect_keeps_only_refs_present_under_every_key() {
        let store = MemoryStore::new();
        store.add(&key("a"), &record("r1"), Field::Email, later(60)).await.unwrap();
        store.add(&key("a"), &record("r2"), Field::Email, later(60)).await.unwrap();
        store.add(&key("b"), &record("r2"), Field::Email, later(60)).await.unwrap();
        store.add(&key("b"), &record("r3"), Field::Email, later(60)).await.unwrap();

        let result = store.intersect(&[key("a"), key("b")]).await.unwrap();
        assert_eq!(result, std::collections::HashSet::from([record("r2")]));
    }

    #[tokio::test]
    async fn intersect_of_empty_key_list_is_empty() {
        let store = MemoryStore::new();
        let result = store.intersect(&[]).await.unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn key_level_add_commutes_across_concurrent_callers() {
        let store = std::sync::Arc::new(MemoryStore::new());
        let k = key("idx:email:eq:abc");
        let expires = later(60);

        let s1 = store.clone();
        let k1 = k.clone();
        let s2 = store.clone();
        let k2 = k.clone();

        let (a, b) = tokio::join!(
            tokio::spawn(async move { s1.add(&k1, &record("r1"), Field::Email, expires).await }),
            tokio::spawn(async move { s2.add(&k2, &record("r2"), Field::Email, expires).await }),
        );
        a.unwrap().unwrap();
        b.unwrap().unwrap();

        let found = store.lookup(&k).await.unwrap();
        assert_eq!(found.len(), 2, "concurrent adds to the same key must both land");
    }
}
