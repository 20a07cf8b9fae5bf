//! The indexer (C6, spec §4.6): turns one decrypted value into its full
//! fragment set and commits every resulting key to the store.

use std::sync::Arc;

use psi_core::{Field, IndexerError, RecordRef, Timestamp};
use psi_crypto::{derive_key, normalize, PrfSecret};
use psi_fragments::enumerate_fragments;
use psi_store::IndexStore;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::infer::infer_field;

/// How the field of an ingested value is determined.
#[derive(Debug, Clone, Copy)]
pub enum FieldHint {
    /// The ingester already knows the field (tagged ingestion). Bypasses
    /// inference entirely, per spec §4.6.
    Tagged(Field),
    /// The ingester doesn't know the field; infer it from pattern. A
    /// courtesy path for untagged corpora only.
    Untagged,
}

/// One value to ingest, as the indexer's batch entry point accepts it.
#[derive(Debug, Clone)]
pub struct IngestItem {
    pub hint: FieldHint,
    pub decrypted_value: String,
    pub record: RecordRef,
    pub expires_at: Timestamp,
}

/// Aggregate outcome of a bulk ingest. Per-value failures are swallowed
/// during bulk ingestion and reported here rather than aborting the whole
/// batch (spec §7, "Indexer may swallow per-value failures in bulk-mode and
/// report them in an aggregate summary").
#[derive(Debug, Default)]
pub struct BulkSummary {
    pub succeeded: u64,
    pub failed: Vec<(RecordRef, IndexerError)>,
}

/// Orchestrates normalize -> enumerate -> key -> store for ingestion.
///
/// Holds no global state; constructed once by `Core` (`psi-service`) and
/// shared via `Arc`, following the teacher's dependency-injection house
/// style (no singleton clients).
pub struct Indexer {
    secret: Arc<PrfSecret>,
    store: Arc<dyn IndexStore>,
    gram_width: u8,
    in_flight: Arc<Semaphore>,
}

impl Indexer {
    /// `max_in_flight` bounds concurrent per-value batches during bulk
    /// ingest (spec §5, backpressure): a simple semaphore sized to a few
    /// times the store's ideal concurrency.
    pub fn new(
        secret: Arc<PrfSecret>,
        store: Arc<dyn IndexStore>,
        gram_width: u8,
        max_in_flight: usize,
    ) -> Self {
        Self {
            secret,
            store,
            gram_width,
            in_flight: Arc::new(Semaphore::new(max_in_flight.max(1))),
        }
    }

    /// Index one decrypted value end to end (spec §4.6 steps 1-3).
    ///
    /// All fragment keys for this value are computed up front and only
    /// then added one by one — a cancelled caller (deadline, panic) can
    /// leave some keys committed and others not, but it can never have
    /// *started* without the caller itself observing the cancellation, so
    /// no concurrent lookup can infer a value existed from a silently
    /// partial commit; `expire_sweep` later reclaims any true orphan.
    pub async fn index_value(
        &self,
        hint: FieldHint,
        decrypted_value: &str,
        record: &RecordRef,
        expires_at: Timestamp,
    ) -> Result<(), IndexerError> {
        let v = normalize(decrypted_value);
        if v.is_empty() {
            return Ok(());
        }

        let field = match hint {
            FieldHint::Tagged(f) => f,
            FieldHint::Untagged => infer_field(&v).ok_or(IndexerError::FieldInferenceFailed)?,
        };

        let fragments = enumerate_fragments(&v, self.gram_width);
        let keys: Vec<_> = fragments
            .into_iter()
            .map(|(tag, fragment)| derive_key(&self.secret, field, tag, &fragment))
            .collect();

        for key in &keys {
            self.store.add(key, record, field, expires_at).await?;
        }

        Ok(())
    }

    /// Index many values concurrently, bounded by `max_in_flight`. Failures
    /// are collected rather than aborting the batch.
    pub async fn index_batch(self: &Arc<Self>, items: Vec<IngestItem>) -> BulkSummary {
        let mut tasks = JoinSet::new();

        for item in items {
            let indexer = Arc::clone(self);
            let permit = Arc::clone(&self.in_flight);
            tasks.spawn(async move {
                let _permit = permit
                    .acquire_owned()
                    .await
                    .expect("semaphore is never closed");
                let result = indexer
                    .index_value(item.hint, &item.decrypted_value, &item.record, item.expires_at)
                    .await;
                (item.record, result)
            });
        }

        let mut summary = BulkSummary::default();
        while let Some(joined) = tasks.join_next().await {
            let (record, result) = joined.expect("index_value task does not panic");
            match result {
                Ok(()) => summary.succeeded += 1,
                Err(e) => {
                    tracing::warn!(record = %record, error = %e, "value failed to index in bulk batch");
                    summary.failed.push((record, e));
                }
            }
        }

        summary
    }
}
