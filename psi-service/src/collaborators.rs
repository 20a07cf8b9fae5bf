//! Out-of-core collaborator contracts (spec §6) and their in-process mock
//! implementations.
//!
//! Production implementations (a real KMS client, a real record store) are
//! explicitly out of scope (spec §1, Non-goals) — only the trait boundary
//! and test/demonstration doubles live here.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use psi_core::{KmsError, RecordRef, RecordStoreError};

/// Decrypts ciphertext into the plaintext the indexer fragments and keys.
/// The core never calls this during query — only during ingestion.
#[async_trait]
pub trait KeyManagementService: Send + Sync {
    async fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, KmsError>;
}

/// Fetches the encrypted record behind an opaque reference. Used only when
/// a caller of the evaluator opts in to retrieving the underlying record.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn fetch_ciphertext(&self, r: &RecordRef) -> Result<Vec<u8>, RecordStoreError>;
}

/// A `KeyManagementService` that "decrypts" by stripping a fixed prefix
/// tag, for tests and the demonstration CLI. Never use against real
/// ciphertext.
#[derive(Debug, Default)]
pub struct MockKms {
    fail: bool,
}

const MOCK_CIPHERTEXT_TAG: &[u8] = b"mock-ciphertext:";

impl MockKms {
    pub fn new() -> Self {
        Self::default()
    }

    /// A KMS double that always reports itself unavailable, for exercising
    /// the `Store unavailable` / exit-code-4 path.
    pub fn always_fails() -> Self {
        Self { fail: true }
    }

    /// Wrap a plaintext value the way this mock expects to receive it back.
    pub fn seal(plaintext: &[u8]) -> Vec<u8> {
        [MOCK_CIPHERTEXT_TAG, plaintext].concat()
    }
}

#[async_trait]
impl KeyManagementService for MockKms {
    async fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, KmsError> {
        if self.fail {
            return Err(KmsError::Unavailable {
                reason: "mock KMS configured to always fail".to_string(),
            });
        }
        ciphertext
            .strip_prefix(MOCK_CIPHERTEXT_TAG)
            .map(|plaintext| plaintext.to_vec())
            .ok_or_else(|| KmsError::DecryptFailed {
                reason: "ciphertext missing the mock sealing tag".to_string(),
            })
    }
}

/// An in-memory `RecordStore` double, for tests and the demonstration CLI.
#[derive(Debug, Default)]
pub struct MockRecordStore {
    records: Mutex<HashMap<RecordRef, Vec<u8>>>,
}

impl MockRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, r: RecordRef, ciphertext: Vec<u8>) {
        self.records
            .lock()
            .expect("mock record store mutex is never poisoned")
            .insert(r, ciphertext);
    }
}

#[async_trait]
impl RecordStore for MockRecordStore {
    async fn fetch_ciphertext(&self, r: &RecordRef) -> Result<Vec<u8>, RecordStoreError> {
        self.records
            .lock()
            .expect("mock record store mutex is never poisoned")
            .get(r)
            .cloned()
            .ok_or(RecordStoreError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_kms_round_trips_a_sealed_value() {
        let kms = MockKms::new();
        let sealed = MockKms::seal(b"priya@example.com");
        let plaintext = kms.decrypt(&sealed).await.unwrap();
        assert_eq!(plaintext, b"priya@example.com");
    }

    #[tokio::test]
    async fn mock_kms_rejects_unsealed_ciphertext() {
        let kms = MockKms::new();
        let err = kms.decrypt(b"not sealed").await.unwrap_err();
        assert!(matches!(err, KmsError::DecryptFailed { .. }));
    }

    #[tokio::test]
    async fn mock_kms_always_fails_reports_unavailable() {
        let kms = MockKms::always_fails();
        let err = kms.decrypt(&MockKms::seal(b"x")).await.unwrap_err();
        assert!(matches!(err, KmsError::Unavailable { .. }));
    }

    #[tokio::test]
    async fn mock_record_store_returns_not_found_for_unknown_ref() {
        let store = MockRecordStore::new();
        let r = RecordRef::new("rec-1").unwrap();
        let err = store.fetch_ciphertext(&r).await.unwrap_err();
        assert!(matches!(err, RecordStoreError::NotFound));
    }

    #[tokio::test]
    async fn mock_record_store_returns_inserted_ciphertext() {
        let store = MockRecordStore::new();
        let r = RecordRef::new("rec-1").unwrap();
        store.insert(r.clone(), b"ciphertext".to_vec());
        let fetched = store.fetch_ciphertext(&r).await.unwrap();
        assert_eq!(fetched, b"ciphertext");
    }
}
