//! Error taxonomy for PSI operations (spec §7).

use thiserror::Error;

use crate::field::Field;

/// Errors surfaced by the fingerprinting layer (`psi-crypto`).
#[derive(Debug, Clone, Error)]
pub enum FingerprintError {
    #[error("PRF secret not loaded")]
    SecretMissing,

    #[error("fragment must not be empty")]
    EmptyFragment,
}

/// Errors surfaced by the index store (`psi-store`).
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("store connection dropped or timed out: {reason}")]
    Transient { reason: String },

    #[error("store is permanently unavailable: {reason}")]
    Permanent { reason: String },

    #[error("posting list for key {key} exceeds the backend's maximum size ({limit})")]
    PostingOverflow { key: String, limit: usize },

    #[error("stored entry for key {key} failed to decode: {reason}")]
    Integrity { key: String, reason: String },

    #[error("operation exceeded its cooperative deadline")]
    DeadlineExceeded,
}

/// Errors surfaced by the predicate evaluator and Boolean composer
/// (`psi-query`).
#[derive(Debug, Clone, Error)]
pub enum QueryError {
    #[error("unknown field: {0}")]
    UnknownField(String),

    #[error("unknown operator: {0}")]
    UnknownOperator(String),

    #[error("`contains` query must be at least {min} characters (got {got})")]
    QueryTooShort { min: usize, got: usize },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors surfaced while loading or validating configuration.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("invalid value for {field}: {value} — {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Errors surfaced by the key-management-service collaborator.
#[derive(Debug, Clone, Error)]
pub enum KmsError {
    #[error("key-management service unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("ciphertext rejected by key-management service: {reason}")]
    DecryptFailed { reason: String },
}

/// Errors surfaced by the record-store collaborator.
#[derive(Debug, Clone, Error)]
pub enum RecordStoreError {
    #[error("record not found for reference")]
    NotFound,

    #[error("record store unavailable: {reason}")]
    Unavailable { reason: String },
}

/// Errors surfaced by the indexer (`psi-indexer`).
#[derive(Debug, Clone, Error)]
pub enum IndexerError {
    #[error("unknown field and no ingestion tag supplied for value")]
    FieldInferenceFailed,

    #[error("field mismatch: ingester declared {declared} but inferred {inferred}")]
    FieldMismatch { declared: Field, inferred: Field },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Kms(#[from] KmsError),
}

/// Master error type folding every layer's errors into one.
#[derive(Debug, Clone, Error)]
pub enum PsiError {
    #[error(transparent)]
    Fingerprint(#[from] FingerprintError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Kms(#[from] KmsError),

    #[error(transparent)]
    RecordStore(#[from] RecordStoreError),

    #[error(transparent)]
    Indexer(#[from] IndexerError),
}

/// Result alias for PSI operations.
pub type PsiResult<T> = Result<T, PsiError>;
