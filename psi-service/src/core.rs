//! Dependency injection root (spec §9, Open Question resolution).
//!
//! One `Core` struct holds every shared collaborator behind an `Arc`. It is
//! built once in `main` and cloned by reference into the indexer and query
//! call sites — there is no module-level static anywhere in the workspace.

use std::sync::Arc;

use psi_core::{ConfigError, HealthCheck, KmsError, PsiConfig, StoreBackend, StoreError};
use psi_crypto::PrfSecret;
use psi_indexer::Indexer;
use psi_store::{IndexStore, MemoryStore, RelationalStore, RelationalStoreConfig};

use crate::collaborators::{KeyManagementService, RecordStore};

/// The fully-wired set of collaborators a PSI deployment needs.
pub struct Core {
    pub secret: Arc<PrfSecret>,
    pub store: Arc<dyn IndexStore>,
    pub kms: Arc<dyn KeyManagementService>,
    pub records: Arc<dyn RecordStore>,
    pub config: PsiConfig,
}

/// Errors at the driver boundary, carrying exactly the distinctions the CLI
/// exit-code contract needs (spec §6) — a coarser grouping than the
/// seven-kind taxonomy in `psi-core::error`, because "schema mismatch" has
/// no counterpart there (it's a startup-time CLI concern, not a query-time
/// error kind).
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("index store unavailable: {0}")]
    StoreUnavailable(StoreError),

    #[error("index store schema mismatch: {0}")]
    SchemaMismatch(StoreError),

    #[error("key-management service unavailable: {0}")]
    KmsUnavailable(#[from] KmsError),

    #[error("{0}")]
    Other(String),
}

impl ServiceError {
    /// The exact numeric contract from spec §6.
    pub fn exit_code(&self) -> u8 {
        match self {
            ServiceError::Config(_) => 2,
            ServiceError::StoreUnavailable(_) => 3,
            ServiceError::KmsUnavailable(_) => 4,
            ServiceError::SchemaMismatch(_) => 5,
            ServiceError::Other(_) => 1,
        }
    }
}

impl Core {
    /// Build the store, secret, and indexer from `config`, taking the
    /// collaborator implementations as given (real or mock — `Core` does
    /// not care which).
    ///
    /// For the relational backend, schema readiness is checked eagerly here
    /// (spec §6, exit code 5) rather than deferred to the first query.
    pub async fn new(
        config: PsiConfig,
        kms: Arc<dyn KeyManagementService>,
        records: Arc<dyn RecordStore>,
    ) -> Result<Self, ServiceError> {
        config.validate().map_err(|e| match e {
            psi_core::PsiError::Config(inner) => ServiceError::Config(inner),
            other => ServiceError::Other(other.to_string()),
        })?;

        let secret = Arc::new(PrfSecret::from_base64(&config.secret_base64).map_err(|_| {
            ServiceError::Config(ConfigError::InvalidValue {
                field: "secret_base64".to_string(),
                value: String::new(),
                reason: "not valid base64".to_string(),
            })
        })?);

        let store: Arc<dyn IndexStore> = match config.store_backend {
            StoreBackend::Memory => Arc::new(MemoryStore::new()),
            StoreBackend::Relational => {
                let db_config = RelationalStoreConfig::from_env();
                let relational =
                    RelationalStore::connect(&db_config).map_err(ServiceError::StoreUnavailable)?;
                relational
                    .ensure_schema()
                    .await
                    .map_err(ServiceError::SchemaMismatch)?;
                Arc::new(relational)
            }
        };

        Ok(Self {
            secret,
            store,
            kms,
            records,
            config,
        })
    }

    /// Construct an `Indexer` sharing this `Core`'s secret and store.
    pub fn indexer(&self, max_in_flight: usize) -> Indexer {
        Indexer::new(
            Arc::clone(&self.secret),
            Arc::clone(&self.store),
            self.config.gram_width,
            max_in_flight,
        )
    }

    /// Confirm the store answers a cheap read before serving traffic.
    pub async fn ensure_store_ready(&self) -> Result<(), ServiceError> {
        self.store
            .stats()
            .await
            .map_err(ServiceError::StoreUnavailable)?;
        Ok(())
    }

    /// Report the index store's health, for a readiness probe or the CLI's
    /// `stats` command. Unlike `ensure_store_ready`, this never returns
    /// `Err` — a failed store read is itself an unhealthy result, not a
    /// driver error.
    pub async fn health_check(&self) -> HealthCheck {
        let started = std::time::Instant::now();
        match self.store.stats().await {
            Ok(_) => HealthCheck::healthy("index_store")
                .with_response_time(started.elapsed().as_millis() as i64),
            Err(e) => HealthCheck::unhealthy("index_store", e.to_string()),
        }
    }
}

/// Load configuration strictly from the environment, the form a CLI driver
/// uses (spec §6 configuration surface, via `PsiConfig::from_env`).
pub fn load_config() -> Result<PsiConfig, ServiceError> {
    PsiConfig::from_env().map_err(|e| match e {
        psi_core::PsiError::Config(inner) => ServiceError::Config(inner),
        other => ServiceError::Other(other.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{MockKms, MockRecordStore};

    fn config() -> PsiConfig {
        PsiConfig::with_secret(base64_of(b"a shared secret key"))
    }

    fn base64_of(bytes: &[u8]) -> String {
        use base64::Engine as _;
        base64::engine::general_purpose::STANDARD.encode(bytes)
    }

    #[tokio::test]
    async fn builds_a_memory_backed_core_from_valid_config() {
        let core = Core::new(config(), Arc::new(MockKms::new()), Arc::new(MockRecordStore::new()))
            .await
            .unwrap();
        core.ensure_store_ready().await.unwrap();
    }

    #[tokio::test]
    async fn rejects_invalid_config_before_touching_collaborators() {
        let mut bad = config();
        bad.gram_width = 1;
        let err = Core::new(bad, Arc::new(MockKms::new()), Arc::new(MockRecordStore::new())).await;
        let err = err.unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[tokio::test]
    async fn health_check_reports_healthy_for_a_reachable_store() {
        let core = Core::new(config(), Arc::new(MockKms::new()), Arc::new(MockRecordStore::new()))
            .await
            .unwrap();
        let health = core.health_check().await;
        assert_eq!(health.status, psi_core::HealthStatus::Healthy);
        assert!(health.response_time_ms.is_some());
    }

    #[tokio::test]
    async fn indexer_built_from_core_shares_its_store() {
        let core = Core::new(config(), Arc::new(MockKms::new()), Arc::new(MockRecordStore::new()))
            .await
            .unwrap();
        let indexer = core.indexer(4);
        let record = psi_core::RecordRef::new("rec-1").unwrap();
        indexer
            .index_value(
                psi_indexer::FieldHint::Tagged(psi_core::Field::FirstName),
                "Arjun",
                &record,
                chrono::Utc::now() + chrono::Duration::seconds(60),
            )
            .await
            .unwrap();

        let stats = core.store.stats().await.unwrap();
        assert!(stats.total_keys > 0);
    }
}
