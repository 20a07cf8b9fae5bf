//! Relational index store (spec §4.5b): a single table with a comma-joined
//! posting-list column, following the literal schema in spec §6.
//!
//! Connection pooling mirrors the teacher's `caliber-api::db::DbClient` —
//! `deadpool-postgres` wrapping `tokio-postgres`, built from a small
//! `RelationalStoreConfig` with a `from_env()` constructor.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use deadpool_postgres::{Config, ManagerConfig, Pool, RecyclingMethod, Runtime};
use psi_core::{Field, IndexKey, RecordRef, StoreError, Timestamp};
use tokio_postgres::NoTls;

use crate::traits::{IndexStore, StoreStats};

/// The delimiter between opaque references inside the `refs` column
/// (spec §6) — part of the wire contract, never to be changed silently.
const REF_DELIMITER: char = ',';

/// DDL for the index table (spec §6). Callers run this once at startup;
/// `RelationalStore::ensure_schema` issues it with `CREATE TABLE IF NOT
/// EXISTS` so repeated calls are harmless.
const SCHEMA_DDL: &str = r#"
CREATE TABLE IF NOT EXISTS psi_index (
    key         text PRIMARY KEY,
    refs        text NOT NULL,
    field_tag   text NOT NULL,
    created_at  timestamptz NOT NULL DEFAULT now(),
    expires_at  timestamptz NOT NULL
);
CREATE INDEX IF NOT EXISTS psi_index_field_tag_idx ON psi_index (field_tag);
CREATE INDEX IF NOT EXISTS psi_index_expires_at_idx ON psi_index (expires_at);
CREATE INDEX IF NOT EXISTS psi_index_expires_field_idx ON psi_index (expires_at, field_tag);
"#;

/// Connection parameters for the relational backend.
#[derive(Debug, Clone)]
pub struct RelationalStoreConfig {
    pub host: String,
    pub port: u16,
    pub dbname: String,
    pub user: String,
    pub password: String,
    pub max_size: usize,
    pub connect_timeout: Duration,
}

impl Default for RelationalStoreConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            dbname: "psi".to_string(),
            user: "postgres".to_string(),
            password: String::new(),
            max_size: 16,
            connect_timeout: Duration::from_secs(30),
        }
    }
}

impl RelationalStoreConfig {
    /// Load from `PSI_DB_*` environment variables, falling back to
    /// defaults for anything unset.
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            host: std::env::var("PSI_DB_HOST").unwrap_or(default.host),
            port: std::env::var("PSI_DB_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.port),
            dbname: std::env::var("PSI_DB_NAME").unwrap_or(default.dbname),
            user: std::env::var("PSI_DB_USER").unwrap_or(default.user),
            password: std::env::var("PSI_DB_PASSWORD").unwrap_or(default.password),
            max_size: std::env::var("PSI_DB_POOL_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.max_size),
            connect_timeout: Duration::from_secs(
                std::env::var("PSI_DB_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(default.connect_timeout.as_secs()),
            ),
        }
    }

    pub fn create_pool(&self) -> Result<Pool, StoreError> {
        let mut cfg = Config::new();
        cfg.host = Some(self.host.clone());
        cfg.port = Some(self.port);
        cfg.dbname = Some(self.dbname.clone());
        cfg.user = Some(self.user.clone());
        cfg.password = Some(self.password.clone());
        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });

        cfg.create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| StoreError::Permanent {
                reason: format!("failed to create connection pool: {e}"),
            })
    }
}

/// Postgres-backed index store.
pub struct RelationalStore {
    pool: Pool,
}

fn decode_refs(raw: &str) -> HashSet<RecordRef> {
    raw.split(REF_DELIMITER)
        .filter(|s| !s.is_empty())
        .filter_map(|s| RecordRef::new(s.to_string()).ok())
        .collect()
}

fn encode_refs<'a>(refs: impl Iterator<Item = &'a RecordRef>) -> String {
    refs.map(|r| r.as_str()).collect::<Vec<_>>().join(",")
}

impl RelationalStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Create a pool from `config` and wrap it.
    pub fn connect(config: &RelationalStoreConfig) -> Result<Self, StoreError> {
        Ok(Self::new(config.create_pool()?))
    }

    /// Idempotently create the `psi_index` table and its indices.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        let conn = self.get_conn().await?;
        conn.batch_execute(SCHEMA_DDL)
            .await
            .map_err(|e| StoreError::Permanent {
                reason: format!("schema migration failed: {e}"),
            })
    }

    async fn get_conn(&self) -> Result<deadpool_postgres::Object, StoreError> {
        self.pool.get().await.map_err(|e| StoreError::Transient {
            reason: format!("failed to acquire connection: {e}"),
        })
    }
}

#[async_trait]
impl IndexStore for RelationalStore {
    async fn add(
        &self,
        key: &IndexKey,
        r: &RecordRef,
        field_tag: Field,
        expires_at: Timestamp,
    ) -> Result<(), StoreError> {
        let mut conn = self.get_conn().await?;
        let txn = conn.transaction().await.map_err(|e| StoreError::Transient {
            reason: format!("failed to start transaction: {e}"),
        })?;

        let existing = txn
            .query_opt(
                "SELECT refs, expires_at FROM psi_index WHERE key = $1 FOR UPDATE",
                &[&key.as_str()],
            )
            .await
            .map_err(|e| StoreError::Transient { reason: e.to_string() })?;

        match existing {
            Some(row) => {
                let raw_refs: String = row.get(0);
                let stored_expires: Timestamp = row.get(1);
                let mut refs = decode_refs(&raw_refs);
                refs.insert(r.clone());
                let merged_expires = expires_at.max(stored_expires);
                let encoded = encode_refs(refs.iter());
                txn.execute(
                    "UPDATE psi_index SET refs = $1, expires_at = $2 WHERE key = $3",
                    &[&encoded, &merged_expires, &key.as_str()],
                )
                .await
                .map_err(|e| StoreError::Transient { reason: e.to_string() })?;
            }
            None => {
                txn.execute(
                    "INSERT INTO psi_index (key, refs, field_tag, expires_at) VALUES ($1, $2, $3, $4)",
                    &[&key.as_str(), &r.as_str(), &field_tag.full_name(), &expires_at],
                )
                .await
                .map_err(|e| StoreError::Transient { reason: e.to_string() })?;
            }
        }

        txn.commit().await.map_err(|e| StoreError::Transient {
            reason: format!("failed to commit transaction: {e}"),
        })
    }

    async fn remove(&self, key: &IndexKey, r: &RecordRef) -> Result<(), StoreError> {
        let mut conn = self.get_conn().await?;
        let txn = conn.transaction().await.map_err(|e| StoreError::Transient {
            reason: format!("failed to start transaction: {e}"),
        })?;

        let existing = txn
            .query_opt(
                "SELECT refs FROM psi_index WHERE key = $1 FOR UPDATE",
                &[&key.as_str()],
            )
            .await
            .map_err(|e| StoreError::Transient { reason: e.to_string() })?;

        if let Some(row) = existing {
            let raw_refs: String = row.get(0);
            let mut refs = decode_refs(&raw_refs);
            refs.remove(r);
            if refs.is_empty() {
                txn.execute("DELETE FROM psi_index WHERE key = $1", &[&key.as_str()])
                    .await
                    .map_err(|e| StoreError::Transient { reason: e.to_string() })?;
            } else {
                let encoded = encode_refs(refs.iter());
                txn.execute(
                    "UPDATE psi_index SET refs = $1 WHERE key = $2",
                    &[&encoded, &key.as_str()],
                )
                .await
                .map_err(|e| StoreError::Transient { reason: e.to_string() })?;
            }
        }

        txn.commit().await.map_err(|e| StoreError::Transient {
            reason: format!("failed to commit transaction: {e}"),
        })
    }

    async fn lookup(&self, key: &IndexKey) -> Result<HashSet<RecordRef>, StoreError> {
        let conn = self.get_conn().await?;
        let row = conn
            .query_opt(
                "SELECT refs FROM psi_index WHERE key = $1 AND expires_at > now()",
                &[&key.as_str()],
            )
            .await
            .map_err(|e| StoreError::Transient { reason: e.to_string() })?;

        Ok(row
            .map(|row| decode_refs(&row.get::<_, String>(0)))
            .unwrap_or_default())
    }

    async fn intersect(&self, keys: &[IndexKey]) -> Result<HashSet<RecordRef>, StoreError> {
        if keys.is_empty() {
            return Ok(HashSet::new());
        }
        let conn = self.get_conn().await?;

        // A repeated K-gram (e.g. "banana" -> ban, ana, nan, ana) yields
        // duplicate keys; `key = ANY($1)` only ever matches one row per
        // distinct key, so the required count is the distinct key count,
        // not the raw list length.
        let distinct_keys: HashSet<&str> = keys.iter().map(|k| k.as_str()).collect();
        let key_strs: Vec<&str> = distinct_keys.iter().copied().collect();

        let rows = conn
            .query(
                "SELECT ref FROM (
                     SELECT unnest(string_to_array(refs, ',')) AS ref
                     FROM psi_index
                     WHERE key = ANY($1) AND expires_at > now()
                 ) t
                 GROUP BY ref
                 HAVING count(*) = $2",
                &[&key_strs, &(key_strs.len() as i64)],
            )
            .await
            .map_err(|e| StoreError::Transient { reason: e.to_string() })?;

        Ok(rows
            .into_iter()
            .filter_map(|row| RecordRef::new(row.get::<_, String>(0)).ok())
            .collect())
    }

    async fn expire_sweep(&self, now: Timestamp) -> Result<u64, StoreError> {
        let conn = self.get_conn().await?;
        let affected = conn
            .execute("DELETE FROM psi_index WHERE expires_at <= $1", &[&now])
            .await
            .map_err(|e| StoreError::Transient { reason: e.to_string() })?;
        Ok(affected)
    }

    async fn stats(&self) -> Result<StoreStats, StoreError> {
        let conn = self.get_conn().await?;

        let totals = conn
            .query_one(
                "SELECT count(*), min(created_at), max(created_at),
                        count(*) FILTER (WHERE expires_at <= now())
                 FROM psi_index",
                &[],
            )
            .await
            .map_err(|e| StoreError::Transient { reason: e.to_string() })?;

        let total_keys: i64 = totals.get(0);
        let oldest: Option<Timestamp> = totals.get(1);
        let newest: Option<Timestamp> = totals.get(2);
        let expired_pending: i64 = totals.get(3);

        let tag_rows = conn
            .query(
                "SELECT split_part(key, ':', 3) AS tag, count(*) FROM psi_index GROUP BY tag",
                &[],
            )
            .await
            .map_err(|e| StoreError::Transient { reason: e.to_string() })?;

        let per_tag_counts = tag_rows
            .into_iter()
            .map(|row| {
                let tag: String = row.get(0);
                let count: i64 = row.get(1);
                (tag, count as u64)
            })
            .collect();

        Ok(StoreStats {
            total_keys: total_keys as u64,
            per_tag_counts,
            oldest,
            newest,
            expired_pending: expired_pending as u64,
        })
    }
}
