//! Demonstration CLI driver (spec §6): wires a `Core` over mock
//! collaborators and exposes `seal`/`ingest`/`query`/`stats` subcommands
//! with the exit-code contract from spec §6. The retention sweep
//! (`psi_service::retention_sweep_task`) is a library entry point meant for
//! a long-running service to spawn, not a one-shot CLI action.

use std::process::ExitCode;
use std::sync::Arc;
use std::str::FromStr;

use base64::Engine as _;
use clap::{Parser, Subcommand};
use psi_core::{Field, IndexerError, QueryError};
use psi_query::{BoolOp, Predicate};
use psi_service::{finalize, load_config, Core, MockKms, MockRecordStore, ServiceError};
use psi_store::IndexStore;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "psi", about = "Privacy-preserving substring search index")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Seal a plaintext value into the mock KMS's ciphertext form, printed
    /// as base64. A convenience step for feeding `ingest` in this
    /// demonstration CLI — a real deployment's values already arrive
    /// encrypted by a real KMS.
    Seal {
        plaintext: String,
    },
    /// Decrypt one ciphertext value and index it under `record`.
    Ingest {
        /// Field full name, e.g. EMAIL, FIRST_NAME.
        field: String,
        /// Base64-encoded ciphertext, as produced by `seal`.
        ciphertext_base64: String,
        #[arg(long = "ref")]
        record_ref: String,
        #[arg(long, default_value_t = 7_776_000)]
        ttl_secs: i64,
    },
    /// Evaluate one or more `FIELD:OPERATOR:VALUE` predicates, composed
    /// under a single Boolean operator.
    Query {
        #[arg(long = "predicate", value_parser = parse_predicate, num_args = 1..)]
        predicates: Vec<(String, String, String)>,
        #[arg(long, default_value = "and")]
        op: String,
    },
    /// Print aggregate store statistics.
    Stats,
}

fn parse_predicate(s: &str) -> Result<(String, String, String), String> {
    let mut parts = s.splitn(3, ':');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(field), Some(operator), Some(value)) => {
            Ok((field.to_string(), operator.to_string(), value.to_string()))
        }
        _ => Err(format!("expected FIELD:OPERATOR:VALUE, got {s:?}")),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    match run().await {
        Ok(()) => ExitCode::from(0),
        Err(e) => {
            tracing::error!(error = %e, exit_code = e.exit_code(), "psi command failed");
            eprintln!("{e}");
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<(), ServiceError> {
    let cli = Cli::parse();

    // `seal` needs no store, secret, or collaborators — handle it before
    // building a `Core` at all.
    if let Command::Seal { plaintext } = &cli.command {
        let sealed = MockKms::seal(plaintext.as_bytes());
        println!("{}", base64::engine::general_purpose::STANDARD.encode(sealed));
        return Ok(());
    }

    let config = load_config()?;
    let core = Core::new(config, Arc::new(MockKms::new()), Arc::new(MockRecordStore::new())).await?;

    match cli.command {
        Command::Seal { .. } => unreachable!("handled above"),
        Command::Ingest { field, ciphertext_base64, record_ref, ttl_secs } => {
            ingest(&core, field, ciphertext_base64, record_ref, ttl_secs).await
        }
        Command::Query { predicates, op } => query(&core, predicates, &op).await,
        Command::Stats => stats(&core).await,
    }
}

async fn ingest(
    core: &Core,
    field: String,
    ciphertext_base64: String,
    record_ref: String,
    ttl_secs: i64,
) -> Result<(), ServiceError> {
    let field = Field::from_str(&field)
        .map_err(|e| ServiceError::Other(e.to_string()))?;
    let record = psi_core::RecordRef::new(record_ref).map_err(|e| ServiceError::Other(e.to_string()))?;

    let ciphertext = base64::engine::general_purpose::STANDARD
        .decode(ciphertext_base64)
        .map_err(|e| ServiceError::Other(format!("invalid base64 ciphertext: {e}")))?;
    let plaintext = core.kms.decrypt(&ciphertext).await?;
    let plaintext = String::from_utf8(plaintext)
        .map_err(|_| ServiceError::Other("decrypted value is not valid UTF-8".to_string()))?;

    let expires_at = chrono::Utc::now() + chrono::Duration::seconds(ttl_secs);
    let indexer = core.indexer(4);
    indexer
        .index_value(psi_indexer::FieldHint::Tagged(field), &plaintext, &record, expires_at)
        .await
        .map_err(map_indexer_err)?;

    println!("indexed {record} under {field}");
    Ok(())
}

async fn query(core: &Core, raw_predicates: Vec<(String, String, String)>, op: &str) -> Result<(), ServiceError> {
    let op = match op {
        "and" | "AND" => BoolOp::And,
        "or" | "OR" => BoolOp::Or,
        other => return Err(ServiceError::Other(format!("unknown Boolean operator: {other}"))),
    };

    let predicates: Vec<Predicate> = raw_predicates
        .into_iter()
        .map(|(field, operator, value)| Predicate::parse(&field, &operator, value))
        .collect::<Result<_, QueryError>>()
        .map_err(map_query_err)?;

    let gated = psi_query::run_query(
        core.store.as_ref(),
        core.secret.as_ref(),
        &predicates,
        op,
        core.config.gram_width,
        core.config.k_anonymity_threshold,
        core.config.k_anonymity_per_predicate,
    )
    .await
    .map_err(map_query_err)?;

    let response = finalize(gated, core.config.max_results);
    if response.suppressed_for_anonymity {
        println!("suppressed (result set below k-anonymity threshold)");
    } else {
        for r in &response.refs {
            println!("{r}");
        }
        if response.truncated_to_max_results {
            println!("(truncated to {} results)", core.config.max_results);
        }
    }
    Ok(())
}

async fn stats(core: &Core) -> Result<(), ServiceError> {
    let health = core.health_check().await;
    match &health.message {
        Some(msg) => println!("status: {:?} ({msg})", health.status),
        None => println!("status: {:?}", health.status),
    }

    let stats = core
        .store
        .stats()
        .await
        .map_err(ServiceError::StoreUnavailable)?;
    println!("total_keys: {}", stats.total_keys);
    for (tag, count) in &stats.per_tag_counts {
        println!("  {tag}: {count}");
    }
    println!("expired_pending: {}", stats.expired_pending);
    Ok(())
}

fn map_indexer_err(e: IndexerError) -> ServiceError {
    match e {
        IndexerError::Store(se) => ServiceError::StoreUnavailable(se),
        IndexerError::Kms(ke) => ServiceError::KmsUnavailable(ke),
        other => ServiceError::Other(other.to_string()),
    }
}

fn map_query_err(e: QueryError) -> ServiceError {
    match e {
        QueryError::Store(se) => ServiceError::StoreUnavailable(se),
        other => ServiceError::Other(other.to_string()),
    }
}
