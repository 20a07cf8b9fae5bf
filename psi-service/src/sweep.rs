//! Background retention sweep (spec §4.5, P9): periodically evicts entries
//! past their `expires_at`. Grounded on the teacher's saga-cleanup
//! background task — the same `tokio::time::interval` +
//! `MissedTickBehavior::Skip` shape, driven until a shutdown signal fires.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use psi_store::IndexStore;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};

#[derive(Debug, Clone)]
pub struct SweepConfig {
    /// How often to run `expire_sweep`.
    pub interval: Duration,
    /// Whether to log a line for every cycle, not just cycles that removed
    /// entries.
    pub log_empty_cycles: bool,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(300),
            log_empty_cycles: false,
        }
    }
}

impl SweepConfig {
    pub fn from_env() -> Self {
        let interval = Duration::from_secs(
            std::env::var("PSI_SWEEP_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(300),
        );
        let log_empty_cycles = std::env::var("PSI_SWEEP_LOG_EMPTY_CYCLES")
            .ok()
            .map(|v| v == "true")
            .unwrap_or(false);
        Self { interval, log_empty_cycles }
    }
}

/// Cumulative counters for the sweep's lifetime, exposed for audit
/// reporting (no Prometheus exporter — that's ambient infra the spec's
/// Non-goals exclude, per spec.md §1).
#[derive(Debug, Default)]
pub struct SweepMetrics {
    pub cycles: AtomicU64,
    pub entries_removed: AtomicU64,
    pub sweep_errors: AtomicU64,
}

impl SweepMetrics {
    pub fn snapshot(&self) -> SweepSnapshot {
        SweepSnapshot {
            cycles: self.cycles.load(Ordering::Relaxed),
            entries_removed: self.entries_removed.load(Ordering::Relaxed),
            sweep_errors: self.sweep_errors.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SweepSnapshot {
    pub cycles: u64,
    pub entries_removed: u64,
    pub sweep_errors: u64,
}

/// Run the retention sweep until `shutdown_rx` reports `true`.
///
/// Store-transient errors (a dropped connection, a timeout) are logged at
/// `warn` and retried on the next tick, matching the policy table in spec
/// §7 ("Store transient ... retry with backoff; bounded" — the bound here
/// is simply the next scheduled tick, since the sweep is already
/// interval-driven rather than ad hoc).
pub async fn retention_sweep_task(
    store: Arc<dyn IndexStore>,
    config: SweepConfig,
    mut shutdown_rx: watch::Receiver<bool>,
) -> SweepSnapshot {
    let metrics = SweepMetrics::default();
    let mut ticker = interval(config.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                run_one_cycle(&store, &metrics, config.log_empty_cycles).await;
            }
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    tracing::info!("retention sweep shutting down");
                    break;
                }
            }
        }
    }

    metrics.snapshot()
}

async fn run_one_cycle(store: &Arc<dyn IndexStore>, metrics: &SweepMetrics, log_empty: bool) {
    metrics.cycles.fetch_add(1, Ordering::Relaxed);
    match store.expire_sweep(chrono::Utc::now()).await {
        Ok(removed) => {
            metrics.entries_removed.fetch_add(removed, Ordering::Relaxed);
            if removed > 0 || log_empty {
                tracing::info!(removed, "retention sweep cycle complete");
            }
        }
        Err(e) => {
            metrics.sweep_errors.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(error = %e, "retention sweep cycle failed, will retry next tick");
        }
    }
}
