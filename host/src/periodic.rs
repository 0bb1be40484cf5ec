use std::sync::Arc;
use std::time::Duration;

use aggregator_burn::{compute_snapshot, leaderboard, BurnMonitor};
use aggregator_router::STATS_AGGREGATED_SUBJECT;
use aggregator_store::{Distribution, Store};
use aggregator_types::{BurnSnapshot, NetworkStatsData, NetworkStatsSnapshot};
use aggregator_validate::RateLimiter;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// Periodically rolls up the current store counts, distributions and burn
/// totals into one snapshot, publishes it, then records it in history
/// regardless of whether publication succeeded. Modeled the way the
/// teacher's test harness runs a cancellable background loop: `tokio::select!`
/// between `token.cancelled()` and the periodic work.
pub async fn run_rollup_publisher(
    store: Arc<Store>,
    nats: async_nats::Client,
    burn_monitor: Arc<Mutex<BurnMonitor>>,
    interval: Duration,
    token: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = token.cancelled() => {
                tracing::info!("rollup publisher shutting down");
                return;
            }
            _ = ticker.tick() => {
                if let Err(err) = publish_once(&store, &nats, &burn_monitor).await {
                    tracing::error!(error = %err, "rollup tick failed");
                }
            }
        }
    }
}

async fn publish_once(
    store: &Store,
    nats: &async_nats::Client,
    burn_monitor: &Mutex<BurnMonitor>,
) -> Result<(), aggregator_store::StoreError> {
    let now = chrono::Utc::now().timestamp_millis();
    let (counts, data) = build_rollup_data(store, burn_monitor, now).await?;

    let snapshot = NetworkStatsSnapshot::new(chrono::Utc::now().to_rfc3339(), data);
    match serde_json::to_vec(&snapshot) {
        Ok(payload) => {
            if let Err(err) = nats.publish(STATS_AGGREGATED_SUBJECT, payload.into()).await {
                tracing::error!(error = %err, "failed to publish network stats snapshot");
            }
        }
        Err(err) => tracing::error!(error = %err, "failed to serialize network stats snapshot"),
    }

    // Inserted even if publication above failed; the next tick is independent.
    store.insert_stats_history(now, &counts).await?;
    Ok(())
}

/// Reads the store and burn monitor and assembles one rollup's worth of
/// scalar counts, distributions and burn snapshot. Split out from
/// `publish_once` so the computation can be exercised without a live NATS
/// connection.
pub async fn build_rollup_data(
    store: &Store,
    burn_monitor: &Mutex<BurnMonitor>,
    now: i64,
) -> Result<(aggregator_store::ScalarCounts, NetworkStatsData), aggregator_store::StoreError> {
    let counts = store.scalar_counts(now).await?;

    let mut data = NetworkStatsData {
        active_nodes: counts.active_nodes,
        total_nodes: counts.total_nodes,
        total_tasks: counts.total_tasks,
        completed_tasks: counts.completed_tasks,
        failed_tasks: counts.failed_tasks,
        cached_tasks: counts.cached_tasks,
        tasks_last_24h: counts.tasks_last_24h,
        total_invoices: counts.total_invoices,
        invoices_last_24h: counts.invoices_last_24h,
        success_rate: counts.success_rate(),
        cache_hit_rate: counts.cache_hit_rate(),
        ..Default::default()
    };

    data.execution_time_distribution = store.distribution(Distribution::ExecutionTimeBucketTasks).await?;
    data.gas_used_distribution = store.distribution(Distribution::GasUsedBucketTasks).await?;
    data.chain_id_distribution = store.distribution(Distribution::ChainIdTasks).await?;
    data.task_type_distribution = store.distribution(Distribution::TaskTypeTasks).await?;
    data.steps_computed_distribution = store.distribution(Distribution::StepsComputedBucketInvoices).await?;
    data.memory_used_distribution = store.distribution(Distribution::MemoryUsedBucketInvoices).await?;
    data.continent_distribution = store.distribution(Distribution::ContinentBucketNodes).await?;
    data.location_distribution = store.distribution(Distribution::LocationBucketNodes).await?;
    data.tru_burns = burn_snapshot(burn_monitor, now).await;

    Ok((counts, data))
}

async fn burn_snapshot(burn_monitor: &Mutex<BurnMonitor>, now: i64) -> Option<BurnSnapshot> {
    let monitor = burn_monitor.lock().await;
    match compute_snapshot(monitor.burns(), now) {
        Ok(snapshot) => Some(snapshot),
        Err(err) => {
            tracing::error!(error = %err, "failed to compute burn snapshot, omitting truBurns this tick");
            None
        }
    }
}

/// Periodically prunes stale history and idle task/invoice rows.
pub async fn run_cleanup_task(store: Arc<Store>, retention_days: i64, interval: Duration, token: CancellationToken) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = token.cancelled() => {
                tracing::info!("cleanup task shutting down");
                return;
            }
            _ = ticker.tick() => {
                let now = chrono::Utc::now().timestamp_millis();
                if let Err(err) = store.cleanup(now, retention_days).await {
                    tracing::error!(error = %err, "cleanup tick failed");
                }
            }
        }
    }
}

/// Periodically asks the burn monitor for newly observed transfers,
/// persists them, and advances the sync checkpoint.
pub async fn run_burn_monitor(
    store: Arc<Store>,
    burn_monitor: Arc<Mutex<BurnMonitor>>,
    interval: Duration,
    token: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = token.cancelled() => {
                tracing::info!("burn monitor shutting down");
                return;
            }
            _ = ticker.tick() => {
                if let Err(err) = burn_sync_once(&store, &burn_monitor).await {
                    tracing::error!(error = %err, "burn sync tick failed");
                }
            }
        }
    }
}

/// Periodically drops per-node rate-limit windows idle longer than 10x the
/// window width, so the in-memory map does not grow without bound over a
/// long-running process.
pub async fn run_limiter_sweep(limiter: Arc<RateLimiter>, interval: Duration, token: CancellationToken) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = token.cancelled() => {
                tracing::info!("rate-limiter sweep shutting down");
                return;
            }
            _ = ticker.tick() => {
                limiter.sweep(std::time::Instant::now());
            }
        }
    }
}

async fn burn_sync_once(store: &Store, burn_monitor: &Mutex<BurnMonitor>) -> Result<(), aggregator_store::StoreError> {
    let now = chrono::Utc::now().timestamp_millis();
    let discovered = {
        let mut monitor = burn_monitor.lock().await;
        let discovered = monitor.sync_pass(now).await;
        if !discovered.is_empty() {
            tracing::info!(count = discovered.len(), "discovered new burn events");
        }
        if let Ok(board) = leaderboard(monitor.burns(), 5) {
            tracing::debug!(?board, "burn leaderboard (top 5)");
        }
        discovered
    };

    if discovered.is_empty() {
        return Ok(());
    }

    store.insert_burns(&discovered).await?;
    let state = burn_monitor.lock().await.state();
    store.update_burn_sync_state(state.last_block, state.total_burns, now).await?;
    Ok(())
}
