use std::sync::Arc;
use std::time::{Duration, Instant};

use aggregator_burn::{BurnMonitor, IndexerClient};
use aggregator_router::{handle_message, Subject};
use aggregator_store::Store;
use aggregator_types::Config;
use aggregator_validate::{RateLimiter, RateLimiterConfig};
use clap::Parser;
use federation_aggregator::error::{AggregatorError, AggregatorResult};
use federation_aggregator::logging::subscribe_log;
use federation_aggregator::periodic::{run_burn_monitor, run_cleanup_task, run_limiter_sweep, run_rollup_publisher};
use futures::StreamExt;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// How often stale per-node rate-limit windows are swept. Not configurable:
/// the spec fixes this cadence independently of the rate-limit window width.
const LIMITER_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> AggregatorResult<()> {
    dotenv::dotenv().ok();
    let config = Config::parse();
    subscribe_log(&config.log_level);

    let store = Arc::new(Store::open_or_create(&config.db_path)?);
    tracing::info!(path = %config.db_path.display(), "opened store");

    let mut connect_options = async_nats::ConnectOptions::new();
    if !config.nats_user.is_empty() {
        connect_options = connect_options.user_and_password(config.nats_user.clone(), config.nats_password.clone());
    }
    let nats = connect_options.connect(&config.nats_url).await.map_err(AggregatorError::Broker)?;
    tracing::info!(url = %config.nats_url, "connected to broker");

    let indexer = IndexerClient::new(config.indexer_base_url.clone(), config.tru_contract_address.clone());
    let (burns, sync_state) = store.load_burns().await?;
    tracing::info!(loaded = burns.len(), "loaded burn ledger from store");
    let burn_monitor = Arc::new(Mutex::new(BurnMonitor::new(indexer, burns, sync_state)));

    let limiter = Arc::new(RateLimiter::new(RateLimiterConfig {
        window: Duration::from_millis(config.rate_limit_window_ms),
        global_budget: config.global_rate_limit,
        per_node_budget: config.rate_limit_per_node,
    }));

    let mut subscribers = Vec::with_capacity(Subject::ALL.len());
    for subject in Subject::ALL {
        let subscriber = nats.subscribe(subject.as_str().to_string()).await.map_err(|source| {
            AggregatorError::Subscribe { subject: subject.as_str().to_string(), source }
        })?;
        subscribers.push((subject, subscriber));
    }

    let shutdown = CancellationToken::new();

    let mut ingest_handles = Vec::with_capacity(subscribers.len());
    for (subject, mut subscriber) in subscribers {
        let store = store.clone();
        let limiter = limiter.clone();
        let token = shutdown.clone();
        ingest_handles.push(tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    message = subscriber.next() => {
                        let Some(message) = message else { break };
                        let now_ms = chrono::Utc::now().timestamp_millis();
                        let now_instant = Instant::now();
                        if let Err(err) =
                            handle_message(subject, &message.payload, now_ms, now_instant, &store, &limiter).await
                        {
                            tracing::error!(subject = subject.as_str(), error = %err, "failed to handle message");
                        }
                    }
                }
            }
        }));
    }

    let rollup_handle = tokio::spawn(run_rollup_publisher(
        store.clone(),
        nats.clone(),
        burn_monitor.clone(),
        Duration::from_millis(config.publish_interval_ms),
        shutdown.clone(),
    ));
    let cleanup_handle = tokio::spawn(run_cleanup_task(
        store.clone(),
        config.retention_days as i64,
        Duration::from_millis(config.cleanup_interval_ms),
        shutdown.clone(),
    ));
    let burn_handle = tokio::spawn(run_burn_monitor(
        store.clone(),
        burn_monitor.clone(),
        Duration::from_millis(config.burn_sync_interval_ms),
        shutdown.clone(),
    ));
    let sweep_handle =
        tokio::spawn(run_limiter_sweep(limiter.clone(), LIMITER_SWEEP_INTERVAL, shutdown.clone()));

    tokio::signal::ctrl_c().await.map_err(AggregatorError::Io)?;
    tracing::info!("shutdown signal received, draining in-flight work");

    // Stop the timers first, then ingestion, then flush and close, matching
    // the shutdown order laid out for this process.
    shutdown.cancel();
    rollup_handle.await.ok();
    cleanup_handle.await.ok();
    burn_handle.await.ok();
    sweep_handle.await.ok();
    for handle in ingest_handles {
        handle.await.ok();
    }

    nats.flush().await.ok();
    store.checkpoint().await?;
    tracing::info!("shutdown complete");

    Ok(())
}
