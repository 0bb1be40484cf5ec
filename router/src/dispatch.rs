use std::time::Instant;

use aggregator_store::Store;
use aggregator_types::InboundEnvelope;
use aggregator_validate::{validate_envelope, RateLimitDecision, RateLimiter};

use crate::error::RouterError;
use crate::subject::Subject;

/// Transport-agnostic entry point: validate, then rate-limit, then store.
/// Drops are logged and return `Ok(())`; only a store failure once past both
/// gates is propagated, so a thrown/returned error becomes a logged line and
/// never crashes the process — the caller logs `Err`, this function logs
/// drops.
pub async fn handle_message(
    subject: Subject,
    payload: &[u8],
    now_ms: i64,
    now_instant: Instant,
    store: &Store,
    limiter: &RateLimiter,
) -> Result<(), RouterError> {
    let envelope = InboundEnvelope::parse(payload)?;

    if let Err(reason) = validate_envelope(&envelope) {
        tracing::warn!(subject = subject.as_str(), %reason, "dropping message that failed validation");
        return Ok(());
    }

    match limiter.check(envelope.node_id.as_deref(), now_instant) {
        RateLimitDecision::Accepted => {}
        RateLimitDecision::MissingNodeId => {
            tracing::warn!(subject = subject.as_str(), "rejecting message without nodeId");
            return Ok(());
        }
        RateLimitDecision::PerNodeExceeded => {
            let prefix = envelope.node_id.as_deref().map(anonymize_prefix).unwrap_or_default();
            tracing::warn!(subject = subject.as_str(), node_prefix = %prefix, "per-node rate limit exceeded");
            return Ok(());
        }
        RateLimitDecision::GlobalExceeded => {
            tracing::warn!(subject = subject.as_str(), "global rate limit exceeded");
            return Ok(());
        }
    }

    match subject {
        Subject::TasksReceived => handle_task_received(&envelope, now_ms, store).await,
        Subject::TasksCompleted => handle_task_completed(&envelope, now_ms, store).await,
        Subject::InvoicesCreated => handle_invoice_created(&envelope, now_ms, store).await,
        Subject::Heartbeat => handle_heartbeat(&envelope, now_ms, store).await,
    }
}

/// Logs only the first 8 chars of a `nodeId`.
fn anonymize_prefix(node_id: &str) -> String {
    node_id.chars().take(8).collect()
}

/// A node reporting that it has picked up a task.
async fn handle_task_received(envelope: &InboundEnvelope, now: i64, store: &Store) -> Result<(), RouterError> {
    let Some(task_id_hash) = envelope.data_str("taskIdHash") else {
        tracing::warn!("dropping tasks.received with no taskIdHash");
        return Ok(());
    };
    store
        .upsert_task_received(task_id_hash, now, envelope.data_str("chainId"), envelope.data_str("taskType"))
        .await?;
    Ok(())
}

/// A node reporting that a task finished. A no-op for an unknown hash, not an error.
async fn handle_task_completed(envelope: &InboundEnvelope, now: i64, store: &Store) -> Result<(), RouterError> {
    let Some(task_id_hash) = envelope.data_str("taskIdHash") else {
        tracing::warn!("dropping tasks.completed with no taskIdHash");
        return Ok(());
    };
    store
        .update_task_completed(
            task_id_hash,
            now,
            envelope.data_bool("success"),
            envelope.data_str("executionTimeBucket"),
            envelope.data_str("gasUsedBucket"),
            envelope.data_bool("cached"),
        )
        .await?;
    Ok(())
}

/// A node reporting that it produced a billable invoice for a task.
async fn handle_invoice_created(envelope: &InboundEnvelope, now: i64, store: &Store) -> Result<(), RouterError> {
    let Some(invoice_id_hash) = envelope.data_str("invoiceIdHash") else {
        tracing::warn!("dropping invoices.created with no invoiceIdHash");
        return Ok(());
    };
    store
        .upsert_invoice_created(
            invoice_id_hash,
            now,
            envelope.data_str("taskIdHash"),
            envelope.data_str("chainId"),
            envelope.data_str("stepsComputedBucket"),
            envelope.data_str("memoryUsedBucket"),
            envelope.data_str("operation"),
        )
        .await?;
    Ok(())
}

/// A node's periodic liveness report. Heartbeats are the only way a node becomes active.
async fn handle_heartbeat(envelope: &InboundEnvelope, now: i64, store: &Store) -> Result<(), RouterError> {
    let Some(node_id) = envelope.node_id.as_deref() else {
        tracing::warn!("dropping heartbeat with no nodeId");
        return Ok(());
    };
    store
        .upsert_heartbeat(
            node_id,
            now,
            envelope.data_str("status"),
            envelope.data_str("totalTasksBucket"),
            envelope.data_str("activeTasksBucket"),
            envelope.data_str("continentBucket"),
            envelope.data_str("locationBucket"),
        )
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use aggregator_validate::RateLimiterConfig;

    use super::*;

    fn payload(json: &str) -> Vec<u8> {
        json.as_bytes().to_vec()
    }

    #[tokio::test]
    async fn completing_a_received_task_updates_its_fields() {
        let store = Store::open_in_memory().unwrap();
        let limiter = RateLimiter::new(RateLimiterConfig::default());
        let now = Instant::now();

        let received = payload(
            r#"{"nodeId":"node-00000000-0000-0000-0000-000000000001","data":{"taskIdHash":"aabbccdd","chainId":"1","taskType":"wasm"}}"#,
        );
        handle_message(Subject::TasksReceived, &received, 1_000, now, &store, &limiter).await.unwrap();

        let completed = payload(
            r#"{"nodeId":"node-00000000-0000-0000-0000-000000000001","data":{"taskIdHash":"aabbccdd","success":true,"executionTimeBucket":"100-500ms","cached":false}}"#,
        );
        handle_message(Subject::TasksCompleted, &completed, 1_500, now, &store, &limiter).await.unwrap();

        let task = store.get_task("aabbccdd").await.unwrap().unwrap();
        assert_eq!(task.success, Some(true));
        assert_eq!(task.execution_time_bucket.as_deref(), Some("100-500ms"));
    }

    #[tokio::test]
    async fn missing_node_id_does_not_mutate_store() {
        let store = Store::open_in_memory().unwrap();
        let limiter = RateLimiter::new(RateLimiterConfig::default());
        let msg = payload(r#"{"data":{"taskIdHash":"aabbccdd"}}"#);

        handle_message(Subject::TasksReceived, &msg, 0, Instant::now(), &store, &limiter).await.unwrap();

        assert!(store.get_task("aabbccdd").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn invalid_node_id_is_dropped_before_touching_the_store() {
        let store = Store::open_in_memory().unwrap();
        let limiter = RateLimiter::new(RateLimiterConfig::default());
        let msg = payload(r#"{"nodeId":"not-a-valid-id","data":{"taskIdHash":"aabbccdd"}}"#);

        handle_message(Subject::TasksReceived, &msg, 0, Instant::now(), &store, &limiter).await.unwrap();

        assert!(store.get_task("aabbccdd").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn per_node_limit_caps_accepted_messages() {
        let store = Store::open_in_memory().unwrap();
        let limiter = RateLimiter::new(RateLimiterConfig {
            window: std::time::Duration::from_millis(1_000),
            global_budget: 1_000,
            per_node_budget: 10,
        });
        let now = Instant::now();

        for i in 0..20 {
            let msg = payload(&format!(
                r#"{{"nodeId":"node-00000000-0000-0000-0000-000000000001","data":{{"taskIdHash":"{:08x}"}}}}"#,
                i
            ));
            handle_message(Subject::TasksReceived, &msg, 0, now, &store, &limiter).await.unwrap();
        }

        let counts = store.scalar_counts(1_000).await.unwrap();
        assert!(counts.total_tasks <= 10);
    }
}
