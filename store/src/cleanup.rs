use rusqlite::params;

use crate::error::StoreResult;
use crate::store::Store;

const NINETY_DAYS_MS: i64 = 90 * 24 * 60 * 60 * 1_000;

impl Store {
    /// Deletes history rows older than `retention_days`, and task/invoice
    /// rows idle for 90 days. `TruBurn` and `ActiveNode` rows are never
    /// touched here.
    pub async fn cleanup(&self, now: i64, retention_days: i64) -> StoreResult<()> {
        let conn = self.conn.lock().await;
        let history_cutoff = now - retention_days * 24 * 60 * 60 * 1_000;
        let idle_cutoff = now - NINETY_DAYS_MS;

        conn.execute(
            "DELETE FROM network_stats_history WHERE recorded_at < ?1",
            params![history_cutoff],
        )?;
        conn.execute(
            "DELETE FROM aggregated_tasks WHERE last_seen_at < ?1",
            params![idle_cutoff],
        )?;
        conn.execute(
            "DELETE FROM aggregated_invoices WHERE last_seen_at < ?1",
            params![idle_cutoff],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn cleanup_drops_only_stale_tasks_and_history() {
        let store = Store::open_in_memory().unwrap();
        let now = 200 * 24 * 60 * 60 * 1_000_i64;

        store.upsert_task_received("stale000", 0, None, None).await.unwrap();
        store.upsert_task_received("fresh000", now - 1_000, None, None).await.unwrap();
        store.insert_stats_history(0, &Default::default()).await.unwrap();
        store.insert_stats_history(now - 1_000, &Default::default()).await.unwrap();

        store.cleanup(now, 30).await.unwrap();

        assert!(store.get_task("stale000").await.unwrap().is_none());
        assert!(store.get_task("fresh000").await.unwrap().is_some());
        assert_eq!(store.history_rows().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn cleanup_never_touches_active_nodes() {
        let store = Store::open_in_memory().unwrap();
        let node = "node-00000000-0000-0000-0000-000000000001";
        store.upsert_heartbeat(node, 0, None, None, None, None, None).await.unwrap();

        store.cleanup(200 * 24 * 60 * 60 * 1_000, 30).await.unwrap();

        assert!(store.get_node(node).await.unwrap().is_some());
    }
}
