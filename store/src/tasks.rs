use aggregator_types::{ActiveNode, AggregatedInvoice, AggregatedTask, TaskStatus};
use rusqlite::{params, OptionalExtension};

use crate::error::StoreResult;
use crate::store::Store;

/// Handler-facing upserts. Each mirrors the SQL shape given in the
/// per-handler description: first-writer-wins for immutable metadata,
/// last-writer-wins for mutable state, grounded in
/// `task_manager::adv_sqlite::TaskDb`'s `INSERT ... ON CONFLICT DO UPDATE`
/// upsert style.
impl Store {
    /// A node reporting that it has picked up a task.
    pub async fn upsert_task_received(
        &self,
        task_id_hash: &str,
        now: i64,
        chain_id: Option<&str>,
        task_type: Option<&str>,
    ) -> StoreResult<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO aggregated_tasks
                (task_id_hash, first_seen_at, last_seen_at, chain_id, task_type, status, reporting_nodes)
             VALUES (?1, ?2, ?2, ?3, ?4, ?5, 1)
             ON CONFLICT(task_id_hash) DO UPDATE SET
                last_seen_at = ?2,
                reporting_nodes = reporting_nodes + 1",
            params![task_id_hash, now, chain_id, task_type, TaskStatus::Received.as_str()],
        )?;
        Ok(())
    }

    /// A node reporting that a task finished. A no-op, not an error, if the row is absent.
    pub async fn update_task_completed(
        &self,
        task_id_hash: &str,
        now: i64,
        success: Option<bool>,
        execution_time_bucket: Option<&str>,
        gas_used_bucket: Option<&str>,
        cached: Option<bool>,
    ) -> StoreResult<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "UPDATE aggregated_tasks SET
                status = ?2,
                success = ?3,
                execution_time_bucket = ?4,
                gas_used_bucket = ?5,
                cached = ?6,
                last_seen_at = ?7
             WHERE task_id_hash = ?1",
            params![
                task_id_hash,
                TaskStatus::Completed.as_str(),
                success,
                execution_time_bucket,
                gas_used_bucket,
                cached,
                now,
            ],
        )?;
        Ok(())
    }

    /// A node reporting that it produced a billable invoice for a task.
    pub async fn upsert_invoice_created(
        &self,
        invoice_id_hash: &str,
        now: i64,
        task_id_hash: Option<&str>,
        chain_id: Option<&str>,
        steps_computed_bucket: Option<&str>,
        memory_used_bucket: Option<&str>,
        operation: Option<&str>,
    ) -> StoreResult<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO aggregated_invoices
                (invoice_id_hash, task_id_hash, first_seen_at, last_seen_at, chain_id,
                 steps_computed_bucket, memory_used_bucket, operation, reporting_nodes)
             VALUES (?1, ?2, ?3, ?3, ?4, ?5, ?6, ?7, 1)
             ON CONFLICT(invoice_id_hash) DO UPDATE SET
                last_seen_at = ?3,
                reporting_nodes = reporting_nodes + 1",
            params![
                invoice_id_hash,
                task_id_hash,
                now,
                chain_id,
                steps_computed_bucket,
                memory_used_bucket,
                operation,
            ],
        )?;
        Ok(())
    }

    /// A node's periodic liveness report. Heartbeats are the only way a node becomes active.
    pub async fn upsert_heartbeat(
        &self,
        node_id: &str,
        now: i64,
        status: Option<&str>,
        total_tasks_bucket: Option<&str>,
        active_tasks_bucket: Option<&str>,
        continent_bucket: Option<&str>,
        location_bucket: Option<&str>,
    ) -> StoreResult<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO active_nodes
                (node_id, first_seen_at, last_seen_at, status, total_tasks_bucket,
                 active_tasks_bucket, continent_bucket, location_bucket, heartbeat_count)
             VALUES (?1, ?2, ?2, ?3, ?4, ?5, ?6, ?7, 1)
             ON CONFLICT(node_id) DO UPDATE SET
                last_seen_at = ?2,
                status = ?3,
                total_tasks_bucket = ?4,
                active_tasks_bucket = ?5,
                continent_bucket = ?6,
                location_bucket = ?7,
                heartbeat_count = heartbeat_count + 1",
            params![
                node_id,
                now,
                status,
                total_tasks_bucket,
                active_tasks_bucket,
                continent_bucket,
                location_bucket,
            ],
        )?;
        Ok(())
    }

    pub async fn get_task(&self, task_id_hash: &str) -> StoreResult<Option<AggregatedTask>> {
        let conn = self.conn.lock().await;
        conn.query_row(
            "SELECT task_id_hash, first_seen_at, last_seen_at, chain_id, task_type, status,
                    success, execution_time_bucket, gas_used_bucket, cached, reporting_nodes
             FROM aggregated_tasks WHERE task_id_hash = ?1",
            params![task_id_hash],
            row_to_task,
        )
        .optional()
        .map_err(Into::into)
    }

    pub async fn get_invoice(&self, invoice_id_hash: &str) -> StoreResult<Option<AggregatedInvoice>> {
        let conn = self.conn.lock().await;
        conn.query_row(
            "SELECT invoice_id_hash, task_id_hash, first_seen_at, last_seen_at, chain_id,
                    steps_computed_bucket, memory_used_bucket, operation, reporting_nodes
             FROM aggregated_invoices WHERE invoice_id_hash = ?1",
            params![invoice_id_hash],
            row_to_invoice,
        )
        .optional()
        .map_err(Into::into)
    }

    pub async fn get_node(&self, node_id: &str) -> StoreResult<Option<ActiveNode>> {
        let conn = self.conn.lock().await;
        conn.query_row(
            "SELECT node_id, first_seen_at, last_seen_at, status, total_tasks_bucket,
                    active_tasks_bucket, continent_bucket, location_bucket, heartbeat_count
             FROM active_nodes WHERE node_id = ?1",
            params![node_id],
            row_to_node,
        )
        .optional()
        .map_err(Into::into)
    }
}

fn row_to_task(row: &rusqlite::Row<'_>) -> rusqlite::Result<AggregatedTask> {
    let status: String = row.get(5)?;
    Ok(AggregatedTask {
        task_id_hash: row.get(0)?,
        first_seen_at: row.get(1)?,
        last_seen_at: row.get(2)?,
        chain_id: row.get(3)?,
        task_type: row.get(4)?,
        status: status.parse().unwrap_or(TaskStatus::Received),
        success: row.get(6)?,
        execution_time_bucket: row.get(7)?,
        gas_used_bucket: row.get(8)?,
        cached: row.get(9)?,
        reporting_nodes: row.get(10)?,
    })
}

fn row_to_invoice(row: &rusqlite::Row<'_>) -> rusqlite::Result<AggregatedInvoice> {
    Ok(AggregatedInvoice {
        invoice_id_hash: row.get(0)?,
        task_id_hash: row.get(1)?,
        first_seen_at: row.get(2)?,
        last_seen_at: row.get(3)?,
        chain_id: row.get(4)?,
        steps_computed_bucket: row.get(5)?,
        memory_used_bucket: row.get(6)?,
        operation: row.get(7)?,
        reporting_nodes: row.get(8)?,
    })
}

fn row_to_node(row: &rusqlite::Row<'_>) -> rusqlite::Result<ActiveNode> {
    Ok(ActiveNode {
        node_id: row.get(0)?,
        first_seen_at: row.get(1)?,
        last_seen_at: row.get(2)?,
        status: row.get(3)?,
        total_tasks_bucket: row.get(4)?,
        active_tasks_bucket: row.get(5)?,
        continent_bucket: row.get(6)?,
        location_bucket: row.get(7)?,
        heartbeat_count: row.get(8)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn receiving_the_same_task_twice_bumps_reporting_nodes_not_first_seen() {
        let store = Store::open_in_memory().unwrap();
        store.upsert_task_received("aabbccdd", 100, Some("1"), Some("wasm")).await.unwrap();
        store.upsert_task_received("aabbccdd", 200, Some("1"), Some("wasm")).await.unwrap();

        let task = store.get_task("aabbccdd").await.unwrap().unwrap();
        assert_eq!(task.first_seen_at, 100);
        assert_eq!(task.last_seen_at, 200);
        assert_eq!(task.reporting_nodes, 2);
    }

    #[tokio::test]
    async fn completing_an_unknown_task_is_a_no_op() {
        let store = Store::open_in_memory().unwrap();
        store
            .update_task_completed("nonexistent", 100, Some(true), Some("100-500ms"), None, Some(false))
            .await
            .unwrap();
        assert!(store.get_task("nonexistent").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn completion_overwrites_mutable_fields_but_not_first_seen_at() {
        let store = Store::open_in_memory().unwrap();
        store.upsert_task_received("aabbccdd", 100, Some("1"), Some("wasm")).await.unwrap();
        store
            .update_task_completed("aabbccdd", 150, Some(true), Some("100-500ms"), None, Some(false))
            .await
            .unwrap();

        let task = store.get_task("aabbccdd").await.unwrap().unwrap();
        assert_eq!(task.first_seen_at, 100);
        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(task.success, Some(true));
        assert_eq!(task.execution_time_bucket.as_deref(), Some("100-500ms"));
    }

    #[tokio::test]
    async fn heartbeat_upsert_increments_heartbeat_count() {
        let store = Store::open_in_memory().unwrap();
        let node = "node-00000000-0000-0000-0000-000000000001";
        store.upsert_heartbeat(node, 10, Some("online"), None, None, None, None).await.unwrap();
        store.upsert_heartbeat(node, 20, Some("online"), None, None, None, None).await.unwrap();

        let row = store.get_node(node).await.unwrap().unwrap();
        assert_eq!(row.heartbeat_count, 2);
        assert_eq!(row.last_seen_at, 20);
    }
}
