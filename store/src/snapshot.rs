use std::collections::BTreeMap;

use aggregator_types::NetworkStatsHistoryRow;
use rusqlite::params;

use crate::error::StoreResult;
use crate::store::Store;

const FIVE_MINUTES_MS: i64 = 5 * 60 * 1_000;
const TWENTY_FOUR_HOURS_MS: i64 = 24 * 60 * 60 * 1_000;

/// The scalar counters read in a single query so they are consistent with
/// one another at read time.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScalarCounts {
    pub active_nodes: i64,
    pub total_nodes: i64,
    pub total_tasks: i64,
    pub completed_tasks: i64,
    pub failed_tasks: i64,
    pub cached_tasks: i64,
    pub tasks_last_24h: i64,
    pub total_invoices: i64,
    pub invoices_last_24h: i64,
}

impl ScalarCounts {
    /// Completed-over-total, as a percentage rounded to 0.1.
    pub fn success_rate(&self) -> f64 {
        if self.total_tasks > 0 {
            round_to_tenth(self.completed_tasks as f64 / self.total_tasks as f64 * 100.0)
        } else {
            0.0
        }
    }

    /// Cached-over-completed, as a percentage rounded to 0.1.
    pub fn cache_hit_rate(&self) -> f64 {
        if self.completed_tasks > 0 {
            round_to_tenth(self.cached_tasks as f64 / self.completed_tasks as f64 * 100.0)
        } else {
            0.0
        }
    }
}

fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// A closed whitelist of (column, table) pairs eligible for distribution
/// computation. Every variant maps to a fixed literal SQL string; no
/// identifier is ever built from message data, so there is nothing here for
/// an attacker to reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Distribution {
    ExecutionTimeBucketTasks,
    GasUsedBucketTasks,
    ChainIdTasks,
    TaskTypeTasks,
    StepsComputedBucketInvoices,
    MemoryUsedBucketInvoices,
    ContinentBucketNodes,
    LocationBucketNodes,
}

impl Distribution {
    pub const ALL: [Distribution; 8] = [
        Distribution::ExecutionTimeBucketTasks,
        Distribution::GasUsedBucketTasks,
        Distribution::ChainIdTasks,
        Distribution::TaskTypeTasks,
        Distribution::StepsComputedBucketInvoices,
        Distribution::MemoryUsedBucketInvoices,
        Distribution::ContinentBucketNodes,
        Distribution::LocationBucketNodes,
    ];

    fn sql(self) -> &'static str {
        match self {
            Distribution::ExecutionTimeBucketTasks => {
                "SELECT execution_time_bucket, COUNT(*) FROM aggregated_tasks \
                 WHERE execution_time_bucket IS NOT NULL GROUP BY execution_time_bucket"
            }
            Distribution::GasUsedBucketTasks => {
                "SELECT gas_used_bucket, COUNT(*) FROM aggregated_tasks \
                 WHERE gas_used_bucket IS NOT NULL GROUP BY gas_used_bucket"
            }
            Distribution::ChainIdTasks => {
                "SELECT chain_id, COUNT(*) FROM aggregated_tasks \
                 WHERE chain_id IS NOT NULL GROUP BY chain_id"
            }
            Distribution::TaskTypeTasks => {
                "SELECT task_type, COUNT(*) FROM aggregated_tasks \
                 WHERE task_type IS NOT NULL GROUP BY task_type"
            }
            Distribution::StepsComputedBucketInvoices => {
                "SELECT steps_computed_bucket, COUNT(*) FROM aggregated_invoices \
                 WHERE steps_computed_bucket IS NOT NULL GROUP BY steps_computed_bucket"
            }
            Distribution::MemoryUsedBucketInvoices => {
                "SELECT memory_used_bucket, COUNT(*) FROM aggregated_invoices \
                 WHERE memory_used_bucket IS NOT NULL GROUP BY memory_used_bucket"
            }
            Distribution::ContinentBucketNodes => {
                "SELECT continent_bucket, COUNT(*) FROM active_nodes \
                 WHERE continent_bucket IS NOT NULL GROUP BY continent_bucket"
            }
            Distribution::LocationBucketNodes => {
                "SELECT location_bucket, COUNT(*) FROM active_nodes \
                 WHERE location_bucket IS NOT NULL GROUP BY location_bucket"
            }
        }
    }
}

impl Store {
    /// Computed with `now` as the reference instant so the 5-minute/24h
    /// windows are testable without a wall-clock dependency.
    pub async fn scalar_counts(&self, now: i64) -> StoreResult<ScalarCounts> {
        let conn = self.conn.lock().await;
        let active_since = now - FIVE_MINUTES_MS;
        let since_24h = now - TWENTY_FOUR_HOURS_MS;

        let active_nodes: i64 = conn.query_row(
            "SELECT COUNT(*) FROM active_nodes WHERE last_seen_at > ?1",
            params![active_since],
            |r| r.get(0),
        )?;
        let total_nodes: i64 = conn.query_row("SELECT COUNT(*) FROM active_nodes", [], |r| r.get(0))?;
        let total_tasks: i64 = conn.query_row("SELECT COUNT(*) FROM aggregated_tasks", [], |r| r.get(0))?;
        let completed_tasks: i64 = conn.query_row(
            "SELECT COUNT(*) FROM aggregated_tasks WHERE status = 'completed'",
            [],
            |r| r.get(0),
        )?;
        // Only an explicit success = 0 counts as failed, never an unset/null success.
        let failed_tasks: i64 = conn.query_row(
            "SELECT COUNT(*) FROM aggregated_tasks WHERE success = 0",
            [],
            |r| r.get(0),
        )?;
        let cached_tasks: i64 = conn.query_row(
            "SELECT COUNT(*) FROM aggregated_tasks WHERE cached = 1",
            [],
            |r| r.get(0),
        )?;
        let tasks_last_24h: i64 = conn.query_row(
            "SELECT COUNT(*) FROM aggregated_tasks WHERE first_seen_at > ?1",
            params![since_24h],
            |r| r.get(0),
        )?;
        let total_invoices: i64 =
            conn.query_row("SELECT COUNT(*) FROM aggregated_invoices", [], |r| r.get(0))?;
        let invoices_last_24h: i64 = conn.query_row(
            "SELECT COUNT(*) FROM aggregated_invoices WHERE first_seen_at > ?1",
            params![since_24h],
            |r| r.get(0),
        )?;

        Ok(ScalarCounts {
            active_nodes,
            total_nodes,
            total_tasks,
            completed_tasks,
            failed_tasks,
            cached_tasks,
            tasks_last_24h,
            total_invoices,
            invoices_last_24h,
        })
    }

    /// Always safe: `dist` is one of a fixed set of enum variants, never a
    /// value derived from inbound message data.
    pub async fn distribution(&self, dist: Distribution) -> StoreResult<BTreeMap<String, i64>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(dist.sql())?;
        let rows = stmt.query_map([], |row| {
            let key: String = row.get(0)?;
            let count: i64 = row.get(1)?;
            Ok((key, count))
        })?;
        let mut out = BTreeMap::new();
        for row in rows {
            let (key, count) = row?;
            out.insert(key, count);
        }
        Ok(out)
    }

    /// Append-only; records scalar fields only, no distributions.
    pub async fn insert_stats_history(&self, recorded_at: i64, counts: &ScalarCounts) -> StoreResult<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO network_stats_history
                (recorded_at, active_nodes, total_nodes, total_tasks, completed_tasks,
                 failed_tasks, cached_tasks, tasks_last_24h, total_invoices, invoices_last_24h,
                 success_rate, cache_hit_rate)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                recorded_at,
                counts.active_nodes,
                counts.total_nodes,
                counts.total_tasks,
                counts.completed_tasks,
                counts.failed_tasks,
                counts.cached_tasks,
                counts.tasks_last_24h,
                counts.total_invoices,
                counts.invoices_last_24h,
                counts.success_rate(),
                counts.cache_hit_rate(),
            ],
        )?;
        Ok(())
    }

    #[cfg(test)]
    pub(crate) async fn history_rows(&self) -> StoreResult<Vec<NetworkStatsHistoryRow>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT id, recorded_at, active_nodes, total_nodes, total_tasks, completed_tasks,
                    failed_tasks, cached_tasks, tasks_last_24h, total_invoices, invoices_last_24h,
                    success_rate, cache_hit_rate
             FROM network_stats_history ORDER BY id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(NetworkStatsHistoryRow {
                id: row.get(0)?,
                recorded_at: row.get(1)?,
                active_nodes: row.get(2)?,
                total_nodes: row.get(3)?,
                total_tasks: row.get(4)?,
                completed_tasks: row.get(5)?,
                failed_tasks: row.get(6)?,
                cached_tasks: row.get(7)?,
                tasks_last_24h: row.get(8)?,
                total_invoices: row.get(9)?,
                invoices_last_24h: row.get(10)?,
                success_rate: row.get(11)?,
                cache_hit_rate: row.get(12)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn single_completed_task_updates_counts_and_distribution() {
        let store = Store::open_in_memory().unwrap();
        store.upsert_task_received("aabbccdd", 1_000, Some("1"), Some("wasm")).await.unwrap();
        store
            .update_task_completed("aabbccdd", 1_500, Some(true), Some("100-500ms"), None, Some(false))
            .await
            .unwrap();

        let counts = store.scalar_counts(2_000).await.unwrap();
        assert_eq!(counts.total_tasks, 1);
        assert_eq!(counts.completed_tasks, 1);
        assert_eq!(counts.failed_tasks, 0);
        assert_eq!(counts.success_rate(), 100.0);

        let dist = store.distribution(Distribution::ExecutionTimeBucketTasks).await.unwrap();
        assert_eq!(dist.get("100-500ms"), Some(&1));
    }

    #[tokio::test]
    async fn node_drops_out_of_active_window_after_five_minutes() {
        let store = Store::open_in_memory().unwrap();
        let node = "node-00000000-0000-0000-0000-000000000001";
        store.upsert_heartbeat(node, 0, None, None, None, None, None).await.unwrap();

        let at_4min = store.scalar_counts(4 * 60 * 1_000).await.unwrap();
        assert_eq!(at_4min.active_nodes, 1);

        let at_6min = store.scalar_counts(6 * 60 * 1_000).await.unwrap();
        assert_eq!(at_6min.active_nodes, 0);
        assert_eq!(at_6min.total_nodes, 1);
    }

    #[tokio::test]
    async fn failed_tasks_excludes_null_success() {
        let store = Store::open_in_memory().unwrap();
        store.upsert_task_received("aabbccdd", 0, None, None).await.unwrap();
        store.upsert_task_received("eeff0011", 0, None, None).await.unwrap();
        store
            .update_task_completed("eeff0011", 10, Some(false), None, None, None)
            .await
            .unwrap();

        let counts = store.scalar_counts(100).await.unwrap();
        assert_eq!(counts.total_tasks, 2);
        assert_eq!(counts.failed_tasks, 1);
    }

    #[test]
    fn rounding_rounds_half_up_to_one_decimal_place() {
        assert_eq!(round_to_tenth(33.33333), 33.3);
        assert_eq!(round_to_tenth(66.66666), 66.7);
    }
}
