use serde::{Deserialize, Serialize};

/// Lifecycle status of an [`AggregatedTask`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Received,
    Completed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Received => "received",
            TaskStatus::Completed => "completed",
        }
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "received" => Ok(TaskStatus::Received),
            "completed" => Ok(TaskStatus::Completed),
            other => Err(format!("unknown task status: {other}")),
        }
    }
}

/// A logical task observed by one or more reporters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedTask {
    pub task_id_hash: String,
    pub first_seen_at: i64,
    pub last_seen_at: i64,
    pub chain_id: Option<String>,
    pub task_type: Option<String>,
    pub status: TaskStatus,
    pub success: Option<bool>,
    pub execution_time_bucket: Option<String>,
    pub gas_used_bucket: Option<String>,
    pub cached: Option<bool>,
    pub reporting_nodes: i64,
}

/// A logical invoice keyed by federation-salted hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedInvoice {
    pub invoice_id_hash: String,
    pub task_id_hash: Option<String>,
    pub first_seen_at: i64,
    pub last_seen_at: i64,
    pub chain_id: Option<String>,
    pub steps_computed_bucket: Option<String>,
    pub memory_used_bucket: Option<String>,
    pub operation: Option<String>,
    pub reporting_nodes: i64,
}

/// A reporter currently or previously online.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveNode {
    pub node_id: String,
    pub first_seen_at: i64,
    pub last_seen_at: i64,
    pub status: Option<String>,
    pub total_tasks_bucket: Option<String>,
    pub active_tasks_bucket: Option<String>,
    pub continent_bucket: Option<String>,
    pub location_bucket: Option<String>,
    pub heartbeat_count: i64,
}

/// A single row of the append-only stats history ring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkStatsHistoryRow {
    pub id: i64,
    pub recorded_at: i64,
    pub active_nodes: i64,
    pub total_nodes: i64,
    pub total_tasks: i64,
    pub completed_tasks: i64,
    pub failed_tasks: i64,
    pub cached_tasks: i64,
    pub tasks_last_24h: i64,
    pub total_invoices: i64,
    pub invoices_last_24h: i64,
    pub success_rate: f64,
    pub cache_hit_rate: f64,
}

/// One observed ERC-20 Transfer-to-burn-address event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TruBurn {
    pub tx_hash: String,
    pub log_index: i64,
    pub block_number: i64,
    pub timestamp_ms: i64,
    pub from_address: String,
    pub to_address: String,
    /// Decimal string, arbitrary precision.
    pub amount: String,
    pub amount_formatted: f64,
    pub burn_type: Option<String>,
}

/// The burn-sync cursor, a single row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct BurnSyncState {
    pub last_block: i64,
    pub total_burns: i64,
    pub last_sync_at: Option<i64>,
}
