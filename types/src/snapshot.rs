use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The burn-activity block attached to a published snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BurnSnapshot {
    pub total_burned: f64,
    pub burn_count: i64,
    pub last_24h_burned: f64,
    pub last_7d_burned: f64,
    pub last_burn_timestamp: Option<i64>,
    pub last_burn_tx_hash: Option<String>,
}

/// The scalar + distribution payload of a published snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct NetworkStatsData {
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
    pub execution_time_distribution: BTreeMap<String, i64>,
    pub gas_used_distribution: BTreeMap<String, i64>,
    pub chain_id_distribution: BTreeMap<String, i64>,
    pub task_type_distribution: BTreeMap<String, i64>,
    pub steps_computed_distribution: BTreeMap<String, i64>,
    pub memory_used_distribution: BTreeMap<String, i64>,
    pub continent_distribution: BTreeMap<String, i64>,
    pub location_distribution: BTreeMap<String, i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tru_burns: Option<BurnSnapshot>,
}

/// The outbound envelope published on `truebit.stats.aggregated`. Field names are part of the wire contract and must stay stable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkStatsSnapshot {
    pub version: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub timestamp: String,
    pub data: NetworkStatsData,
}

impl NetworkStatsSnapshot {
    pub fn new(timestamp: String, data: NetworkStatsData) -> Self {
        Self {
            version: "1.0".to_string(),
            kind: "network_stats".to_string(),
            timestamp,
            data,
        }
    }
}
