use std::path::PathBuf;

use clap::Parser;
use serde::{Deserialize, Serialize};

fn default_nats_url() -> String {
    "wss://localhost:4223".to_string()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("/data/aggregator.db")
}

fn default_publish_interval() -> u64 {
    30_000
}

fn default_cleanup_interval() -> u64 {
    86_400_000
}

fn default_retention_days() -> u32 {
    30
}

fn default_rate_limit_per_node() -> u32 {
    10
}

fn default_rate_limit_window() -> u64 {
    1_000
}

fn default_global_rate_limit() -> u32 {
    1_000
}

fn default_indexer_base_url() -> String {
    "https://indexer.example.com/api/v2".to_string()
}

fn default_tru_contract() -> String {
    "0x0000000000000000000000000000000000000000".to_string()
}

fn default_burn_sync_interval() -> u64 {
    300_000
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Process configuration, read from the environment.
///
/// Everything but the NATS credentials has a default suitable for local
/// development; production deployments should override the broker
/// credentials and storage path.
#[derive(Clone, Serialize, Deserialize, Debug, Parser)]
#[command(name = "federation-aggregator", about = "TrueBit federation stats aggregator", long_about = None)]
#[serde(default)]
pub struct Config {
    /// Pub/sub broker URL.
    #[arg(long, env = "NATS_URL", default_value = "wss://localhost:4223")]
    #[serde(default = "default_nats_url")]
    pub nats_url: String,

    /// Pub/sub username.
    #[arg(long, env = "NATS_USER", default_value = "")]
    #[serde(default)]
    pub nats_user: String,

    /// Pub/sub password. Must be supplied for production.
    #[arg(long, env = "NATS_AGGREGATOR_PASSWORD", default_value = "")]
    #[serde(default)]
    pub nats_password: String,

    /// Path to the embedded relational store file.
    #[arg(long, env = "DB_PATH", default_value = "/data/aggregator.db")]
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Rollup cadence, ms.
    #[arg(long, env = "PUBLISH_INTERVAL", default_value = "30000")]
    #[serde(default = "default_publish_interval")]
    pub publish_interval_ms: u64,

    /// Cleanup cadence, ms.
    #[arg(long, env = "CLEANUP_INTERVAL", default_value = "86400000")]
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_ms: u64,

    /// History retention, days.
    #[arg(long, env = "RETENTION_DAYS", default_value = "30")]
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,

    /// Per-reporter rate-limit budget, messages per window.
    #[arg(long, env = "RATE_LIMIT_PER_NODE", default_value = "10")]
    #[serde(default = "default_rate_limit_per_node")]
    pub rate_limit_per_node: u32,

    /// Rate-limit window width, ms.
    #[arg(long, env = "RATE_LIMIT_WINDOW", default_value = "1000")]
    #[serde(default = "default_rate_limit_window")]
    pub rate_limit_window_ms: u64,

    /// Global rate-limit budget, messages per window.
    #[arg(long, env = "GLOBAL_RATE_LIMIT", default_value = "1000")]
    #[serde(default = "default_global_rate_limit")]
    pub global_rate_limit: u32,

    /// Base URL of the external token-transfer indexer.
    #[arg(long, env = "INDEXER_BASE_URL", default_value = "https://indexer.example.com/api/v2")]
    #[serde(default = "default_indexer_base_url")]
    pub indexer_base_url: String,

    /// TRU ERC-20 contract address used to filter indexer queries.
    #[arg(long, env = "TRU_CONTRACT_ADDRESS", default_value = "0x0000000000000000000000000000000000000000")]
    #[serde(default = "default_tru_contract")]
    pub tru_contract_address: String,

    /// Burn-sync cadence, ms.
    #[arg(long, env = "BURN_SYNC_INTERVAL", default_value = "300000")]
    #[serde(default = "default_burn_sync_interval")]
    pub burn_sync_interval_ms: u64,

    /// Tracing filter / log level.
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            nats_url: default_nats_url(),
            nats_user: String::new(),
            nats_password: String::new(),
            db_path: default_db_path(),
            publish_interval_ms: default_publish_interval(),
            cleanup_interval_ms: default_cleanup_interval(),
            retention_days: default_retention_days(),
            rate_limit_per_node: default_rate_limit_per_node(),
            rate_limit_window_ms: default_rate_limit_window(),
            global_rate_limit: default_global_rate_limit(),
            indexer_base_url: default_indexer_base_url(),
            tru_contract_address: default_tru_contract(),
            burn_sync_interval_ms: default_burn_sync_interval(),
            log_level: default_log_level(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.publish_interval_ms, 30_000);
        assert_eq!(config.cleanup_interval_ms, 86_400_000);
        assert_eq!(config.retention_days, 30);
        assert_eq!(config.rate_limit_per_node, 10);
        assert_eq!(config.rate_limit_window_ms, 1_000);
        assert_eq!(config.global_rate_limit, 1_000);
        assert_eq!(config.burn_sync_interval_ms, 300_000);
    }
}
