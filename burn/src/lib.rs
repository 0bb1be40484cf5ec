mod amount;
mod client;
mod error;
mod stats;
mod sync;

pub use amount::{format_amount, parse_amount, sum_amounts};
pub use client::{IndexerClient, PageParams};
pub use error::{BurnError, BurnResult};
pub use stats::{compute_snapshot, daily_chart, leaderboard, DailyChartPoint, LeaderboardEntry};
pub use sync::BurnMonitor;
