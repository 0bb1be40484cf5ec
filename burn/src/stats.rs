use std::collections::HashMap;

use aggregator_types::{BurnSnapshot, TruBurn};
use alloy_primitives::U256;

use crate::amount::{format_amount, parse_amount};
use crate::error::BurnResult;

const TWENTY_FOUR_HOURS_MS: i64 = 24 * 60 * 60 * 1_000;
const SEVEN_DAYS_MS: i64 = 7 * 24 * 60 * 60 * 1_000;

/// Aggregates the in-memory burn map into the snapshot published alongside
/// the rollup, evaluated relative to `now`. An empty set of burns still
/// yields a zeroed snapshot rather than an error.
pub fn compute_snapshot<'a>(burns: impl Iterator<Item = &'a TruBurn>, now: i64) -> BurnResult<BurnSnapshot> {
    let mut total = U256::ZERO;
    let mut burn_count = 0i64;
    let mut last_24h = 0.0;
    let mut last_7d = 0.0;
    let mut last_burn: Option<&TruBurn> = None;

    for burn in burns {
        total = total
            .checked_add(parse_amount(&burn.amount)?)
            .unwrap_or(total);
        burn_count += 1;

        if now - burn.timestamp_ms <= TWENTY_FOUR_HOURS_MS {
            last_24h += burn.amount_formatted;
        }
        if now - burn.timestamp_ms <= SEVEN_DAYS_MS {
            last_7d += burn.amount_formatted;
        }

        last_burn = match last_burn {
            Some(current) if current.block_number >= burn.block_number => Some(current),
            _ => Some(burn),
        };
    }

    Ok(BurnSnapshot {
        total_burned: format_amount(total),
        burn_count,
        last_24h_burned: last_24h,
        last_7d_burned: last_7d,
        last_burn_timestamp: last_burn.map(|b| b.timestamp_ms),
        last_burn_tx_hash: last_burn.map(|b| b.tx_hash.clone()),
    })
}

/// One rank in the burn leaderboard.
#[derive(Debug, Clone, PartialEq)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub from_address: String,
    pub total_burned: f64,
}

/// Groups burns by `from`, sums `amount` as a big integer, orders
/// descending, and breaks ties by first occurrence (stable sort). Returns at
/// most `top_k` entries.
pub fn leaderboard<'a>(burns: impl Iterator<Item = &'a TruBurn>, top_k: usize) -> BurnResult<Vec<LeaderboardEntry>> {
    let mut order: Vec<String> = Vec::new();
    let mut totals: HashMap<String, U256> = HashMap::new();

    for burn in burns {
        let amount = parse_amount(&burn.amount)?;
        totals
            .entry(burn.from_address.clone())
            .and_modify(|t| *t = t.checked_add(amount).unwrap_or(*t))
            .or_insert_with(|| {
                order.push(burn.from_address.clone());
                amount
            });
    }

    let mut entries: Vec<(String, U256)> =
        order.into_iter().map(|addr| (addr.clone(), totals[&addr])).collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1));

    Ok(entries
        .into_iter()
        .take(top_k)
        .enumerate()
        .map(|(i, (from_address, total))| LeaderboardEntry {
            rank: i + 1,
            from_address,
            total_burned: format_amount(total),
        })
        .collect())
}

/// One day of the burn activity chart.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyChartPoint {
    pub date: String,
    pub daily_burned: f64,
    pub cumulative_burned: f64,
}

/// Buckets burns by UTC calendar day and computes the running cumulative
/// total, ordered by date ascending.
pub fn daily_chart<'a>(burns: impl Iterator<Item = &'a TruBurn>) -> Vec<DailyChartPoint> {
    let mut by_day: std::collections::BTreeMap<String, f64> = std::collections::BTreeMap::new();
    for burn in burns {
        let date = day_bucket(burn.timestamp_ms);
        *by_day.entry(date).or_insert(0.0) += burn.amount_formatted;
    }

    let mut cumulative = 0.0;
    by_day
        .into_iter()
        .map(|(date, daily_burned)| {
            cumulative += daily_burned;
            DailyChartPoint { date, daily_burned, cumulative_burned: cumulative }
        })
        .collect()
}

fn day_bucket(timestamp_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(timestamp_ms)
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "1970-01-01".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn burn(from: &str, tx: &str, block: i64, ts: i64, amount: &str) -> TruBurn {
        TruBurn {
            tx_hash: tx.to_string(),
            log_index: 0,
            block_number: block,
            timestamp_ms: ts,
            from_address: from.to_string(),
            to_address: "0x000000000000000000000000000000000000dead".to_string(),
            amount: amount.to_string(),
            amount_formatted: amount.parse::<f64>().unwrap_or(0.0) / 1e18,
            burn_type: Some("dead".to_string()),
        }
    }

    #[test]
    fn snapshot_totals_match_two_transfers_across_windows() {
        let burns = vec![
            burn("0xa", "0x1", 10, 0, "1000000000000000000"),
            burn("0xb", "0x2", 20, 0, "2500000000000000000"),
        ];
        let snapshot = compute_snapshot(burns.iter(), 0).unwrap();
        assert_eq!(snapshot.burn_count, 2);
        assert_eq!(snapshot.total_burned, 3.5);
        assert_eq!(snapshot.last_burn_tx_hash.as_deref(), Some("0x2"));
    }

    #[test]
    fn leaderboard_orders_by_total_with_stable_ties() {
        let burns = vec![
            burn("0xb", "0x1", 1, 0, "1000000000000000000"),
            burn("0xa", "0x2", 2, 0, "1000000000000000000"),
            burn("0xb", "0x3", 3, 0, "1000000000000000000"),
        ];
        let board = leaderboard(burns.iter(), 10).unwrap();
        assert_eq!(board[0].from_address, "0xb");
        assert_eq!(board[0].rank, 1);
        assert_eq!(board[0].total_burned, 2.0);
        assert_eq!(board[1].from_address, "0xa");
    }

    #[test]
    fn daily_chart_accumulates_ascending_by_date() {
        let day_ms = 24 * 60 * 60 * 1_000;
        let burns = vec![
            burn("0xa", "0x1", 1, 0, "1000000000000000000"),
            burn("0xa", "0x2", 2, day_ms, "1000000000000000000"),
        ];
        let chart = daily_chart(burns.iter());
        assert_eq!(chart.len(), 2);
        assert_eq!(chart[0].daily_burned, 1.0);
        assert_eq!(chart[1].cumulative_burned, 2.0);
    }
}
