use std::collections::HashMap;
use std::time::Duration;

use aggregator_types::{BurnSyncState, TruBurn};

use crate::amount::{format_amount, parse_amount};
use crate::client::{IndexerClient, TransferItem};
use crate::error::{BurnError, BurnResult};

/// The fixed set of monitored burn addresses: the zero address and the
/// conventional "dead" address, each tagged with the `burnType` recorded
/// alongside matching events.
const BURN_ADDRESSES: [(&str, Option<&str>); 2] = [
    ("0x0000000000000000000000000000000000000000", None),
    ("0x000000000000000000000000000000000000dEaD", Some("dead")),
];

/// Owns the in-memory burn map and sync cursor. A single component reads
/// and writes this state; the Rollup Publisher only reads a snapshot of it.
pub struct BurnMonitor {
    client: IndexerClient,
    burns: HashMap<(String, i64), TruBurn>,
    state: BurnSyncState,
}

impl BurnMonitor {
    pub fn new(client: IndexerClient, burns: Vec<TruBurn>, state: BurnSyncState) -> Self {
        let burns = burns.into_iter().map(|b| ((b.tx_hash.clone(), b.log_index), b)).collect();
        Self { client, burns, state }
    }

    pub fn state(&self) -> BurnSyncState {
        self.state
    }

    pub fn burns(&self) -> impl Iterator<Item = &TruBurn> {
        self.burns.values()
    }

    /// Runs one pass over every burn address, merges genuinely new events
    /// into the in-memory map, advances the cursor, and returns the events
    /// the caller should persist. Calling this repeatedly with the same
    /// upstream data is a no-op after the first call.
    pub async fn sync_pass(&mut self, now: i64) -> Vec<TruBurn> {
        let mut discovered = Vec::new();
        let mut max_block = self.state.last_block;

        for (address, burn_type) in BURN_ADDRESSES {
            match self.sync_address(address, burn_type).await {
                Ok(events) => {
                    for event in events {
                        let key = (event.tx_hash.clone(), event.log_index);
                        if self.burns.contains_key(&key) {
                            continue;
                        }
                        max_block = max_block.max(event.block_number);
                        self.burns.insert(key, event.clone());
                        discovered.push(event);
                    }
                }
                Err(err) => {
                    tracing::warn!(address, error = %err, "burn sync failed for address, retrying next tick");
                }
            }
        }

        if max_block > self.state.last_block || !discovered.is_empty() {
            self.state = BurnSyncState {
                last_block: max_block,
                total_burns: self.burns.len() as i64,
                last_sync_at: Some(now),
            };
        } else {
            self.state.last_sync_at = Some(now);
        }

        discovered
    }

    async fn sync_address(&self, address: &str, burn_type: Option<&str>) -> BurnResult<Vec<TruBurn>> {
        let mut events = Vec::new();
        let mut page_params = None;

        loop {
            let Some(page) = self.client.fetch_page(address, page_params.as_ref()).await? else {
                // Non-2xx: stop this address only, retried next tick.
                break;
            };

            let mut hit_known_block = false;
            for item in &page.items {
                if !item.to.hash.eq_ignore_ascii_case(address) {
                    continue;
                }
                if item.block_number <= self.state.last_block {
                    hit_known_block = true;
                    continue;
                }
                events.push(transfer_to_burn(item, burn_type)?);
            }

            if hit_known_block {
                // Earlier history is already persisted.
                break;
            }

            match page.next_page_params {
                Some(next) => {
                    page_params = Some(next);
                    tokio::time::sleep(Duration::from_millis(200)).await;
                }
                None => break,
            }
        }

        Ok(events)
    }
}

fn transfer_to_burn(item: &TransferItem, burn_type: Option<&str>) -> BurnResult<TruBurn> {
    let amount = parse_amount(&item.total.value)?;
    Ok(TruBurn {
        tx_hash: item.transaction_hash.clone(),
        log_index: item.log_index,
        block_number: item.block_number,
        timestamp_ms: parse_iso8601_ms(&item.timestamp)?,
        from_address: item.from.hash.clone(),
        to_address: item.to.hash.clone(),
        amount: item.total.value.clone(),
        amount_formatted: format_amount(amount),
        burn_type: burn_type.map(str::to_string),
    })
}

fn parse_iso8601_ms(s: &str) -> BurnResult<i64> {
    chrono::DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.timestamp_millis())
        .map_err(|_| BurnError::InvalidTimestamp(s.to_string()))
}
