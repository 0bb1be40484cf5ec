use aggregator_types::{BurnSyncState, TruBurn};
use rusqlite::params;

use crate::error::StoreResult;
use crate::store::Store;

impl Store {
    /// Loaded once at startup into the Burn Monitor's in-memory map.
    pub async fn load_burns(&self) -> StoreResult<(Vec<TruBurn>, BurnSyncState)> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT tx_hash, log_index, block_number, timestamp_ms, from_address,
                    to_address, amount, amount_formatted, burn_type
             FROM tru_burns",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(TruBurn {
                tx_hash: row.get(0)?,
                log_index: row.get(1)?,
                block_number: row.get(2)?,
                timestamp_ms: row.get(3)?,
                from_address: row.get(4)?,
                to_address: row.get(5)?,
                amount: row.get(6)?,
                amount_formatted: row.get(7)?,
                burn_type: row.get(8)?,
            })
        })?;
        let burns = rows.collect::<Result<Vec<_>, _>>()?;

        let state = conn.query_row(
            "SELECT last_block, total_burns, last_sync_at FROM burn_sync_state WHERE id = 1",
            [],
            |row| {
                Ok(BurnSyncState {
                    last_block: row.get(0)?,
                    total_burns: row.get(1)?,
                    last_sync_at: row.get(2)?,
                })
            },
        )?;

        Ok((burns, state))
    }

    /// Inserts new burns; duplicates are silently ignored. Returns the
    /// number actually inserted.
    pub async fn insert_burns(&self, burns: &[TruBurn]) -> StoreResult<usize> {
        let conn = self.conn.lock().await;
        let mut inserted = 0;
        for burn in burns {
            let changed = conn.execute(
                "INSERT INTO tru_burns
                    (tx_hash, log_index, block_number, timestamp_ms, from_address,
                     to_address, amount, amount_formatted, burn_type)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                 ON CONFLICT(tx_hash, log_index) DO NOTHING",
                params![
                    burn.tx_hash,
                    burn.log_index,
                    burn.block_number,
                    burn.timestamp_ms,
                    burn.from_address,
                    burn.to_address,
                    burn.amount,
                    burn.amount_formatted,
                    burn.burn_type,
                ],
            )?;
            inserted += changed;
        }
        Ok(inserted)
    }

    pub async fn update_burn_sync_state(&self, last_block: i64, total_burns: i64, now: i64) -> StoreResult<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "UPDATE burn_sync_state SET last_block = ?1, total_burns = ?2, last_sync_at = ?3 WHERE id = 1",
            params![last_block, total_burns, now],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn burn(tx_hash: &str, log_index: i64, block_number: i64) -> TruBurn {
        TruBurn {
            tx_hash: tx_hash.to_string(),
            log_index,
            block_number,
            timestamp_ms: block_number * 1_000,
            from_address: "0xabc".to_string(),
            to_address: "0x000000000000000000000000000000000000dead".to_string(),
            amount: "1000000000000000000".to_string(),
            amount_formatted: 1.0,
            burn_type: Some("dead".to_string()),
        }
    }

    #[tokio::test]
    async fn load_burns_starts_empty_with_zeroed_state() {
        let store = Store::open_in_memory().unwrap();
        let (burns, state) = store.load_burns().await.unwrap();
        assert!(burns.is_empty());
        assert_eq!(state, BurnSyncState::default());
    }

    #[tokio::test]
    async fn inserting_the_same_burn_twice_is_idempotent() {
        let store = Store::open_in_memory().unwrap();
        let b = burn("0xdeadbeef", 0, 10);

        let first = store.insert_burns(&[b.clone()]).await.unwrap();
        let second = store.insert_burns(&[b]).await.unwrap();

        assert_eq!(first, 1);
        assert_eq!(second, 0);
        let (burns, _) = store.load_burns().await.unwrap();
        assert_eq!(burns.len(), 1);
    }

    #[tokio::test]
    async fn sync_state_round_trips() {
        let store = Store::open_in_memory().unwrap();
        store.update_burn_sync_state(20, 2, 12345).await.unwrap();
        let (_, state) = store.load_burns().await.unwrap();
        assert_eq!(state, BurnSyncState { last_block: 20, total_burns: 2, last_sync_at: Some(12345) });
    }
}
