use rusqlite::Connection;

use crate::error::StoreResult;

/// Creates every table used by the aggregator if it does not already exist.
///
/// Grounded in `task_manager::adv_sqlite::TaskDb::create_tables`: one
/// `execute_batch` of `CREATE TABLE IF NOT EXISTS` statements plus a
/// `metadata` key/value table for future migration bookkeeping.
pub fn create_tables(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS metadata(
            key   TEXT UNIQUE NOT NULL PRIMARY KEY,
            value TEXT
        );

        INSERT OR IGNORE INTO metadata(key, value) VALUES ('store_schema_version', '1');

        CREATE TABLE IF NOT EXISTS aggregated_tasks(
            task_id_hash          TEXT UNIQUE NOT NULL PRIMARY KEY,
            first_seen_at         INTEGER NOT NULL,
            last_seen_at          INTEGER NOT NULL,
            chain_id              TEXT,
            task_type             TEXT,
            status                TEXT NOT NULL,
            success               INTEGER,
            execution_time_bucket TEXT,
            gas_used_bucket       TEXT,
            cached                INTEGER,
            reporting_nodes       INTEGER NOT NULL DEFAULT 1
        );

        CREATE TABLE IF NOT EXISTS aggregated_invoices(
            invoice_id_hash       TEXT UNIQUE NOT NULL PRIMARY KEY,
            task_id_hash          TEXT,
            first_seen_at         INTEGER NOT NULL,
            last_seen_at          INTEGER NOT NULL,
            chain_id              TEXT,
            steps_computed_bucket TEXT,
            memory_used_bucket    TEXT,
            operation             TEXT,
            reporting_nodes       INTEGER NOT NULL DEFAULT 1
        );

        CREATE TABLE IF NOT EXISTS active_nodes(
            node_id             TEXT UNIQUE NOT NULL PRIMARY KEY,
            first_seen_at       INTEGER NOT NULL,
            last_seen_at        INTEGER NOT NULL,
            status              TEXT,
            total_tasks_bucket  TEXT,
            active_tasks_bucket TEXT,
            continent_bucket    TEXT,
            location_bucket     TEXT,
            heartbeat_count     INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS network_stats_history(
            id               INTEGER PRIMARY KEY AUTOINCREMENT,
            recorded_at      INTEGER NOT NULL,
            active_nodes     INTEGER NOT NULL,
            total_nodes      INTEGER NOT NULL,
            total_tasks      INTEGER NOT NULL,
            completed_tasks  INTEGER NOT NULL,
            failed_tasks     INTEGER NOT NULL,
            cached_tasks     INTEGER NOT NULL,
            tasks_last_24h   INTEGER NOT NULL,
            total_invoices   INTEGER NOT NULL,
            invoices_last_24h INTEGER NOT NULL,
            success_rate     REAL NOT NULL,
            cache_hit_rate   REAL NOT NULL
        );

        CREATE TABLE IF NOT EXISTS tru_burns(
            tx_hash          TEXT NOT NULL,
            log_index        INTEGER NOT NULL,
            block_number     INTEGER NOT NULL,
            timestamp_ms     INTEGER NOT NULL,
            from_address     TEXT NOT NULL,
            to_address       TEXT NOT NULL,
            amount           TEXT NOT NULL,
            amount_formatted REAL NOT NULL,
            burn_type        TEXT,
            PRIMARY KEY (tx_hash, log_index)
        );

        CREATE TABLE IF NOT EXISTS burn_sync_state(
            id           INTEGER PRIMARY KEY CHECK (id = 1),
            last_block   INTEGER NOT NULL DEFAULT 0,
            total_burns  INTEGER NOT NULL DEFAULT 0,
            last_sync_at INTEGER
        );

        INSERT OR IGNORE INTO burn_sync_state(id, last_block, total_burns, last_sync_at)
        VALUES (1, 0, 0, NULL);

        CREATE INDEX IF NOT EXISTS idx_tasks_last_seen ON aggregated_tasks(last_seen_at);
        CREATE INDEX IF NOT EXISTS idx_invoices_last_seen ON aggregated_invoices(last_seen_at);
        CREATE INDEX IF NOT EXISTS idx_stats_history_recorded_at ON network_stats_history(recorded_at);
        "#,
    )?;
    Ok(())
}

/// Tolerates schema drift on an existing database file by attempting to add
/// columns that may be missing from an older version, ignoring the failure
/// when a column already exists.
pub fn migrate(conn: &Connection) -> StoreResult<()> {
    let add_column_attempts = [
        ("aggregated_tasks", "reporting_nodes", "INTEGER NOT NULL DEFAULT 1"),
        ("aggregated_invoices", "reporting_nodes", "INTEGER NOT NULL DEFAULT 1"),
        ("active_nodes", "heartbeat_count", "INTEGER NOT NULL DEFAULT 0"),
    ];
    for (table, column, definition) in add_column_attempts {
        let sql = format!("ALTER TABLE {table} ADD COLUMN {column} {definition}");
        // An error here almost always means the column already exists; any
        // genuine failure will surface again on the next real query against
        // the table, so it is safe to swallow at migration time.
        let _ = conn.execute(&sql, []);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_tables_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        create_tables(&conn).unwrap();
        migrate(&conn).unwrap();
    }
}
