use std::path::Path;

use rusqlite::Connection;
use tokio::sync::Mutex;

use crate::error::{StoreError, StoreResult};
use crate::schema;

/// The Persistent Store.
///
/// A single WAL-mode SQLite connection, exclusively owned by this process for
/// its lifetime. Grounded in `task_manager::adv_sqlite::TaskDb`: the same
/// `open_or_create`/pragma setup, wrapped in an async-friendly mutex the way
/// `reqactor::Actor` wraps its pool (`Arc<Mutex<Pool>>`) so handlers, the
/// rollup publisher, the cleanup task and the burn monitor can all reach it
/// from independent tokio tasks while every write stays serialized.
pub struct Store {
    pub(crate) conn: Mutex<Connection>,
}

impl Store {
    /// Opens the store file at `path`, creating it and its schema if
    /// missing, and applies the tolerant column migration either way.
    pub fn open_or_create(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(StoreError::Open)?;
            }
        }

        let conn = Connection::open(path)?;
        Self::configure(&conn)?;
        schema::create_tables(&conn)?;
        schema::migrate(&conn)?;

        Ok(Self { conn: Mutex::new(conn) })
    }

    /// An in-memory store for tests, with the same schema and pragmas.
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::configure(&conn)?;
        schema::create_tables(&conn)?;
        schema::migrate(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn configure(conn: &Connection) -> StoreResult<()> {
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "foreign_keys", true)?;
        conn.pragma_update(None, "temp_store", "MEMORY")?;
        Ok(())
    }

    /// Flushes the WAL into the main database file. Called during graceful
    /// shutdown before the connection is dropped.
    pub async fn checkpoint(&self) -> StoreResult<()> {
        let conn = self.conn.lock().await;
        conn.pragma_update(None, "wal_checkpoint", "TRUNCATE")?;
        Ok(())
    }
}
