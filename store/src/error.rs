/// Errors surfaced by the persistent store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to open the store file: {0}")]
    Open(#[source] std::io::Error),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;
