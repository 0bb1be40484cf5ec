/// Errors surfaced by the Burn Monitor.
#[derive(Debug, thiserror::Error)]
pub enum BurnError {
    #[error("indexer request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("failed to decode indexer response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid amount {0:?}: {1}")]
    InvalidAmount(String, String),

    #[error("invalid timestamp {0:?}")]
    InvalidTimestamp(String),
}

pub type BurnResult<T> = Result<T, BurnError>;
