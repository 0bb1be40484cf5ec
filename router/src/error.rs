/// Errors a handler can propagate once validation and rate limiting have
/// already passed. Validation and rate-limit drops are not represented
/// here — they are logged and swallowed at the point of rejection, never
/// surfaced as an `Err`.
#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    #[error("store operation failed: {0}")]
    Store(#[from] aggregator_store::StoreError),

    #[error("message payload was not valid JSON: {0}")]
    MalformedPayload(#[from] serde_json::Error),
}
