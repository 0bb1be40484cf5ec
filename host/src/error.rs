/// The top-level error type for the Aggregator process, aggregating every
/// sub-crate's error enum. Variants surfaced here are the ones that abort
/// startup and cause `main` to return `Err` and exit non-zero; everything
/// else is caught at the boundary of a handler or periodic tick and logged
/// without propagating here.
#[derive(Debug, thiserror::Error)]
pub enum AggregatorError {
    #[error("failed to open the persistent store: {0}")]
    Store(#[from] aggregator_store::StoreError),

    #[error("failed to connect to the pub/sub broker: {0}")]
    Broker(#[from] async_nats::ConnectError),

    #[error("failed to subscribe to {subject}: {source}")]
    Subscribe { subject: String, source: async_nats::SubscribeError },

    #[error("there was an I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("there was an unexpected error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

pub type AggregatorResult<T> = Result<T, AggregatorError>;
