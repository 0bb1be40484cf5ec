mod burns;
mod cleanup;
mod error;
mod schema;
mod snapshot;
mod store;
mod tasks;

pub use error::{StoreError, StoreResult};
pub use snapshot::{Distribution, ScalarCounts};
pub use store::Store;
