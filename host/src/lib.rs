pub mod error;
pub mod logging;
pub mod periodic;

pub use error::{AggregatorError, AggregatorResult};
pub use logging::subscribe_log;
