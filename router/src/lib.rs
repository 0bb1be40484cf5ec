mod dispatch;
mod error;
mod subject;

pub use dispatch::handle_message;
pub use error::RouterError;
pub use subject::{Subject, STATS_AGGREGATED_SUBJECT};
