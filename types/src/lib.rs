pub mod config;
pub mod entities;
pub mod envelope;
pub mod snapshot;

pub use config::Config;
pub use entities::*;
pub use envelope::InboundEnvelope;
pub use snapshot::{BurnSnapshot, NetworkStatsSnapshot};
