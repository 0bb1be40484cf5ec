use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Structured stdout logging, grounded in `subscribe_log` in
/// `host/src/bin/main.rs`: an `EnvFilter` built from the configured
/// log level (falling back to `info` on a bad filter string) feeding a
/// single `fmt` layer. The Aggregator has no per-request billing log, so
/// there is no second file-backed layer to add.
pub fn subscribe_log(log_level: &str) {
    let env_filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let stdout_layer = fmt::layer().with_ansi(true).with_filter(env_filter);
    tracing_subscriber::registry().with(stdout_layer).init();
}
