use tracing_subscriber::{fmt, EnvFilter};

/// Install the global tracing subscriber. Honors `RUST_LOG`, defaulting to
/// `info` so backfill progress is visible during maintenance runs.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
