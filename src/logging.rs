use tracing_subscriber::{EnvFilter, fmt};

/// Install the stderr subscriber.
///
/// Filtering comes from `RUST_LOG` when set, otherwise `default_level`.
/// Report output goes to stdout, so logs never interleave with it.
pub fn init_logging(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
