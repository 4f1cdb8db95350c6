use tracing_subscriber::{fmt, EnvFilter};

/// Install the console subscriber
///
/// `RUST_LOG` wins when set; otherwise everything at `info` and above.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // A second init (e.g. from tests) keeps the first subscriber
    let _ = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
