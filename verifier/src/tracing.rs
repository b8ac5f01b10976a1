use tracing_subscriber::{prelude::*, util::SubscriberInitExt, EnvFilter};

/// Logs to stderr, leaving stdout to the report. Records emitted through the
/// `log` facade by the library crates are forwarded as well.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::Registry::default()
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(std::io::stderr)
                .with_filter(filter),
        )
        .init();
}
