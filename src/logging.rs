use std::io;
use std::sync::Once;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

static TRACING_INIT: Once = Once::new();

/// Install the global `tracing` subscriber, writing to stderr.
///
/// Safe to call more than once; only the first call has any effect. An
/// unparsable `filter` falls back to `warn`.
pub fn init(filter: &str) {
    TRACING_INIT.call_once(|| {
        let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("warn"));
        let installed = tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(io::stderr)
                    .with_target(true)
                    .with_level(true),
            )
            .with(filter)
            .try_init();
        if let Err(error) = installed {
            eprintln!("warning: could not install tracing subscriber: {}", error);
        }
    });
}
