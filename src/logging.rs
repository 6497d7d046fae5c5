//! Tracing subscriber setup for the CLI.

use tracing_subscriber::EnvFilter;

/// Installs a stderr `fmt` subscriber.
///
/// `RUST_LOG` wins when set; otherwise the crate logs at `info`, or `debug`
/// when `debug` is true. Calling this twice is harmless.
pub fn init_logging(debug: bool) {
    let default_filter = if debug { "autoguru=debug" } else { "autoguru=info" };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
