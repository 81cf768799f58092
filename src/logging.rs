//! Diagnostic logging setup.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

/// Environment variable holding an `EnvFilter` directive, e.g. `foldersort=debug`.
pub const LOG_ENV: &str = "FOLDERSORT_LOG";

/// Installs a stderr `tracing` subscriber.
///
/// `FOLDERSORT_LOG` wins when set; otherwise `verbose` selects `debug`
/// and the default is `error`. Calling this twice is harmless.
pub fn init_logger(verbose: bool) {
    let default_level = if verbose { "debug" } else { "error" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .without_time(),
        )
        .with(filter)
        .try_init();
}
