//! Diagnostic logging setup
//!
//! `RUNNEL_LOG` overrides the filter (e.g. `runnel_core=debug`). Logs go to
//! stderr so they never interleave with task output on stdout.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Environment variable holding the log filter
pub const LOG_ENV: &str = "RUNNEL_LOG";

pub fn init(verbose: bool) {
    let env_filter = if verbose {
        EnvFilter::new("runnel_core=debug,runnel=debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .without_time()
        .with_ansi(true);

    // Ignore a second initialization (e.g. from tests)
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .try_init();
}
