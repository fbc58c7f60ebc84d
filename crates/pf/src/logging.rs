//! Diagnostic logging to stderr.
//!
//! Stdout carries the converted JSON, so every log line goes to stderr.

use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Environment variable holding `EnvFilter` directives for pf.
pub const LOG_ENV: &str = "PF_LOG";

/// Returns the level used when no directive is set in the environment.
pub fn default_level(verbose: bool, quiet: bool) -> Level {
    if quiet {
        Level::ERROR
    } else if verbose {
        Level::DEBUG
    } else {
        Level::WARN
    }
}

/// Builds the filter: `PF_LOG` first, then `RUST_LOG`, then the flag level.
fn env_filter(level: Level) -> EnvFilter {
    let builder = EnvFilter::builder().with_default_directive(level.into());
    match std::env::var(LOG_ENV) {
        Ok(directives) => builder.parse_lossy(directives),
        Err(_) => builder.from_env_lossy(),
    }
}

/// Installs the global subscriber.
///
/// A second call is a no-op, so tests that run `main` paths in-process
/// do not fail on an already installed subscriber.
pub fn init(verbose: bool, quiet: bool) {
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(env_filter(default_level(verbose, quiet)));

    let _ = tracing_subscriber::registry().with(layer).try_init();
}
