// file: src/logging/logger.rs
// version: 1.1.0
// guid: c4a7e9b2-1d3f-4e5a-8b6c-7d9e0f1a2b3c

//! Logger initialization and configuration

use crate::error::BuildError;
use crate::Result;
use tracing::Instrument;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when neither a flag nor `RUST_LOG` selects one
pub const DEFAULT_FILTER: &str = "warn";

/// Filter directive for the given verbosity flags and `RUST_LOG` value.
///
/// `--quiet` wins over `--verbose`. With neither flag, `RUST_LOG` is honored
/// and falls back to [`DEFAULT_FILTER`], which keeps a clean run to the
/// result lines alone.
pub fn filter_directive(verbose: bool, quiet: bool, rust_log: Option<&str>) -> String {
    if quiet {
        "error".to_string()
    } else if verbose {
        "debug".to_string()
    } else {
        match rust_log.map(str::trim) {
            Some(directive) if !directive.is_empty() => directive.to_string(),
            _ => DEFAULT_FILTER.to_string(),
        }
    }
}

/// Build the log filter from the flags and the process environment
pub fn build_filter(verbose: bool, quiet: bool) -> EnvFilter {
    let rust_log = std::env::var("RUST_LOG").ok();
    let directive = filter_directive(verbose, quiet, rust_log.as_deref());
    EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Initialize the logging system
///
/// Log lines go to stderr so stdout only carries the build result messages.
pub fn init_logger(verbose: bool, quiet: bool) -> Result<()> {
    tracing_subscriber::registry()
        .with(build_filter(verbose, quiet))
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .try_init()
        .map_err(|e| BuildError::config(format!("Failed to initialize logger: {}", e)))?;

    Ok(())
}

/// Run a future inside a named operation span
pub async fn with_operation_span<Fut>(operation: &str, future: Fut) -> Fut::Output
where
    Fut: std::future::Future,
{
    let span = tracing::info_span!("operation", name = operation);
    future.instrument(span).await
}
