// file: src/main.rs
// version: 1.0.0
// guid: c7e9a1b3-5d6f-4a8b-9c0d-3e5f7a9b1c2d

//! objbuild - Main entry point

use clap::error::ErrorKind;
use clap::Parser;
use objbuild::{
    cli::{args::Cli, commands},
    logging::logger,
    BuildError,
};
use std::process::ExitCode;
use tokio::signal;
use tracing::warn;

/// Exit status for usage and runtime errors
const EXIT_FAILURE: u8 = 1;
/// Standard exit status after Ctrl+C
const EXIT_INTERRUPTED: u8 = 130;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => return parse_error_exit(e),
    };

    // Initialize logging
    if let Err(e) = logger::init_logger(cli.verbose, cli.quiet) {
        eprintln!("{}", e);
    }

    let shutdown_signal = async {
        if signal::ctrl_c().await.is_err() {
            // No signal handler available; never resolve.
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        result = commands::run(cli) => match result {
            Ok(status) => ExitCode::from(status),
            Err(BuildError::Usage(usage)) => {
                eprintln!("Usage: {}", usage);
                ExitCode::from(EXIT_FAILURE)
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                ExitCode::from(EXIT_FAILURE)
            }
        },
        _ = shutdown_signal => {
            warn!("Received Ctrl+C, stopping");
            ExitCode::from(EXIT_INTERRUPTED)
        }
    }
}

/// Help and version go to stdout with status 0; anything else is a usage error.
fn parse_error_exit(error: clap::Error) -> ExitCode {
    let _ = error.print();
    match error.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
        _ => ExitCode::from(EXIT_FAILURE),
    }
}
