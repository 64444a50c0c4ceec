// file: src/cli/commands.rs
// version: 1.1.0
// guid: 6f8a0c2e-4b6d-4e8f-a1c3-5e7a9c1e3f5b

//! Command implementations for the CLI
//!
//! Handlers print the user-facing result lines and return the process exit
//! status. A failed build exits 0 unless strict exit is enabled.

use crate::{
    cli::args::{Cli, Commands},
    config::{Config, ConfigLoader},
    error::BuildError,
    executor::{CommandRunner, SystemRunner},
    logging::logger::with_operation_span,
    toolchain::{BuildOutcome, Toolchain},
    Result,
};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Exit status for a finished build step
pub fn exit_status(outcome: BuildOutcome, strict: bool) -> u8 {
    if outcome.is_success() || !strict {
        0
    } else {
        1
    }
}

/// Parse-independent entry point: load configuration and run the command
pub async fn run(cli: Cli) -> Result<u8> {
    let command = cli.resolve_command()?;

    let mut config = ConfigLoader::new().load(cli.config.as_deref()).await?;
    if cli.strict_exit {
        config.build.strict_exit = true;
    }

    let mut stdout = std::io::stdout();
    let mut stderr = std::io::stderr();

    match command {
        Commands::Compile {
            source,
            object,
            archive,
        } => {
            let toolchain = Toolchain::system(config);
            with_operation_span(
                "compile",
                compile_command(
                    &toolchain,
                    &source,
                    &object,
                    archive.as_deref(),
                    &mut stdout,
                    &mut stderr,
                ),
            )
            .await
        }
        Commands::Archive { output, objects } => {
            let toolchain = Toolchain::system(config);
            with_operation_span(
                "archive",
                archive_command(
                    &toolchain,
                    output.as_deref(),
                    &objects,
                    &mut stdout,
                    &mut stderr,
                ),
            )
            .await
        }
        Commands::CheckTools { json } => check_tools_command(&config, json, &mut stdout),
        Commands::ShowConfig => show_config_command(&config, &mut stdout),
    }
}

/// Compile one source file, optionally archiving the result
pub async fn compile_command<R: CommandRunner>(
    toolchain: &Toolchain<R>,
    source: &Path,
    object: &Path,
    archive: Option<&Path>,
    out: &mut dyn Write,
    err: &mut dyn Write,
) -> Result<u8> {
    let strict = toolchain.config().build.strict_exit;

    let outcome = match toolchain.compile(source, object).await {
        Ok(outcome) => outcome,
        Err(e) if e.is_launch_failure() => {
            error!("{}", e);
            BuildOutcome::Failed { exit_code: None }
        }
        Err(e) => return Err(e),
    };

    if !outcome.is_success() {
        writeln!(err, "Compilation failed for: {}", source.display())?;
        return Ok(exit_status(outcome, strict));
    }

    writeln!(out, "Compilation successful: {}", object.display())?;

    match archive {
        Some(library) => {
            let objects = [toolchain.object_path(object)];
            archive_command(toolchain, Some(library), &objects, out, err).await
        }
        None => Ok(0),
    }
}

/// Bundle object files into a static library
pub async fn archive_command<R: CommandRunner>(
    toolchain: &Toolchain<R>,
    library: Option<&Path>,
    objects: &[PathBuf],
    out: &mut dyn Write,
    err: &mut dyn Write,
) -> Result<u8> {
    let strict = toolchain.config().build.strict_exit;

    let outcome = match toolchain.create_static_library(library, objects).await {
        Ok(report) => {
            if report.outcome.is_success() {
                writeln!(out, "Static library created: {}", report.library.display())?;
            }
            report.outcome
        }
        // Io here means the object scan failed before the archiver ran
        Err(e) if e.is_launch_failure() || matches!(e, BuildError::Io(_)) => {
            error!("{}", e);
            BuildOutcome::Failed { exit_code: None }
        }
        Err(e) => return Err(e),
    };

    if !outcome.is_success() {
        writeln!(err, "Error: Library creation failed.")?;
    }
    Ok(exit_status(outcome, strict))
}

/// Resolution result for one configured tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolStatus {
    pub role: &'static str,
    pub program: String,
    pub path: Option<PathBuf>,
}

/// Resolve the configured compiler and archiver
pub fn tool_statuses(config: &Config) -> Vec<ToolStatus> {
    let cwd = config.build.working_directory.as_ref();
    [("compiler", &config.compiler), ("archiver", &config.archiver)]
        .into_iter()
        .map(|(role, tool)| ToolStatus {
            role,
            program: tool.program.clone(),
            path: SystemRunner::resolve(&tool.program, cwd).ok(),
        })
        .collect()
}

/// Report whether the configured tools can be found
pub fn check_tools_command(config: &Config, json: bool, out: &mut dyn Write) -> Result<u8> {
    let statuses = tool_statuses(config);

    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(&statuses)?)?;
    } else {
        for status in &statuses {
            match status.path {
                Some(ref path) => writeln!(
                    out,
                    "{:<10} {:<16} {}",
                    status.role,
                    status.program,
                    path.display()
                )?,
                None => writeln!(out, "{:<10} {:<16} not found", status.role, status.program)?,
            }
        }
    }

    let missing = statuses.iter().filter(|s| s.path.is_none()).count();
    if missing > 0 {
        info!("{} tool(s) could not be found", missing);
        return Ok(1);
    }
    Ok(0)
}

/// Print the effective configuration as TOML
pub fn show_config_command(config: &Config, out: &mut dyn Write) -> Result<u8> {
    write!(out, "{}", config.to_toml_string()?)?;
    Ok(0)
}
