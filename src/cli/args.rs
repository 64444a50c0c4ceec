// file: src/cli/args.rs
// version: 1.0.0
// guid: 4b6d8f0a-2c4e-4a6b-8d0f-1a3c5e7f9b2d

//! Command line argument definitions

use crate::error::BuildError;
use crate::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Usage line for the two-argument form
pub const LEGACY_USAGE: &str = "<source_file> <object_file>";

#[derive(Parser, Debug)]
#[command(name = "objbuild")]
#[command(about = "Compile a source file into an object file and bundle objects into static libraries")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(args_conflicts_with_subcommands = true)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Source file to compile
    #[arg(value_name = "SOURCE_FILE")]
    pub source: Option<PathBuf>,

    /// Object file to produce; ".o" is appended when it has no extension
    #[arg(value_name = "OBJECT_FILE")]
    pub object: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file merged over the user and project files
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Exit with status 1 when the build itself fails
    #[arg(long, global = true)]
    pub strict_exit: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Compile one source file into an object file
    Compile {
        #[arg(value_name = "SOURCE_FILE")]
        source: PathBuf,

        #[arg(value_name = "OBJECT_FILE")]
        object: PathBuf,

        /// Archive the new object into this static library after a successful compile
        #[arg(long, value_name = "LIBRARY")]
        archive: Option<PathBuf>,
    },

    /// Bundle object files into a static library
    Archive {
        /// Library to write (defaults to build.library_name)
        #[arg(short, long, value_name = "LIBRARY")]
        output: Option<PathBuf>,

        /// Objects to archive; defaults to every object file in the working directory
        #[arg(value_name = "OBJECT_FILE")]
        objects: Vec<PathBuf>,
    },

    /// Check that the compiler and archiver can be found
    CheckTools {
        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration
    ShowConfig,
}

impl Cli {
    /// Resolve the subcommand, mapping the bare two-argument form onto `compile`
    pub fn resolve_command(&self) -> Result<Commands> {
        if let Some(ref command) = self.command {
            return Ok(command.clone());
        }

        match (&self.source, &self.object) {
            (Some(source), Some(object)) => Ok(Commands::Compile {
                source: source.clone(),
                object: object.clone(),
                archive: None,
            }),
            _ => Err(BuildError::usage(format!(
                "{} {}",
                program_name(),
                LEGACY_USAGE
            ))),
        }
    }
}

/// Name this program was invoked as
pub fn program_name() -> String {
    std::env::args_os()
        .next()
        .map(|arg| arg.to_string_lossy().into_owned())
        .unwrap_or_else(|| "objbuild".to_string())
}
