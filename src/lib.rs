// file: src/lib.rs
// version: 1.0.0
// guid: a3c5e7f9-1b2d-4e6f-8a0c-2e4a6c8e0a1b

//! # objbuild
//!
//! Compiles a single source file into an object file with an external
//! compiler (`g++` by default), and bundles object files into a static
//! library with the platform archiver.
//!
//! Tools are described by a program name and an argument template, and are
//! always launched with an argument vector rather than a shell command line.
//! Execution goes through the [`executor::CommandRunner`] trait so callers can
//! swap in [`executor::RecordingRunner`] instead of real processes.

pub mod cli;
pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod template;
pub mod toolchain;

pub use error::{BuildError, Result};

/// Version information for the utility
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
