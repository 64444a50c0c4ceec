// file: src/cli/mod.rs
// version: 1.0.0
// guid: 1e3a5c7e-9b0d-4f2a-8c4e-6a8c0e2a4c6e

//! Command line interface for objbuild

pub mod args;
pub mod commands;

pub use args::Cli;
pub use commands::*;
