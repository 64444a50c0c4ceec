// file: src/logging/mod.rs
// version: 1.0.0
// guid: 8b2e4d10-5a3f-4c6e-b7d1-0f9a2c3e4d5b

//! Logging system for objbuild

pub mod logger;

pub use logger::init_logger;
