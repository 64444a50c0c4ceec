// file: src/error.rs
// version: 1.0.0
// guid: 3f1c9a52-7d4e-4b8a-9e21-6c0d5b7a8f13

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for the application
pub type Result<T> = std::result::Result<T, BuildError>;

/// Error types for objbuild
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Template error: {0}")]
    Template(String),

    #[error("Tool not found: {program}")]
    ToolNotFound { program: String },

    #[error("Failed to launch {program}: {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} did not finish within {seconds}s")]
    Timeout { program: PathBuf, seconds: u64 },

    #[error("Usage: {0}")]
    Usage(String),
}

impl BuildError {
    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new template error
    pub fn template(msg: impl Into<String>) -> Self {
        Self::Template(msg.into())
    }

    /// Create a new usage error
    pub fn usage(msg: impl Into<String>) -> Self {
        Self::Usage(msg.into())
    }

    /// True when the external tool never ran to completion, as opposed to
    /// running and reporting a nonzero exit status.
    pub fn is_launch_failure(&self) -> bool {
        matches!(
            self,
            Self::ToolNotFound { .. } | Self::Spawn { .. } | Self::Timeout { .. }
        )
    }
}
