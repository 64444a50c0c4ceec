// file: src/config/mod.rs
// version: 1.1.0
// guid: 0a9b8c7d-6e5f-4a3b-9c2d-1e0f2a3b4c5d

//! Configuration module for objbuild
//!
//! Describes which compiler and archiver to run, the argument templates they
//! are invoked with, and how build results map to the process exit status.

pub mod loader;

pub use loader::ConfigLoader;

use crate::error::BuildError;
use crate::template::{self, LIBRARY, OBJECT, OBJECTS, SOURCE};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "ToolConfig::default_compiler")]
    pub compiler: ToolConfig,
    #[serde(default = "ToolConfig::default_archiver")]
    pub archiver: ToolConfig,
    #[serde(default)]
    pub build: BuildConfig,
    /// Fixed values available to both templates as `{name}`, e.g. `mcu = "atmega328p"`
    #[serde(default)]
    pub variables: BTreeMap<String, String>,
}

/// An external tool: the program to run and its argument template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolConfig {
    /// Executable name looked up on `PATH`, or an explicit path
    pub program: String,
    /// Argument template, see [`crate::template`]
    pub args: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Extension appended to object paths not already ending in it. Empty disables it.
    pub object_extension: String,
    /// Library written by `archive` when no output is given
    pub library_name: PathBuf,
    /// Directory the tools run in and where objects are discovered
    pub working_directory: Option<PathBuf>,
    /// Kill a tool that runs longer than this
    pub timeout_seconds: Option<u64>,
    /// Exit nonzero when the build itself fails
    pub strict_exit: bool,
}

impl ToolConfig {
    pub fn new(program: impl Into<String>, args: &[&str]) -> Self {
        Self {
            program: program.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// `g++ -c {source} -o {object}`
    pub fn default_compiler() -> Self {
        Self::new("g++", &["-c", "{source}", "-o", "{object}"])
    }

    /// `ar rcs` on Unix, `lib /OUT:` with the MSVC toolchain on Windows
    pub fn default_archiver() -> Self {
        if cfg!(windows) {
            Self::new("lib", &["/NOLOGO", "/OUT:{library}", "{objects}"])
        } else {
            Self::new("ar", &["rcs", "{library}", "{objects}"])
        }
    }
}

impl Default for BuildConfig {
    fn default() -> Self {
        let library_name = if cfg!(windows) {
            "mylibrary.lib"
        } else {
            "libmylibrary.a"
        };

        Self {
            object_extension: "o".to_string(),
            library_name: PathBuf::from(library_name),
            working_directory: None,
            timeout_seconds: None,
            strict_exit: false,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            compiler: ToolConfig::default_compiler(),
            archiver: ToolConfig::default_archiver(),
            build: BuildConfig::default(),
            variables: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Validate tool definitions and build settings
    pub fn validate(&self) -> Result<()> {
        for name in self.variables.keys() {
            if [SOURCE, OBJECT, LIBRARY, OBJECTS].contains(&name.as_str()) {
                return Err(BuildError::config(format!(
                    "variables.{} shadows a built-in placeholder",
                    name
                )));
            }
            if !template::is_valid_name(name)? {
                return Err(BuildError::config(format!(
                    "variables: '{}' is not a valid placeholder name",
                    name
                )));
            }
        }

        let user: Vec<&str> = self.variables.keys().map(String::as_str).collect();
        let compiler_scalars: Vec<&str> = [SOURCE, OBJECT].into_iter().chain(user.iter().copied()).collect();
        let archiver_scalars: Vec<&str> = [LIBRARY].into_iter().chain(user.iter().copied()).collect();

        validate_tool("compiler", &self.compiler, &compiler_scalars, &[], SOURCE)?;
        validate_tool("archiver", &self.archiver, &archiver_scalars, &[OBJECTS], LIBRARY)?;

        if self.build.library_name.as_os_str().is_empty() {
            return Err(BuildError::config("build.library_name cannot be empty"));
        }
        if self.build.object_extension.starts_with('.') {
            return Err(BuildError::config(format!(
                "build.object_extension must not start with a dot: {}",
                self.build.object_extension
            )));
        }
        if self.build.timeout_seconds == Some(0) {
            return Err(BuildError::config("build.timeout_seconds must be positive"));
        }

        Ok(())
    }

    /// Render the configuration as TOML
    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

fn validate_tool(
    name: &str,
    tool: &ToolConfig,
    scalars: &[&str],
    lists: &[&str],
    required: &str,
) -> Result<()> {
    if tool.program.trim().is_empty() {
        return Err(BuildError::config(format!("{}.program cannot be empty", name)));
    }

    template::validate(&tool.args, scalars, lists)
        .map_err(|e| BuildError::config(format!("{}.args: {}", name, e)))?;

    let mut referenced = false;
    for arg in &tool.args {
        if template::placeholders(arg)?.iter().any(|p| p == required) {
            referenced = true;
            break;
        }
    }
    if !referenced {
        return Err(BuildError::config(format!(
            "{}.args must reference {{{}}}",
            name, required
        )));
    }

    Ok(())
}
