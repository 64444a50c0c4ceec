// file: src/config/loader.rs
// version: 1.1.0
// guid: 7c6b5a49-3e2d-4f1c-8b0a-9d8e7f6a5b4c

//! Configuration file loading and environment variable substitution

use super::Config;
use crate::error::BuildError;
use crate::Result;
use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Project configuration file, looked up in the current directory
pub const PROJECT_CONFIG_FILE: &str = ".objbuild.toml";

/// Environment variable overriding the compiler program
pub const ENV_COMPILER: &str = "OBJBUILD_CC";
/// Environment variable overriding the archiver program
pub const ENV_ARCHIVER: &str = "OBJBUILD_AR";
/// Environment variable selecting strict exit codes
pub const ENV_STRICT_EXIT: &str = "OBJBUILD_STRICT_EXIT";
/// Environment variable setting the tool timeout in seconds
pub const ENV_TIMEOUT: &str = "OBJBUILD_TIMEOUT";

/// Layered configuration loader
///
/// Sources, lowest precedence first: built-in defaults, the user config file,
/// the project config file, an explicit `--config` file, then environment
/// overrides. Files are merged table by table, so a file only needs the keys
/// it changes.
pub struct ConfigLoader {
    env_vars: HashMap<String, String>,
    user_config: Option<PathBuf>,
    project_config: PathBuf,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Create a new config loader from the process environment
    pub fn new() -> Self {
        Self {
            env_vars: std::env::vars().collect(),
            user_config: dirs::config_dir().map(|dir| dir.join("objbuild").join("config.toml")),
            project_config: PathBuf::from(PROJECT_CONFIG_FILE),
        }
    }

    /// Create a loader that ignores the process environment and config files
    pub fn isolated() -> Self {
        Self {
            env_vars: HashMap::new(),
            user_config: None,
            project_config: PathBuf::new(),
        }
    }

    /// Override the user config file location
    pub fn with_user_config(mut self, path: Option<PathBuf>) -> Self {
        self.user_config = path;
        self
    }

    /// Override the project config file location; `None` disables it
    pub fn with_project_config(mut self, path: Option<PathBuf>) -> Self {
        self.project_config = path.unwrap_or_default();
        self
    }

    /// Set an environment variable visible to substitution and overrides
    pub fn set_env_var(&mut self, key: String, value: String) {
        self.env_vars.insert(key, value);
    }

    /// Load the effective configuration
    pub async fn load(&self, explicit: Option<&Path>) -> Result<Config> {
        let mut merged = toml::Value::try_from(Config::default())?;

        if let Some(ref user_config) = self.user_config {
            if user_config.exists() {
                info!("Loading user configuration from: {}", user_config.display());
                merge_values(&mut merged, self.load_file(user_config).await?);
            }
        }

        if !self.project_config.as_os_str().is_empty() && self.project_config.exists() {
            info!(
                "Loading project configuration from: {}",
                self.project_config.display()
            );
            merge_values(&mut merged, self.load_file(&self.project_config).await?);
        }

        if let Some(path) = explicit {
            info!("Loading configuration from: {}", path.display());
            merge_values(&mut merged, self.load_file(path).await?);
        }

        let mut config: Config = merged.try_into()?;
        self.apply_env_overrides(&mut config)?;
        config.validate()?;

        debug!("Final configuration: {:#?}", config);
        Ok(config)
    }

    /// Read one TOML file with `${VAR}` references expanded
    ///
    /// Expansion happens on parsed string values, so a substituted value is
    /// taken literally and never reinterpreted as TOML.
    pub async fn load_file(&self, path: &Path) -> Result<toml::Value> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            BuildError::config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        let mut value: toml::Value = toml::from_str(&content).map_err(|e| {
            BuildError::config(format!(
                "Failed to parse config file {}: {}",
                path.display(),
                e
            ))
        })?;
        self.expand_env_vars(&mut value)?;
        Ok(value)
    }

    /// Expand environment variables in every string of a parsed document
    fn expand_env_vars(&self, value: &mut toml::Value) -> Result<()> {
        let re = Regex::new(r"\$\{([^}]+)\}")
            .map_err(|e| BuildError::config(format!("Invalid regex pattern: {}", e)))?;

        let mut missing_vars = Vec::new();
        self.expand_value(&re, value, &mut missing_vars);

        if !missing_vars.is_empty() {
            return Err(BuildError::config(format!(
                "Missing environment variables: {}",
                missing_vars.join(", ")
            )));
        }

        Ok(())
    }

    fn expand_value(&self, re: &Regex, value: &mut toml::Value, missing_vars: &mut Vec<String>) {
        match value {
            toml::Value::String(text) => {
                let expanded = re.replace_all(text.as_str(), |cap: &regex::Captures| {
                    let var_name = &cap[1];
                    match self.env_vars.get(var_name) {
                        Some(found) => found.clone(),
                        None => {
                            if !missing_vars.iter().any(|m| m == var_name) {
                                missing_vars.push(var_name.to_string());
                            }
                            cap[0].to_string()
                        }
                    }
                });
                *text = expanded.into_owned();
            }
            toml::Value::Array(items) => {
                for item in items {
                    self.expand_value(re, item, missing_vars);
                }
            }
            toml::Value::Table(table) => {
                for (_, item) in table.iter_mut() {
                    self.expand_value(re, item, missing_vars);
                }
            }
            _ => {}
        }
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&self, config: &mut Config) -> Result<()> {
        if let Some(program) = self.env_vars.get(ENV_COMPILER) {
            debug!("{} overrides compiler: {}", ENV_COMPILER, program);
            config.compiler.program = program.clone();
        }

        if let Some(program) = self.env_vars.get(ENV_ARCHIVER) {
            debug!("{} overrides archiver: {}", ENV_ARCHIVER, program);
            config.archiver.program = program.clone();
        }

        if let Some(strict) = self.env_vars.get(ENV_STRICT_EXIT) {
            config.build.strict_exit = strict.trim().parse().map_err(|_| {
                BuildError::config(format!(
                    "{} must be true or false, got '{}'",
                    ENV_STRICT_EXIT, strict
                ))
            })?;
        }

        if let Some(timeout) = self.env_vars.get(ENV_TIMEOUT) {
            let seconds = timeout.trim().parse::<u64>().map_err(|_| {
                BuildError::config(format!(
                    "{} must be a number of seconds, got '{}'",
                    ENV_TIMEOUT, timeout
                ))
            })?;
            config.build.timeout_seconds = Some(seconds);
        }

        Ok(())
    }
}

/// Deep-merge `overlay` into `base`; tables merge key by key, anything else is replaced.
fn merge_values(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base), toml::Value::Table(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}
