// file: src/executor.rs
// version: 1.0.0
// guid: 2d4f6a8c-0e1b-4c3d-9f5e-7a9b1c3d5e7f

//! Command execution for external tools
//!
//! Tools are always launched with an argument vector, never through a shell.

use crate::error::BuildError;
use crate::Result;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Mutex;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

/// One external tool invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<OsString>,
    pub working_dir: Option<PathBuf>,
    pub timeout: Option<Duration>,
}

impl Invocation {
    pub fn new(program: impl Into<String>, args: Vec<OsString>) -> Self {
        Self {
            program: program.into(),
            args,
            working_dir: None,
            timeout: None,
        }
    }

    pub fn with_working_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.working_dir = dir;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Human-readable command line for logs. Arguments are quoted with
    /// `Debug` formatting, so this is not meant to be pasted into a shell.
    pub fn command_line(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(&format!("{:?}", arg));
        }
        line
    }
}

/// Exit status of a finished tool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessStatus {
    code: Option<i32>,
}

impl ProcessStatus {
    pub fn from_code(code: i32) -> Self {
        Self { code: Some(code) }
    }

    /// Child ended without an exit code (killed by a signal)
    pub fn terminated() -> Self {
        Self { code: None }
    }

    pub fn code(&self) -> Option<i32> {
        self.code
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

impl From<std::process::ExitStatus> for ProcessStatus {
    fn from(status: std::process::ExitStatus) -> Self {
        Self {
            code: status.code(),
        }
    }
}

/// Runs external tools to completion
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run the invocation and wait for it to exit
    async fn run(&self, invocation: &Invocation) -> Result<ProcessStatus>;
}

/// Runs tools as real child processes
#[derive(Debug, Default, Clone)]
pub struct SystemRunner;

impl SystemRunner {
    pub fn new() -> Self {
        Self
    }

    /// Locate a program the way the child launch would, relative to `cwd`
    pub fn resolve(program: &str, cwd: Option<&PathBuf>) -> Result<PathBuf> {
        let cwd = match cwd {
            Some(dir) => dir.clone(),
            None => std::env::current_dir()?,
        };

        which::which_in(program, std::env::var_os("PATH"), cwd).map_err(|_| {
            BuildError::ToolNotFound {
                program: program.to_string(),
            }
        })
    }
}

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, invocation: &Invocation) -> Result<ProcessStatus> {
        let program = Self::resolve(&invocation.program, invocation.working_dir.as_ref())?;
        debug!("Resolved {} to {}", invocation.program, program.display());

        let mut cmd = Command::new(&program);
        cmd.args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        if let Some(ref dir) = invocation.working_dir {
            cmd.current_dir(dir);
        }

        debug!("Executing: {}", invocation.command_line());

        let mut child = cmd.spawn().map_err(|source| BuildError::Spawn {
            program: program.clone(),
            source,
        })?;

        let waited = match invocation.timeout {
            Some(limit) => {
                let outcome = tokio::time::timeout(limit, child.wait()).await;
                match outcome {
                    Ok(waited) => waited,
                    Err(_) => {
                        warn!(
                            "{} exceeded {}s, killing it",
                            program.display(),
                            limit.as_secs()
                        );
                        let _ = child.kill().await;
                        return Err(BuildError::Timeout {
                            program,
                            seconds: limit.as_secs(),
                        });
                    }
                }
            }
            None => child.wait().await,
        };

        let status = waited.map_err(|source| BuildError::Spawn {
            program: program.clone(),
            source,
        })?;

        debug!("{} exited with {:?}", program.display(), status.code());
        Ok(status.into())
    }
}

/// Records invocations instead of running them
///
/// Answers with queued exit codes in order, then `0` once the queue is empty.
#[derive(Debug, Default)]
pub struct RecordingRunner {
    invocations: Mutex<Vec<Invocation>>,
    exit_codes: Mutex<VecDeque<i32>>,
    launch_failure: bool,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue exit codes for the next runs
    pub fn with_exit_codes(codes: impl IntoIterator<Item = i32>) -> Self {
        Self {
            exit_codes: Mutex::new(codes.into_iter().collect()),
            ..Self::default()
        }
    }

    /// Behave as if no tool can be found
    pub fn with_missing_tools() -> Self {
        Self {
            launch_failure: true,
            ..Self::default()
        }
    }

    /// Everything run so far, in order
    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl CommandRunner for RecordingRunner {
    async fn run(&self, invocation: &Invocation) -> Result<ProcessStatus> {
        self.invocations
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(invocation.clone());

        if self.launch_failure {
            return Err(BuildError::ToolNotFound {
                program: invocation.program.clone(),
            });
        }

        let code = self
            .exit_codes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .unwrap_or(0);
        Ok(ProcessStatus::from_code(code))
    }
}
