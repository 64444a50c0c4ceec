// file: src/toolchain.rs
// version: 1.1.0
// guid: 9e1d3c5b-7a2f-4e6d-8c0b-4a6e8d0f2b4c

//! Compile and archive operations
//!
//! A [`Toolchain`] pairs a [`Config`] with a [`CommandRunner`]. It turns the
//! caller's paths into tool invocations and reduces the exit status to a
//! [`BuildOutcome`]. Printing is left to the caller.

use crate::config::Config;
use crate::executor::{CommandRunner, Invocation, ProcessStatus, SystemRunner};
use crate::template::{self, Bindings, LIBRARY, OBJECT, OBJECTS, SOURCE};
use crate::Result;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Result of running a tool to completion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildOutcome {
    Succeeded,
    /// Nonzero exit, or no exit code at all when the tool was killed
    Failed { exit_code: Option<i32> },
}

impl BuildOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

impl From<ProcessStatus> for BuildOutcome {
    fn from(status: ProcessStatus) -> Self {
        if status.success() {
            Self::Succeeded
        } else {
            Self::Failed {
                exit_code: status.code(),
            }
        }
    }
}

/// What `create_static_library` archived and how it went
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveReport {
    pub library: PathBuf,
    pub objects: Vec<PathBuf>,
    pub outcome: BuildOutcome,
}

/// Compiler and archiver bound to a runner
pub struct Toolchain<R: CommandRunner = SystemRunner> {
    config: Config,
    runner: R,
}

impl Toolchain<SystemRunner> {
    /// Toolchain that launches real processes
    pub fn system(config: Config) -> Self {
        Self::new(config, SystemRunner::new())
    }
}

impl<R: CommandRunner> Toolchain<R> {
    pub fn new(config: Config, runner: R) -> Self {
        Self { config, runner }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Object path handed to the compiler: the configured extension is
    /// appended unless the caller's path already ends with it.
    pub fn object_path(&self, object: &Path) -> PathBuf {
        let extension = self.config.build.object_extension.as_str();
        if extension.is_empty() || object.extension().and_then(|e| e.to_str()) == Some(extension) {
            return object.to_path_buf();
        }

        let mut with_extension = object.as_os_str().to_os_string();
        with_extension.push(".");
        with_extension.push(extension);
        PathBuf::from(with_extension)
    }

    /// Build the compiler invocation for one source file
    pub fn compile_invocation(&self, source: &Path, object: &Path) -> Result<Invocation> {
        let bindings = Bindings::new()
            .variables(&self.config.variables)
            .scalar(SOURCE, source)
            .scalar(OBJECT, self.object_path(object));
        let args = template::render(&self.config.compiler.args, &bindings)?;

        Ok(self.invocation(&self.config.compiler.program, args))
    }

    /// Compile one source file into an object file
    pub async fn compile(&self, source: &Path, object: &Path) -> Result<BuildOutcome> {
        let invocation = self.compile_invocation(source, object)?;
        info!(
            "Compiling {} -> {}",
            source.display(),
            self.object_path(object).display()
        );

        let outcome = BuildOutcome::from(self.runner.run(&invocation).await?);
        match outcome {
            BuildOutcome::Succeeded => debug!("Compiler finished for {}", source.display()),
            BuildOutcome::Failed { exit_code } => warn!(
                "{} exited with {:?} for {}",
                self.config.compiler.program,
                exit_code,
                source.display()
            ),
        }
        Ok(outcome)
    }

    /// Object files directly inside the working directory, sorted by name
    pub fn discover_objects(&self) -> Result<Vec<PathBuf>> {
        let dir = self
            .config
            .build
            .working_directory
            .clone()
            .unwrap_or_else(|| PathBuf::from("."));
        let extension = match self.config.build.object_extension.as_str() {
            "" => "o",
            ext => ext,
        };

        let mut objects = Vec::new();
        for entry in WalkDir::new(&dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(std::io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }
            if entry.path().extension().and_then(|e| e.to_str()) == Some(extension) {
                objects.push(PathBuf::from(entry.file_name()));
            }
        }

        debug!("Found {} object file(s) in {}", objects.len(), dir.display());
        Ok(objects)
    }

    /// Build the archiver invocation
    pub fn archive_invocation(&self, library: &Path, objects: &[PathBuf]) -> Result<Invocation> {
        let bindings = Bindings::new()
            .variables(&self.config.variables)
            .scalar(LIBRARY, library)
            .list(OBJECTS, objects);
        let args = template::render(&self.config.archiver.args, &bindings)?;

        Ok(self.invocation(&self.config.archiver.program, args))
    }

    /// Bundle object files into a static library
    ///
    /// With no explicit objects, every object file in the working directory is
    /// used. The archiver runs even when that set is empty and decides for
    /// itself whether an empty archive is an error.
    pub async fn create_static_library(
        &self,
        library: Option<&Path>,
        objects: &[PathBuf],
    ) -> Result<ArchiveReport> {
        let library = library
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.config.build.library_name.clone());
        let objects = if objects.is_empty() {
            self.discover_objects()?
        } else {
            objects.to_vec()
        };

        if objects.is_empty() {
            warn!("No object files to archive into {}", library.display());
        }

        let invocation = self.archive_invocation(&library, &objects)?;
        info!(
            "Archiving {} object file(s) into {}",
            objects.len(),
            library.display()
        );

        let outcome = BuildOutcome::from(self.runner.run(&invocation).await?);
        Ok(ArchiveReport {
            library,
            objects,
            outcome,
        })
    }

    fn invocation(&self, program: &str, args: Vec<std::ffi::OsString>) -> Invocation {
        Invocation::new(program, args)
            .with_working_dir(self.config.build.working_directory.clone())
            .with_timeout(self.config.build.timeout_seconds.map(Duration::from_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ToolConfig;
    use crate::error::BuildError;
    use crate::executor::RecordingRunner;
    use std::ffi::OsString;
    use tempfile::TempDir;

    fn toolchain(runner: RecordingRunner) -> Toolchain<RecordingRunner> {
        Toolchain::new(Config::default(), runner)
    }

    fn args(invocation: &Invocation) -> Vec<String> {
        invocation
            .args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_object_path_appends_extension() {
        let toolchain = toolchain(RecordingRunner::new());

        assert_eq!(toolchain.object_path(Path::new("blink")), PathBuf::from("blink.o"));
        assert_eq!(
            toolchain.object_path(Path::new("build/blink")),
            PathBuf::from("build/blink.o")
        );
        assert_eq!(toolchain.object_path(Path::new("blink.o")), PathBuf::from("blink.o"));
    }

    #[test]
    fn test_object_path_appends_after_other_extensions() {
        let toolchain = toolchain(RecordingRunner::new());

        assert_eq!(toolchain.object_path(Path::new("blink.v2")), PathBuf::from("blink.v2.o"));
        assert_eq!(toolchain.object_path(Path::new("core.avr")), PathBuf::from("core.avr.o"));
        assert_eq!(toolchain.object_path(Path::new("blink.obj")), PathBuf::from("blink.obj.o"));
    }

    #[test]
    fn test_object_path_without_extension_setting() {
        let mut config = Config::default();
        config.build.object_extension = String::new();
        let toolchain = Toolchain::new(config, RecordingRunner::new());

        assert_eq!(toolchain.object_path(Path::new("blink")), PathBuf::from("blink"));
    }

    #[tokio::test]
    async fn test_compile_builds_argument_vector() {
        let toolchain = toolchain(RecordingRunner::new());

        let outcome = toolchain
            .compile(Path::new("src/blink.cpp"), Path::new("blink"))
            .await
            .unwrap();

        assert!(outcome.is_success());
        let invocations = toolchain.runner().invocations();
        assert_eq!(invocations.len(), 1);
        assert_eq!(invocations[0].program, "g++");
        assert_eq!(args(&invocations[0]), vec!["-c", "src/blink.cpp", "-o", "blink.o"]);
        assert_eq!(invocations[0].working_dir, None);
        assert_eq!(invocations[0].timeout, None);
    }

    #[tokio::test]
    async fn test_compile_reports_nonzero_exit() {
        let toolchain = toolchain(RecordingRunner::with_exit_codes([1]));

        let outcome = toolchain
            .compile(Path::new("missing.cpp"), Path::new("missing"))
            .await
            .unwrap();

        assert_eq!(outcome, BuildOutcome::Failed { exit_code: Some(1) });
    }

    #[tokio::test]
    async fn test_compile_passes_metacharacters_literally() {
        let toolchain = toolchain(RecordingRunner::new());

        toolchain
            .compile(Path::new("a.cpp; touch pwned"), Path::new("$(out)"))
            .await
            .unwrap();

        let invocations = toolchain.runner().invocations();
        assert_eq!(
            invocations[0].args,
            vec![
                OsString::from("-c"),
                OsString::from("a.cpp; touch pwned"),
                OsString::from("-o"),
                OsString::from("$(out).o"),
            ]
        );
    }

    #[tokio::test]
    async fn test_compile_is_repeatable() {
        let toolchain = toolchain(RecordingRunner::new());

        let first = toolchain.compile(Path::new("a.cpp"), Path::new("a")).await.unwrap();
        let second = toolchain.compile(Path::new("a.cpp"), Path::new("a")).await.unwrap();

        assert_eq!(first, second);
        let invocations = toolchain.runner().invocations();
        assert_eq!(invocations[0], invocations[1]);
    }

    #[tokio::test]
    async fn test_compile_launch_failure_is_an_error() {
        let toolchain = toolchain(RecordingRunner::with_missing_tools());

        let result = toolchain.compile(Path::new("a.cpp"), Path::new("a")).await;

        assert!(matches!(result, Err(ref e) if e.is_launch_failure()));
    }

    #[tokio::test]
    async fn test_compile_uses_configured_tool() {
        let mut config = Config::default();
        config.compiler = ToolConfig::new("avr-g++", &["-mmcu=atmega328p", "-c", "{source}", "-o", "{object}"]);
        config.build.working_directory = Some(PathBuf::from("/tmp/project"));
        config.build.timeout_seconds = Some(60);
        let toolchain = Toolchain::new(config, RecordingRunner::new());

        toolchain.compile(Path::new("blink.cpp"), Path::new("blink")).await.unwrap();

        let invocation = &toolchain.runner().invocations()[0];
        assert_eq!(invocation.program, "avr-g++");
        assert_eq!(args(invocation)[0], "-mmcu=atmega328p");
        assert_eq!(invocation.working_dir, Some(PathBuf::from("/tmp/project")));
        assert_eq!(invocation.timeout, Some(Duration::from_secs(60)));
    }

    #[tokio::test]
    async fn test_compile_binds_config_variables() {
        let mut config = Config::default();
        config.compiler = ToolConfig::new("avr-g++", &["-mmcu={mcu}", "-c", "{source}", "-o", "{object}"]);
        config.variables.insert("mcu".to_string(), "atmega328p".to_string());
        let toolchain = Toolchain::new(config, RecordingRunner::new());

        toolchain.compile(Path::new("blink.cpp"), Path::new("blink")).await.unwrap();

        assert_eq!(
            args(&toolchain.runner().invocations()[0]),
            vec!["-mmcu=atmega328p", "-c", "blink.cpp", "-o", "blink.o"]
        );
    }

    #[test]
    fn test_discover_objects_in_working_directory() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("b.o"), b"").unwrap();
        std::fs::write(temp_dir.path().join("a.o"), b"").unwrap();
        std::fs::write(temp_dir.path().join("a.cpp"), b"").unwrap();
        std::fs::create_dir(temp_dir.path().join("nested")).unwrap();
        std::fs::write(temp_dir.path().join("nested").join("c.o"), b"").unwrap();

        let mut config = Config::default();
        config.build.working_directory = Some(temp_dir.path().to_path_buf());
        let toolchain = Toolchain::new(config, RecordingRunner::new());

        let objects = toolchain.discover_objects().unwrap();

        assert_eq!(objects, vec![PathBuf::from("a.o"), PathBuf::from("b.o")]);
    }

    #[tokio::test]
    async fn test_archive_discovers_objects() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("blink.o"), b"").unwrap();
        let mut config = Config::default();
        config.archiver = ToolConfig::new("ar", &["rcs", "{library}", "{objects}"]);
        config.build.working_directory = Some(temp_dir.path().to_path_buf());
        let toolchain = Toolchain::new(config, RecordingRunner::new());

        let report = toolchain
            .create_static_library(Some(Path::new("libblink.a")), &[])
            .await
            .unwrap();

        assert!(report.outcome.is_success());
        assert_eq!(report.library, PathBuf::from("libblink.a"));
        assert_eq!(report.objects, vec![PathBuf::from("blink.o")]);
        let invocation = &toolchain.runner().invocations()[0];
        assert_eq!(args(invocation), vec!["rcs", "libblink.a", "blink.o"]);
    }

    #[tokio::test]
    async fn test_archive_with_no_objects_still_runs_archiver() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.archiver = ToolConfig::new("lib", &["/NOLOGO", "/OUT:{library}", "{objects}"]);
        config.build.library_name = PathBuf::from("mylibrary.lib");
        config.build.working_directory = Some(temp_dir.path().to_path_buf());
        let toolchain = Toolchain::new(config, RecordingRunner::with_exit_codes([1]));

        let report = toolchain.create_static_library(None, &[]).await.unwrap();

        assert!(report.objects.is_empty());
        assert_eq!(report.outcome, BuildOutcome::Failed { exit_code: Some(1) });
        let invocations = toolchain.runner().invocations();
        assert_eq!(invocations.len(), 1);
        assert_eq!(args(&invocations[0]), vec!["/NOLOGO", "/OUT:mylibrary.lib"]);
    }

    #[tokio::test]
    async fn test_archive_explicit_objects_skip_discovery() {
        let mut config = Config::default();
        config.archiver = ToolConfig::new("ar", &["rcs", "{library}", "{objects}"]);
        config.build.working_directory = Some(PathBuf::from("/definitely/not/here"));
        let toolchain = Toolchain::new(config, RecordingRunner::new());
        let objects = vec![PathBuf::from("x.o"), PathBuf::from("y.o")];

        let report = toolchain
            .create_static_library(Some(Path::new("libxy.a")), &objects)
            .await
            .unwrap();

        assert_eq!(report.objects, objects);
        assert_eq!(
            args(&toolchain.runner().invocations()[0]),
            vec!["rcs", "libxy.a", "x.o", "y.o"]
        );
    }

    #[test]
    fn test_discover_objects_missing_directory() {
        let mut config = Config::default();
        config.build.working_directory = Some(PathBuf::from("/definitely/not/here"));
        let toolchain = Toolchain::new(config, RecordingRunner::new());

        assert!(matches!(toolchain.discover_objects(), Err(BuildError::Io(_))));
    }
}
