//! Build-and-verify pipeline for Python packages.
//!
//! `Package` builds a wheel from a project directory inside a throwaway
//! "builder" virtual environment, validates its metadata, installs it into a
//! second, pristine "installer" environment, and then lets the caller run
//! probe code against what an end user would get. Build side effects in the
//! project tree are rolled back by `ArtifactDirGuard`; every environment and
//! scratch directory is released in reverse order through a `ReleaseStack`.

pub mod artifact;
pub mod guard;
pub mod marker;
pub mod package;
pub mod release;

pub use artifact::find_latest_wheel;
pub use guard::ArtifactDirGuard;
pub use marker::{module_path_snippet, parse_module_path, require_marker_beside};
pub use package::{configured_provisioner, OutputMode, Package, PackageOptions};
pub use release::{Release, ReleaseStack};

use pkgcheck_runtime::{FailureKind, RuntimeError};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("cannot initialize environment: {0}")]
    EnvironmentInit(#[source] RuntimeError),
    #[error("build failed: {0}")]
    Build(#[source] RuntimeError),
    #[error("artifact validation failed: {0}")]
    Validation(#[source] RuntimeError),
    #[error("failed to install the package: {0}")]
    Install(#[source] RuntimeError),
    #[error("execution failed: {0}")]
    Execution(#[source] RuntimeError),
    #[error("command failed: {0}")]
    Command(#[source] RuntimeError),
    #[error("no .whl file found in {0}")]
    ArtifactNotFound(PathBuf),
    #[error("marker file not found: {0}")]
    MarkerNotFound(PathBuf),
    #[error("cannot locate module '{module}' in the installed environment")]
    ModuleNotFound { module: String, output: String },
    #[error("invalid module name: '{0}'")]
    InvalidModuleName(String),
    #[error("package has already been initialized")]
    AlreadyInitialized,
    #[error("package has not been initialized")]
    NotInitialized,
    #[error("runtime error: {0}")]
    Runtime(#[source] RuntimeError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid glob pattern: {0}")]
    Pattern(#[from] glob::PatternError),
}

/// Commands that fail with an unexpected exit status land in the variant
/// their caller selected through [`FailureKind`].
impl From<RuntimeError> for CoreError {
    fn from(e: RuntimeError) -> Self {
        match e.failure_kind() {
            Some(FailureKind::EnvironmentInit) => Self::EnvironmentInit(e),
            Some(FailureKind::Build) => Self::Build(e),
            Some(FailureKind::Validation) => Self::Validation(e),
            Some(FailureKind::Install) => Self::Install(e),
            Some(FailureKind::Execution) => Self::Execution(e),
            Some(FailureKind::Command) => Self::Command(e),
            None => Self::Runtime(e),
        }
    }
}

impl CoreError {
    /// Captured output of the command behind this failure, if any.
    pub fn command_output(&self) -> Option<&str> {
        match self {
            Self::EnvironmentInit(e)
            | Self::Build(e)
            | Self::Validation(e)
            | Self::Install(e)
            | Self::Execution(e)
            | Self::Command(e)
            | Self::Runtime(e) => e.command_result().map(|r| r.output.as_str()),
            Self::ModuleNotFound { output, .. } => Some(output),
            _ => None,
        }
    }
}
