//! Execution layer for pkgcheck.
//!
//! This crate owns everything that touches the host: uniquely named scratch
//! directories (`ScopedWorkspace`), disposable Python virtual environments
//! (`VirtualEnv`) created by a pluggable `Provisioner`, the `Runner` that
//! narrates and executes external commands with merged output capture, the
//! per-platform `ShellStrategy` used to run code inside an activated
//! environment, and prerequisite checks.

pub mod lifecycle;
pub mod mock;
pub mod prereq;
pub mod provision;
pub mod runner;
pub mod shell;
pub mod terminal;
pub mod venv;
pub mod workspace;

pub use lifecycle::{validate_transition, EnvState};
pub use mock::{StubBehavior, StubProvisioner};
pub use prereq::{check_prereqs, format_missing, MissingPrereq};
pub use provision::{find_base_python, select_provisioner, Provisioner, VenvProvisioner};
pub use runner::{CommandResult, CommandSpec, FailureKind, Runner};
pub use shell::{host_shell, BashShell, CmdShell, PreparedShell, ShellStrategy};
pub use venv::{VenvPaths, VirtualEnv};
pub use workspace::ScopedWorkspace;

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("runtime I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{result}")]
    Command {
        kind: FailureKind,
        result: Box<CommandResult>,
    },
    #[error("not found: {0}")]
    NotFound(String),
    #[error("workspace is missing or not a directory: {0}")]
    WorkspaceMissing(PathBuf),
    #[error("environment has not been provisioned")]
    NotProvisioned,
    #[error("invalid environment state transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },
    #[error("provisioner '{0}' is not available on this system")]
    ProvisionerUnavailable(String),
    #[error("no Python interpreter found (set PKGCHECK_PYTHON or install python3)")]
    NoInterpreter,
}

impl RuntimeError {
    /// The failure kind chosen by the caller of the command that failed, if
    /// this error comes from a command with an unexpected exit status.
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Self::Command { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    pub fn command_result(&self) -> Option<&CommandResult> {
        match self {
            Self::Command { result, .. } => Some(result),
            _ => None,
        }
    }
}
