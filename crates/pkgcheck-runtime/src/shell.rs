use crate::runner::{shell_quote, CommandSpec};
use crate::venv::VenvPaths;
use crate::RuntimeError;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// A command ready to run, with the banner title that describes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedShell {
    pub title: &'static str,
    pub spec: CommandSpec,
}

/// Runs a snippet through the host's native shell after activating an
/// environment, so that its console entry points resolve on `PATH`.
pub trait ShellStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Build the command for `code`. `scratch` is an empty directory the
    /// strategy may write helper files into; it is also the working directory.
    fn prepare(&self, code: &str, scratch: &Path) -> Result<PreparedShell, RuntimeError>;
}

/// POSIX strategy: a bash script that sources `bin/activate` first.
#[derive(Debug, Clone)]
pub struct BashShell {
    activate: PathBuf,
    bash: PathBuf,
}

impl BashShell {
    pub fn new(activate: impl Into<PathBuf>) -> Self {
        Self {
            activate: activate.into(),
            // /bin/sh is dash on Debian-based systems and has no `source`
            bash: PathBuf::from("/bin/bash"),
        }
    }

    pub fn script(&self, code: &str) -> String {
        [
            "#!/bin/bash".to_owned(),
            "set -e".to_owned(),
            format!("source {}", shell_quote(&self.activate.to_string_lossy())),
            code.to_owned(),
        ]
        .join("\n")
    }
}

impl ShellStrategy for BashShell {
    fn name(&self) -> &'static str {
        "bash"
    }

    fn prepare(&self, code: &str, _scratch: &Path) -> Result<PreparedShell, RuntimeError> {
        Ok(PreparedShell {
            title: "Running Bash code (cwd is temp dir)",
            spec: CommandSpec::Shell {
                script: self.script(code),
                shell: Some(self.bash.clone()),
            },
        })
    }
}

/// Windows strategy: a batch file that `CALL`s `Scripts\activate.bat`,
/// run with `cmd.exe /q /c`.
#[derive(Debug, Clone)]
pub struct CmdShell {
    activate: PathBuf,
}

impl CmdShell {
    const BATCH_FILE: &'static str = "_run_cmdexe_code.bat";

    pub fn new(activate: impl Into<PathBuf>) -> Self {
        Self {
            activate: activate.into(),
        }
    }

    pub fn batch(&self, code: &str) -> String {
        format!("CALL \"{}\"\r\n{code}", self.activate.display())
    }
}

impl ShellStrategy for CmdShell {
    fn name(&self) -> &'static str {
        "cmd"
    }

    fn prepare(&self, code: &str, scratch: &Path) -> Result<PreparedShell, RuntimeError> {
        let batch_file = scratch.join(Self::BATCH_FILE);
        std::fs::write(&batch_file, self.batch(code))?;
        Ok(PreparedShell {
            title: "Running code in cmd.exe (cwd is temp dir)",
            spec: CommandSpec::argv([
                OsStr::new("cmd.exe"),
                OsStr::new("/q"),
                OsStr::new("/c"),
                batch_file.as_os_str(),
            ]),
        })
    }
}

/// Pick the strategy for the host platform. Called once, when the
/// environment the snippets will run in has been provisioned.
pub fn host_shell(paths: &VenvPaths) -> Result<Box<dyn ShellStrategy>, RuntimeError> {
    if cfg!(windows) {
        Ok(Box::new(CmdShell::new(paths.windows_activate()?)))
    } else {
        Ok(Box::new(BashShell::new(paths.posix_activate()?)))
    }
}
