use crate::terminal::{print_command_banner, print_command_output};
use crate::RuntimeError;
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Which typed failure wraps a command whose exit status was not the
/// expected one. Chosen per call by the code issuing the command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailureKind {
    #[default]
    Command,
    EnvironmentInit,
    Build,
    Validation,
    Install,
    Execution,
}

/// Exit status and merged stdout/stderr of a finished process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    pub command: String,
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub output: String,
}

impl fmt::Display for CommandResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.exit_code {
            Some(code) => write!(f, "`{}` exited with code {code}", self.command)?,
            None => write!(f, "`{}` was terminated by a signal", self.command)?,
        }
        let output = self.output.trim_end();
        if !output.is_empty() {
            write!(f, "\n{output}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandSpec {
    /// Program followed by its arguments, no shell involved.
    Argv(Vec<OsString>),
    /// Script handed to a shell. `shell` overrides the platform default
    /// (`/bin/sh -c` or `cmd.exe /C`).
    Shell {
        script: String,
        shell: Option<PathBuf>,
    },
}

impl CommandSpec {
    pub fn argv<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        Self::Argv(args.into_iter().map(|a| a.as_ref().to_owned()).collect())
    }

    pub fn program(&self) -> String {
        match self {
            Self::Argv(argv) => argv
                .first()
                .map(|p| p.to_string_lossy().into_owned())
                .unwrap_or_default(),
            Self::Shell { shell, .. } => shell
                .as_deref()
                .map_or_else(|| default_shell().to_owned(), |s| s.display().to_string()),
        }
    }

    /// Human-readable rendering used in banners and error messages.
    pub fn display(&self) -> String {
        match self {
            Self::Argv(argv) => argv
                .iter()
                .map(|a| shell_quote(&a.to_string_lossy()))
                .collect::<Vec<_>>()
                .join(" "),
            Self::Shell { script, .. } => script.clone(),
        }
    }

    fn to_command(&self) -> Result<Command, RuntimeError> {
        match self {
            Self::Argv(argv) => {
                let (program, args) = argv
                    .split_first()
                    .ok_or_else(|| RuntimeError::NotFound("empty command line".to_owned()))?;
                let mut cmd = Command::new(program);
                cmd.args(args);
                Ok(cmd)
            }
            Self::Shell { script, shell } => {
                let mut cmd = Command::new(shell.as_deref().unwrap_or(Path::new(default_shell())));
                #[cfg(windows)]
                {
                    use std::os::windows::process::CommandExt;
                    cmd.arg("/C").raw_arg(script);
                }
                #[cfg(not(windows))]
                cmd.arg("-c").arg(script);
                Ok(cmd)
            }
        }
    }
}

fn default_shell() -> &'static str {
    if cfg!(windows) {
        "cmd.exe"
    } else {
        "/bin/sh"
    }
}

/// Single-quote for display in a POSIX shell: `'` becomes `'\''`.
pub fn shell_quote(s: &str) -> String {
    if !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:+@%,".contains(c))
    {
        return s.to_owned();
    }
    format!("'{}'", s.replace('\'', "'\\''"))
}

/// Run a command to completion and capture stdout and stderr through one
/// pipe, so the text keeps the interleaving the OS produced.
pub fn execute(spec: &CommandSpec, cwd: Option<&Path>) -> Result<CommandResult, RuntimeError> {
    let (mut reader, writer) = std::io::pipe()?;
    let mut child = {
        let mut cmd = spec.to_command()?;
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }
        cmd.stdout(writer.try_clone()?).stderr(writer);
        cmd.spawn().map_err(|source| RuntimeError::Spawn {
            program: spec.program(),
            source,
        })?
        // `cmd` holds the parent's copies of the write end; dropping it here
        // lets the read below see EOF once the child exits.
    };

    let mut raw = Vec::new();
    let read = reader.read_to_end(&mut raw);
    // Reap the child before reporting a read failure.
    let status = child.wait()?;
    read?;

    Ok(CommandResult {
        command: spec.display(),
        exit_code: status.code(),
        output: String::from_utf8_lossy(&raw).into_owned(),
    })
}

/// Runs commands for one environment, labelling every banner with `at`.
#[derive(Debug, Clone)]
pub struct Runner {
    python: PathBuf,
    at: String,
}

impl Runner {
    pub fn new(python: impl Into<PathBuf>, at: impl Into<String>) -> Self {
        Self {
            python: python.into(),
            at: at.into(),
        }
    }

    /// Run this environment's interpreter with `args`, expecting exit code 0.
    pub fn python<I, S>(
        &self,
        args: I,
        title: &str,
        cwd: Option<&Path>,
        kind: FailureKind,
    ) -> Result<CommandResult, RuntimeError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut argv = vec![self.python.as_os_str().to_owned()];
        argv.extend(args.into_iter().map(|a| a.as_ref().to_owned()));
        self.command(&CommandSpec::Argv(argv), title, cwd, kind, 0)
    }

    pub fn command(
        &self,
        spec: &CommandSpec,
        title: &str,
        cwd: Option<&Path>,
        kind: FailureKind,
        expected_exit: i32,
    ) -> Result<CommandResult, RuntimeError> {
        print_command_banner(title, &self.at, &spec.display());

        let result = execute(spec, cwd)?;
        print_command_output(&result.output);
        debug!(
            "{} exited with {:?} (expected {expected_exit})",
            spec.program(),
            result.exit_code
        );

        if result.exit_code != Some(expected_exit) {
            return Err(RuntimeError::Command {
                kind,
                result: Box::new(result),
            });
        }
        Ok(result)
    }
}
