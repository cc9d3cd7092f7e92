use crate::artifact::find_latest_wheel;
use crate::guard::ArtifactDirGuard;
use crate::marker::{module_path_snippet, parse_module_path, require_marker_beside};
use crate::release::ReleaseStack;
use crate::CoreError;
use pkgcheck_runtime::{
    host_shell, select_provisioner, CommandResult, FailureKind, Provisioner, Runner,
    ScopedWorkspace, ShellStrategy, VenvPaths, VirtualEnv,
};
use pkgcheck_runtime::terminal::narrate;
use pkgcheck_schema::{is_module_name, DEFAULT_MARKER};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

const PROVISIONER_ENV: &str = "PKGCHECK_PROVISIONER";
const DEFAULT_PROVISIONER: &str = "venv";
const BUILDER_AT: &str = "builder venv";
const INSTALLER_AT: &str = "installer venv";

/// Provisioner named by `PKGCHECK_PROVISIONER`, `venv` when unset or empty.
pub fn configured_provisioner() -> String {
    std::env::var(PROVISIONER_ENV)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_PROVISIONER.to_owned())
}

/// Whether probe output is returned as captured or with trailing whitespace
/// removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    #[default]
    Trimmed,
    Raw,
}

impl OutputMode {
    fn apply(self, result: CommandResult) -> String {
        match self {
            Self::Trimmed => result.output.trim_end().to_owned(),
            Self::Raw => result.output,
        }
    }
}

#[derive(Clone)]
pub struct PackageOptions {
    pub provisioner: Arc<dyn Provisioner>,
    /// Upgrade pip in both environments before using it.
    pub upgrade_pip: bool,
    /// File `require_marker` looks for next to a module.
    pub marker: String,
}

impl PackageOptions {
    pub fn new(provisioner: Arc<dyn Provisioner>) -> Self {
        Self {
            provisioner,
            upgrade_pip: true,
            marker: DEFAULT_MARKER.to_owned(),
        }
    }

    /// Options with the provisioner named by [`configured_provisioner`].
    pub fn from_env() -> Result<Self, CoreError> {
        let provisioner =
            select_provisioner(&configured_provisioner()).map_err(CoreError::Runtime)?;
        Ok(Self::new(provisioner))
    }

    #[must_use]
    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        self.marker = marker.into();
        self
    }
}

/// The environment the wheel was installed into, plus what is needed to run
/// probes inside it.
struct InstalledEnv {
    runner: Runner,
    shell: Box<dyn ShellStrategy>,
    wheel_name: String,
}

/// A project directory built into a wheel, validated, and installed into a
/// fresh environment.
///
/// `initialize` runs the whole build-validate-install sequence; afterwards
/// the `run_*` and `require_*` methods probe the installed package the way
/// an end user would see it. Every environment created along the way is
/// removed by `release` or on drop, newest first.
pub struct Package {
    project_dir: PathBuf,
    options: PackageOptions,
    resources: ReleaseStack,
    installed: Option<InstalledEnv>,
    initialized: bool,
}

impl Package {
    pub fn new(project_dir: impl AsRef<Path>, options: PackageOptions) -> Result<Self, CoreError> {
        Ok(Self {
            project_dir: std::path::absolute(project_dir)?,
            options,
            resources: ReleaseStack::new(),
            installed: None,
            initialized: false,
        })
    }

    /// Construct and initialize in one step. On failure everything acquired
    /// so far has already been released.
    pub fn open(project_dir: impl AsRef<Path>, options: PackageOptions) -> Result<Self, CoreError> {
        let mut package = Self::new(project_dir, options)?;
        package.initialize()?;
        Ok(package)
    }

    #[inline]
    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    #[inline]
    pub fn options(&self) -> &PackageOptions {
        &self.options
    }

    /// File name of the wheel that was installed, once initialized.
    pub fn wheel_name(&self) -> Option<&str> {
        self.installed.as_ref().map(|i| i.wheel_name.as_str())
    }

    /// Labels of the resources currently held, in acquisition order.
    pub fn held_resources(&self) -> Vec<String> {
        self.resources.labels()
    }

    /// Build, validate, and install the package. May be called once; any
    /// failure leaves the acquired resources on the release stack.
    pub fn initialize(&mut self) -> Result<(), CoreError> {
        if self.initialized {
            return Err(CoreError::AlreadyInitialized);
        }
        self.initialized = true;
        info!("checking package in {}", self.project_dir.display());

        let (builder, _) = self.create_env("build", BUILDER_AT)?;
        if self.options.upgrade_pip {
            upgrade_pip(&builder)?;
        }
        builder.python(
            ["-m", "pip", "install", "--upgrade", "build"],
            "Installing build",
            None,
            FailureKind::EnvironmentInit,
        )?;

        let dist = ScopedWorkspace::acquire("dist").map_err(CoreError::Runtime)?;
        {
            let _guard = ArtifactDirGuard::new(&self.project_dir)?;
            builder.python(
                [
                    OsStr::new("-m"),
                    OsStr::new("build"),
                    OsStr::new("--outdir"),
                    dist.path().as_os_str(),
                    OsStr::new("--wheel"),
                ],
                "Building the .whl",
                Some(&self.project_dir),
                FailureKind::Build,
            )?;
        }

        let wheel = find_latest_wheel(dist.path())?;
        narrate(&format!("Latest wheel: {}", wheel.display()));

        builder.python(
            ["-m", "pip", "install", "--upgrade", "twine"],
            "Installing twine",
            None,
            FailureKind::EnvironmentInit,
        )?;
        builder.python(
            [
                OsStr::new("-m"),
                OsStr::new("twine"),
                OsStr::new("check"),
                wheel.as_os_str(),
                OsStr::new("--strict"),
            ],
            "Twine check",
            None,
            FailureKind::Validation,
        )?;

        let (installer, installer_paths) = self.create_env("install", INSTALLER_AT)?;
        if self.options.upgrade_pip {
            upgrade_pip(&installer)?;
        }
        let wheel_name = wheel
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        installer.python(
            [
                OsStr::new("-m"),
                OsStr::new("pip"),
                OsStr::new("install"),
                OsStr::new("--force-reinstall"),
                wheel.as_os_str(),
            ],
            &format!("Installing {wheel_name}"),
            None,
            FailureKind::Install,
        )?;

        let shell = host_shell(&installer_paths).map_err(CoreError::EnvironmentInit)?;
        debug!("shell probes will run through {}", shell.name());

        self.installed = Some(InstalledEnv {
            runner: installer,
            shell,
            wheel_name,
        });
        Ok(())
    }

    /// Provision a new environment and push it onto the release stack,
    /// whether or not provisioning succeeded.
    fn create_env(&mut self, label: &str, at: &str) -> Result<(Runner, VenvPaths), CoreError> {
        let mut env = VirtualEnv::new(label, Arc::clone(&self.options.provisioner));
        let entered = env
            .enter()
            .and_then(|python| env.paths().map(|paths| (python, paths)));
        self.resources.push(Box::new(env));
        let (python, paths) = entered.map_err(CoreError::EnvironmentInit)?;
        debug!("{label} environment at {}", paths.dir().display());
        Ok((Runner::new(python, at), paths))
    }

    fn installed(&self) -> Result<&InstalledEnv, CoreError> {
        self.installed.as_ref().ok_or(CoreError::NotInitialized)
    }

    /// Run `code` with the installed environment's interpreter, in an empty
    /// scratch directory, and return its right-trimmed output.
    pub fn run_python_code(&self, code: &str) -> Result<String, CoreError> {
        self.run_python_code_with(code, OutputMode::Trimmed)
    }

    pub fn run_python_code_with(&self, code: &str, mode: OutputMode) -> Result<String, CoreError> {
        let installed = self.installed()?;
        let scratch = ScopedWorkspace::acquire("cwd").map_err(CoreError::Runtime)?;
        let result = installed.runner.python(
            [OsStr::new("-c"), OsStr::new(code)],
            "Running Python code (cwd is temp dir)",
            Some(scratch.path()),
            FailureKind::Execution,
        )?;
        Ok(mode.apply(result))
    }

    /// Run `code` through the host shell with the installed environment
    /// activated. Succeeds when the exit code equals `expected_exit`.
    pub fn run_shell_code(&self, code: &str, expected_exit: i32) -> Result<String, CoreError> {
        self.run_shell_code_with(code, expected_exit, OutputMode::Trimmed)
    }

    pub fn run_shell_code_with(
        &self,
        code: &str,
        expected_exit: i32,
        mode: OutputMode,
    ) -> Result<String, CoreError> {
        let installed = self.installed()?;
        let scratch = ScopedWorkspace::acquire("cwd").map_err(CoreError::Runtime)?;
        let prepared = installed
            .shell
            .prepare(code, scratch.path())
            .map_err(CoreError::Runtime)?;
        let result = installed.runner.command(
            &prepared.spec,
            prepared.title,
            Some(scratch.path()),
            FailureKind::Execution,
            expected_exit,
        )?;
        Ok(mode.apply(result))
    }

    /// Locate the installed file of `module` and require the configured
    /// marker file next to it. Returns the marker's path.
    pub fn require_marker(&self, module: &str) -> Result<PathBuf, CoreError> {
        self.require_marker_named(module, &self.options.marker)
    }

    /// `require_marker` for the PEP 561 `py.typed` marker.
    pub fn require_pytyped(&self, module: &str) -> Result<PathBuf, CoreError> {
        self.require_marker_named(module, DEFAULT_MARKER)
    }

    fn require_marker_named(&self, module: &str, marker: &str) -> Result<PathBuf, CoreError> {
        if !is_module_name(module) {
            return Err(CoreError::InvalidModuleName(module.to_owned()));
        }
        let installed = self.installed()?;
        let scratch = ScopedWorkspace::acquire("cwd").map_err(CoreError::Runtime)?;
        let result = installed
            .runner
            .python(
                [OsStr::new("-c"), OsStr::new(&module_path_snippet(module))],
                &format!("Locating module {module}"),
                Some(scratch.path()),
                FailureKind::Execution,
            )
            .map_err(|e| match e.command_result() {
                Some(r) => CoreError::ModuleNotFound {
                    module: module.to_owned(),
                    output: r.output.clone(),
                },
                None => CoreError::from(e),
            })?;
        let module_file =
            parse_module_path(&result.output).ok_or_else(|| CoreError::ModuleNotFound {
                module: module.to_owned(),
                output: result.output.clone(),
            })?;
        let found = require_marker_beside(&module_file, marker)?;
        info!("found {}", found.display());
        Ok(found)
    }

    /// Remove every environment and workspace, newest first. Probing after
    /// this fails with `NotInitialized`.
    pub fn release(&mut self) -> Result<(), CoreError> {
        self.installed = None;
        self.resources.release_all().map_err(CoreError::Runtime)
    }
}

impl Drop for Package {
    fn drop(&mut self) {
        let _ = self.release();
    }
}

fn upgrade_pip(runner: &Runner) -> Result<(), CoreError> {
    runner.python(
        ["-m", "pip", "install", "--upgrade", "pip"],
        "Upgrading pip",
        None,
        FailureKind::EnvironmentInit,
    )?;
    Ok(())
}
