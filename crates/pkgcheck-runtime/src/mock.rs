//! A provisioner that lays out a fake virtual environment whose `python` is a
//! POSIX shell script. It answers the handful of invocations the pipeline
//! makes (`-m pip`, `-m build`, `-m twine`, `-c`) with scripted results, so
//! the pipeline can be driven end to end without network access.

use crate::provision::Provisioner;
use crate::runner::shell_quote;
use crate::RuntimeError;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Name of the wheel the stub build tool writes into `--outdir`.
pub const STUB_WHEEL_NAME: &str = "stub_pkg-0.1.0-py3-none-any.whl";
/// Egg-info directory the stub build tool leaves in the project directory.
pub const STUB_EGG_INFO: &str = "stub_pkg.egg-info";
/// Console script placed on `PATH` by the stub `activate` script.
pub const STUB_CLI: &str = "stub_cli";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StubBehavior {
    /// `pip install --upgrade ...` (tool bootstrap) exits non-zero.
    pub fail_bootstrap: bool,
    /// `-m build` exits non-zero after touching the project tree.
    pub fail_build: bool,
    /// `-m build` succeeds but writes no wheel.
    pub skip_wheel: bool,
    /// `-m twine check` reports invalid metadata.
    pub fail_validation: bool,
    /// `pip install --force-reinstall <wheel>` fails.
    pub fail_install: bool,
    /// File reported by the module-location snippet. `None` simulates a
    /// module that cannot be imported.
    pub module_file: Option<PathBuf>,
}

#[derive(Debug, Default)]
pub struct StubProvisioner {
    behavior: StubBehavior,
    provisioned: Mutex<Vec<PathBuf>>,
}

impl StubProvisioner {
    pub fn new(behavior: StubBehavior) -> Self {
        Self {
            behavior,
            provisioned: Mutex::new(Vec::new()),
        }
    }

    /// Every directory this provisioner has populated, in order.
    pub fn provisioned(&self) -> Vec<PathBuf> {
        self.provisioned
            .lock()
            .map(|dirs| dirs.clone())
            .unwrap_or_default()
    }

    fn python_script(&self) -> String {
        let b = &self.behavior;
        let code = |fail: bool| u8::from(fail);
        let (module_line, module_exit) = match &b.module_file {
            Some(file) => (
                format!(
                    "printf 'importing...\\n<<pkgcheck<<%s>>pkgcheck>>\\n' {}",
                    shell_quote(&file.to_string_lossy())
                ),
                0,
            ),
            None => (
                "echo \"ModuleNotFoundError: No module named stub\" >&2".to_owned(),
                1,
            ),
        };

        let mut s = String::from("#!/bin/sh\n");
        let _ = writeln!(s, "if [ \"$1\" = \"-c\" ]; then");
        let _ = writeln!(s, "  case \"$2\" in");
        let _ = writeln!(s, "    *'<<pkgcheck<<'*) {module_line}; exit {module_exit};;");
        let _ = writeln!(s, "  esac");
        let _ = writeln!(s, "  exec /bin/sh -c \"$2\"");
        let _ = writeln!(s, "fi");
        let _ = writeln!(s, "[ \"$1\" = \"-m\" ] || {{ echo \"stub python: $*\" >&2; exit 64; }}");
        let _ = writeln!(s, "case \"$2\" in");
        let _ = writeln!(s, "  pip)");
        let _ = writeln!(s, "    case \"$*\" in");
        let _ = writeln!(
            s,
            "      *--force-reinstall*) echo \"stub pip: installing\"; exit {};;",
            code(b.fail_install)
        );
        let _ = writeln!(s, "    esac");
        let _ = writeln!(s, "    echo \"stub pip: $*\"; exit {};;", code(b.fail_bootstrap));
        let _ = writeln!(s, "  build)");
        let _ = writeln!(s, "    outdir=");
        let _ = writeln!(s, "    while [ $# -gt 0 ]; do");
        let _ = writeln!(s, "      [ \"$1\" = \"--outdir\" ] && outdir=\"$2\"");
        let _ = writeln!(s, "      shift");
        let _ = writeln!(s, "    done");
        let _ = writeln!(s, "    mkdir -p build/lib {STUB_EGG_INFO}");
        if b.fail_build {
            let _ = writeln!(s, "    echo \"stub build: backend failed\" >&2; exit 1;;");
        } else if b.skip_wheel {
            let _ = writeln!(s, "    echo \"stub build: nothing to do\"; exit 0;;");
        } else {
            let _ = writeln!(s, "    : > \"$outdir/{STUB_WHEEL_NAME}\"");
            let _ = writeln!(s, "    echo \"Successfully built {STUB_WHEEL_NAME}\"; exit 0;;");
        }
        let _ = writeln!(s, "  twine)");
        if b.fail_validation {
            let _ = writeln!(
                s,
                "    echo \"Checking $4: FAILED\"; echo \"ERROR long_description has syntax errors\"; exit 1;;"
            );
        } else {
            let _ = writeln!(s, "    echo \"Checking $4: PASSED\"; exit 0;;");
        }
        let _ = writeln!(s, "esac");
        let _ = writeln!(s, "echo \"stub python: unsupported module $2\" >&2");
        let _ = writeln!(s, "exit 64");
        s
    }

    fn activate_script(dir: &Path) -> String {
        format!(
            "VIRTUAL_ENV={}\nexport VIRTUAL_ENV\nPATH=\"$VIRTUAL_ENV/bin:$PATH\"\nexport PATH\n",
            shell_quote(&dir.to_string_lossy())
        )
    }

    fn cli_script() -> String {
        "#!/bin/sh\n\
         if [ \"$1\" = \"hi\" ]; then echo \"hi!\"; exit 0; fi\n\
         echo \"get your feet back on the ground\"\n\
         exit 2\n"
            .to_owned()
    }
}

impl Provisioner for StubProvisioner {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn available(&self) -> bool {
        cfg!(unix)
    }

    #[cfg(unix)]
    fn provision(&self, dir: &Path) -> Result<(), RuntimeError> {
        use std::os::unix::fs::PermissionsExt;

        let bin = dir.join("bin");
        std::fs::create_dir_all(&bin)?;
        for (name, body) in [
            ("python", self.python_script()),
            (STUB_CLI, Self::cli_script()),
        ] {
            let path = bin.join(name);
            std::fs::write(&path, body)?;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))?;
        }
        std::fs::write(bin.join("activate"), Self::activate_script(dir))?;

        if let Ok(mut dirs) = self.provisioned.lock() {
            dirs.push(dir.to_path_buf());
        }
        Ok(())
    }

    #[cfg(not(unix))]
    fn provision(&self, _dir: &Path) -> Result<(), RuntimeError> {
        Err(RuntimeError::ProvisionerUnavailable("stub".to_owned()))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::runner::{FailureKind, Runner};
    use crate::venv::VenvPaths;
    use std::ffi::OsStr;

    fn provisioned(behavior: StubBehavior) -> (tempfile::TempDir, Runner) {
        let dir = tempfile::tempdir().unwrap();
        StubProvisioner::new(behavior).provision(dir.path()).unwrap();
        let exe = VenvPaths::new(dir.path()).executable().unwrap();
        (dir, Runner::new(exe, "stub"))
    }

    #[test]
    fn provision_lays_out_posix_venv() {
        let stub = StubProvisioner::default();
        let dir = tempfile::tempdir().unwrap();
        stub.provision(dir.path()).unwrap();

        let paths = VenvPaths::new(dir.path());
        assert!(paths.executable().is_ok());
        assert!(paths.posix_activate().is_ok());
        assert_eq!(stub.provisioned(), vec![dir.path().to_path_buf()]);
    }

    #[test]
    fn stub_build_writes_wheel_and_project_artifacts() {
        let (_venv, runner) = provisioned(StubBehavior::default());
        let project = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();

        runner
            .python(
                [
                    OsStr::new("-m"),
                    OsStr::new("build"),
                    OsStr::new("--outdir"),
                    out.path().as_os_str(),
                    OsStr::new("--wheel"),
                ],
                "Building",
                Some(project.path()),
                FailureKind::Command,
            )
            .unwrap();

        assert!(out.path().join(STUB_WHEEL_NAME).is_file());
        assert!(project.path().join("build").is_dir());
        assert!(project.path().join(STUB_EGG_INFO).is_dir());
    }

    #[test]
    fn stub_runs_code_through_shell() {
        let (_venv, runner) = provisioned(StubBehavior::default());
        let result = runner
            .python(["-c", "echo 2"], "Code", None, FailureKind::Execution)
            .unwrap();
        assert_eq!(result.output.trim_end(), "2");
    }

    #[test]
    fn stub_validation_failure() {
        let (_venv, runner) = provisioned(StubBehavior {
            fail_validation: true,
            ..StubBehavior::default()
        });
        let err = runner
            .python(
                ["-m", "twine", "check", "x.whl", "--strict"],
                "Twine check",
                None,
                FailureKind::Validation,
            )
            .unwrap_err();
        assert_eq!(err.failure_kind(), Some(FailureKind::Validation));
        assert!(err.command_result().unwrap().output.contains("FAILED"));
    }

    #[test]
    fn stub_reports_module_file() {
        let (_venv, runner) = provisioned(StubBehavior {
            module_file: Some(PathBuf::from("/site/greeter/__init__.py")),
            ..StubBehavior::default()
        });
        let result = runner
            .python(
                ["-c", "print('<<pkgcheck<<' + 'x')"],
                "Locate",
                None,
                FailureKind::Execution,
            )
            .unwrap();
        assert!(result
            .output
            .contains("<<pkgcheck<</site/greeter/__init__.py>>pkgcheck>>"));
    }
}
