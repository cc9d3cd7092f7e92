use crate::runner::{FailureKind, Runner};
use crate::RuntimeError;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Materializes a self-contained Python runtime, including its own package
/// installer, inside an existing empty directory.
pub trait Provisioner: Send + Sync {
    fn name(&self) -> &str;

    fn available(&self) -> bool;

    fn provision(&self, dir: &Path) -> Result<(), RuntimeError>;
}

pub fn select_provisioner(name: &str) -> Result<Arc<dyn Provisioner>, RuntimeError> {
    match name {
        "venv" => Ok(Arc::new(VenvProvisioner::from_env()?)),
        "stub" => Ok(Arc::new(crate::mock::StubProvisioner::default())),
        other => Err(RuntimeError::ProvisionerUnavailable(other.to_owned())),
    }
}

/// The interpreter used to create environments: `PKGCHECK_PYTHON` if set,
/// otherwise the first `python3`/`python` on `PATH`.
pub fn find_base_python() -> Result<PathBuf, RuntimeError> {
    if let Some(explicit) = std::env::var_os("PKGCHECK_PYTHON").filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(explicit));
    }
    ["python3", "python"]
        .iter()
        .find_map(|name| which::which(name).ok())
        .ok_or(RuntimeError::NoInterpreter)
}

/// Creates environments with `<python> -m venv --clear <dir>`.
#[derive(Debug, Clone)]
pub struct VenvProvisioner {
    python: PathBuf,
}

impl VenvProvisioner {
    pub fn new(python: impl Into<PathBuf>) -> Self {
        Self {
            python: python.into(),
        }
    }

    pub fn from_env() -> Result<Self, RuntimeError> {
        find_base_python().map(Self::new)
    }

    #[inline]
    pub fn python(&self) -> &Path {
        &self.python
    }
}

impl Provisioner for VenvProvisioner {
    fn name(&self) -> &'static str {
        "venv"
    }

    fn available(&self) -> bool {
        self.python.is_file() || which::which(&self.python).is_ok()
    }

    fn provision(&self, dir: &Path) -> Result<(), RuntimeError> {
        let runner = Runner::new(&self.python, "host");
        runner.python(
            [
                OsStr::new("-m"),
                OsStr::new("venv"),
                OsStr::new("--clear"),
                dir.as_os_str(),
            ],
            "Creating venv",
            None,
            FailureKind::EnvironmentInit,
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_known_provisioners() {
        assert!(select_provisioner("stub").is_ok());
        // "venv" depends on the host having Python; either outcome is valid
        match select_provisioner("venv") {
            Ok(p) => assert_eq!(p.name(), "venv"),
            Err(e) => assert!(matches!(e, RuntimeError::NoInterpreter)),
        }
    }

    #[test]
    fn select_unknown_provisioner_fails() {
        assert!(matches!(
            select_provisioner("conda"),
            Err(RuntimeError::ProvisionerUnavailable(_))
        ));
    }

    #[test]
    fn missing_interpreter_is_unavailable() {
        let p = VenvProvisioner::new("/nonexistent/pkgcheck/python3");
        assert!(!p.available());
    }

    #[cfg(unix)]
    #[test]
    fn failing_interpreter_is_environment_init_failure() {
        let dir = tempfile::tempdir().unwrap();
        let p = VenvProvisioner::new("/bin/false");
        let err = p.provision(dir.path()).unwrap_err();
        assert_eq!(err.failure_kind(), Some(FailureKind::EnvironmentInit));
    }
}
