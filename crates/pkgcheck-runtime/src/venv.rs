use crate::lifecycle::{validate_transition, EnvState};
use crate::provision::Provisioner;
use crate::terminal::narrate;
use crate::workspace::ScopedWorkspace;
use crate::RuntimeError;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Well-known locations inside a virtual environment directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VenvPaths {
    dir: PathBuf,
}

impl VenvPaths {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[inline]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn find(candidates: &[PathBuf]) -> Result<PathBuf, RuntimeError> {
        candidates
            .iter()
            .find(|p| p.exists())
            .cloned()
            .ok_or_else(|| {
                RuntimeError::NotFound(
                    candidates
                        .iter()
                        .map(|p| p.display().to_string())
                        .collect::<Vec<_>>()
                        .join(" or "),
                )
            })
    }

    /// The environment's interpreter (`bin/python` or `Scripts/python.exe`).
    pub fn executable(&self) -> Result<PathBuf, RuntimeError> {
        Self::find(&[
            self.dir.join("bin").join("python"),
            self.dir.join("Scripts").join("python.exe"),
        ])
    }

    pub fn posix_activate(&self) -> Result<PathBuf, RuntimeError> {
        Self::find(&[self.dir.join("bin").join("activate")])
    }

    pub fn windows_activate(&self) -> Result<PathBuf, RuntimeError> {
        Self::find(&[self.dir.join("Scripts").join("activate.bat")])
    }
}

/// A virtual environment living in its own [`ScopedWorkspace`].
///
/// `enter` provisions it, `exit` (or drop) removes the whole directory no
/// matter what was installed into it.
pub struct VirtualEnv {
    label: String,
    provisioner: Arc<dyn Provisioner>,
    workspace: Option<ScopedWorkspace>,
    state: EnvState,
}

impl VirtualEnv {
    pub fn new(label: impl Into<String>, provisioner: Arc<dyn Provisioner>) -> Self {
        Self {
            label: label.into(),
            provisioner,
            workspace: None,
            state: EnvState::Uninitialized,
        }
    }

    #[inline]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[inline]
    pub fn state(&self) -> EnvState {
        self.state
    }

    pub fn dir(&self) -> Result<&Path, RuntimeError> {
        match (&self.workspace, self.state) {
            (Some(ws), EnvState::Provisioned) => Ok(ws.path()),
            _ => Err(RuntimeError::NotProvisioned),
        }
    }

    pub fn paths(&self) -> Result<VenvPaths, RuntimeError> {
        self.dir().map(VenvPaths::new)
    }

    /// Provision the environment and return the absolute path of its
    /// interpreter. If provisioning fails the workspace stays owned by this
    /// value and is removed on `exit`/drop.
    pub fn enter(&mut self) -> Result<PathBuf, RuntimeError> {
        validate_transition(self.state, EnvState::Provisioned)?;

        let workspace = ScopedWorkspace::acquire(&self.label)?;
        let dir = workspace.path().to_path_buf();
        self.workspace = Some(workspace);

        require_dir(&dir)?;
        narrate(&format!("Initializing venv in {}", dir.display()));
        info!(
            "provisioning {} environment with '{}'",
            self.label,
            self.provisioner.name()
        );
        self.provisioner.provision(&dir)?;
        require_dir(&dir)?;

        self.state = EnvState::Provisioned;
        self.paths()?.executable()
    }

    pub fn exit(&mut self) -> Result<(), RuntimeError> {
        if self.state == EnvState::TornDown {
            return Ok(());
        }
        validate_transition(self.state, EnvState::TornDown)?;
        if let Some(mut ws) = self.workspace.take() {
            narrate(&format!("Removing temp venv dir {}", ws.path().display()));
            ws.release();
        }
        self.state = EnvState::TornDown;
        Ok(())
    }
}

impl Drop for VirtualEnv {
    fn drop(&mut self) {
        let _ = self.exit();
    }
}

fn require_dir(dir: &Path) -> Result<(), RuntimeError> {
    if dir.is_dir() {
        Ok(())
    } else {
        Err(RuntimeError::WorkspaceMissing(dir.to_path_buf()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Lays out a POSIX-style venv skeleton without running anything.
    struct SkeletonProvisioner {
        fail: bool,
        seen: Mutex<Vec<PathBuf>>,
    }

    impl SkeletonProvisioner {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                fail,
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    impl Provisioner for SkeletonProvisioner {
        fn name(&self) -> &str {
            "skeleton"
        }

        fn available(&self) -> bool {
            true
        }

        fn provision(&self, dir: &Path) -> Result<(), RuntimeError> {
            self.seen.lock().unwrap().push(dir.to_path_buf());
            if self.fail {
                return Err(RuntimeError::NotFound("skeleton failure".to_owned()));
            }
            std::fs::create_dir_all(dir.join("bin"))?;
            std::fs::write(dir.join("bin").join("python"), "")?;
            std::fs::write(dir.join("bin").join("activate"), "")?;
            Ok(())
        }
    }

    #[test]
    fn enter_returns_executable_inside_workspace() {
        let provisioner = SkeletonProvisioner::new(false);
        let mut env = VirtualEnv::new("test", provisioner.clone());
        let exe = env.enter().unwrap();

        assert_eq!(env.state(), EnvState::Provisioned);
        let dir = env.dir().unwrap().to_path_buf();
        assert_eq!(exe, dir.join("bin").join("python"));
        assert_eq!(provisioner.seen.lock().unwrap().as_slice(), &[dir.clone()]);

        env.exit().unwrap();
        assert_eq!(env.state(), EnvState::TornDown);
        assert!(!dir.exists());
    }

    #[test]
    fn enter_twice_is_rejected() {
        let mut env = VirtualEnv::new("test", SkeletonProvisioner::new(false));
        env.enter().unwrap();
        assert!(matches!(
            env.enter(),
            Err(RuntimeError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn failed_provisioning_still_cleans_up() {
        let provisioner = SkeletonProvisioner::new(true);
        let dir = {
            let mut env = VirtualEnv::new("test", provisioner.clone());
            assert!(env.enter().is_err());
            assert_eq!(env.state(), EnvState::Uninitialized);
            provisioner.seen.lock().unwrap()[0].clone()
        };
        assert!(!dir.exists());
    }

    #[test]
    fn exit_is_idempotent() {
        let mut env = VirtualEnv::new("test", SkeletonProvisioner::new(false));
        env.enter().unwrap();
        env.exit().unwrap();
        env.exit().unwrap();
        assert!(env.dir().is_err());
    }

    #[test]
    fn exit_without_enter() {
        let mut env = VirtualEnv::new("test", SkeletonProvisioner::new(false));
        env.exit().unwrap();
        assert_eq!(env.state(), EnvState::TornDown);
        assert!(matches!(
            env.enter(),
            Err(RuntimeError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn paths_prefer_posix_layout() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("bin")).unwrap();
        std::fs::write(dir.path().join("bin/python"), "").unwrap();
        std::fs::write(dir.path().join("bin/activate"), "").unwrap();

        let paths = VenvPaths::new(dir.path());
        assert_eq!(paths.executable().unwrap(), dir.path().join("bin/python"));
        assert_eq!(paths.posix_activate().unwrap(), dir.path().join("bin/activate"));
        assert!(paths.windows_activate().is_err());
    }

    #[test]
    fn paths_find_windows_layout() {
        let dir = tempfile::tempdir().unwrap();
        let scripts = dir.path().join("Scripts");
        std::fs::create_dir_all(&scripts).unwrap();
        std::fs::write(scripts.join("python.exe"), "").unwrap();
        std::fs::write(scripts.join("activate.bat"), "").unwrap();

        let paths = VenvPaths::new(dir.path());
        assert_eq!(paths.executable().unwrap(), scripts.join("python.exe"));
        assert_eq!(paths.windows_activate().unwrap(), scripts.join("activate.bat"));
        assert!(paths.posix_activate().is_err());
    }

    #[test]
    fn missing_executable_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = VenvPaths::new(dir.path()).executable().unwrap_err();
        match err {
            RuntimeError::NotFound(msg) => assert!(msg.contains("python")),
            other => panic!("unexpected error: {other}"),
        }
    }
}
