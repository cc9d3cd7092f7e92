use crate::RuntimeError;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// A uniquely named, initially empty directory that is removed when the
/// workspace is released or dropped.
///
/// Removal is best-effort: failures are logged and never surface as errors,
/// so tearing down a workspace can't mask the failure that caused it.
#[derive(Debug)]
pub struct ScopedWorkspace {
    dir: Option<tempfile::TempDir>,
    path: PathBuf,
}

impl ScopedWorkspace {
    /// Create `<tmp>/pkgcheck-<label>-XXXXXX`.
    pub fn acquire(label: &str) -> Result<Self, RuntimeError> {
        let dir = tempfile::Builder::new()
            .prefix(&format!("pkgcheck-{label}-"))
            .tempdir()?;
        let path = dir.path().to_path_buf();
        debug!("acquired workspace {}", path.display());
        Ok(Self {
            dir: Some(dir),
            path,
        })
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[inline]
    pub fn is_released(&self) -> bool {
        self.dir.is_none()
    }

    pub fn release(&mut self) {
        let Some(dir) = self.dir.take() else {
            return;
        };
        debug!("releasing workspace {}", self.path.display());
        if let Err(e) = dir.close() {
            debug!("workspace removal failed, retrying: {e}");
            force_remove(&self.path);
        }
    }
}

impl Drop for ScopedWorkspace {
    fn drop(&mut self) {
        self.release();
    }
}

/// Remove a directory tree even if the tools that filled it left read-only
/// entries behind. Errors are ignored.
fn force_remove(path: &Path) {
    if !path.exists() {
        return;
    }
    #[cfg(unix)]
    let _ = Command::new("chmod").arg("-R").arg("u+rwX").arg(path).status();
    #[cfg(windows)]
    let _ = Command::new("attrib")
        .arg("-R")
        .arg(path.join("*"))
        .args(["/S", "/D"])
        .status();
    if let Err(e) = std::fs::remove_dir_all(path) {
        debug!("giving up on {}: {e}", path.display());
    }
}
