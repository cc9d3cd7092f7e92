use crate::CoreError;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const BUILD_DIR: &str = "build";
const DIST_DIR: &str = "dist";
const EGG_INFO_GLOB: &str = "*.egg-info";

/// Existence-diff rollback of the directories a build backend drops into
/// the project tree.
///
/// On construction the guard records whether `build/` and `dist/` exist and
/// which `*.egg-info` directories are present. `release` observes the same
/// three things again and removes only what appeared in between, so
/// pre-existing developer artifacts are never touched.
#[derive(Debug)]
pub struct ArtifactDirGuard {
    project_dir: PathBuf,
    pattern: String,
    had_build: bool,
    had_dist: bool,
    egg_infos: BTreeSet<PathBuf>,
    released: bool,
}

impl ArtifactDirGuard {
    pub fn new(project_dir: &Path) -> Result<Self, CoreError> {
        let project_dir = std::path::absolute(project_dir)?;
        let pattern = format!(
            "{}/{EGG_INFO_GLOB}",
            glob::Pattern::escape(&project_dir.to_string_lossy())
        );
        let egg_infos = egg_info_dirs(&pattern)?;
        let had_build = project_dir.join(BUILD_DIR).exists();
        let had_dist = project_dir.join(DIST_DIR).exists();
        debug!(
            "guarding {}: build={had_build} dist={had_dist} egg-info={}",
            project_dir.display(),
            egg_infos.len()
        );
        Ok(Self {
            project_dir,
            pattern,
            had_build,
            had_dist,
            egg_infos,
            released: false,
        })
    }

    #[inline]
    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    #[inline]
    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Directories that exist now but did not exist at construction time.
    pub fn created(&self) -> Vec<PathBuf> {
        let mut created = Vec::new();
        for (name, existed) in [(BUILD_DIR, self.had_build), (DIST_DIR, self.had_dist)] {
            let path = self.project_dir.join(name);
            if !existed && path.exists() {
                created.push(path);
            }
        }
        let now = egg_info_dirs(&self.pattern).unwrap_or_default();
        created.extend(now.difference(&self.egg_infos).cloned());
        created
    }

    /// Remove everything the guarded operation created. Safe to call more
    /// than once; deletion failures are logged and otherwise ignored.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        for path in self.created() {
            info!("removing build artifact {}", path.display());
            if let Err(e) = std::fs::remove_dir_all(&path) {
                debug!("failed to remove {}: {e}", path.display());
            }
        }
    }
}

impl Drop for ArtifactDirGuard {
    fn drop(&mut self) {
        self.release();
    }
}

fn egg_info_dirs(pattern: &str) -> Result<BTreeSet<PathBuf>, CoreError> {
    Ok(glob::glob(pattern)?
        .filter_map(Result::ok)
        .filter(|p| p.is_dir())
        .collect())
}
