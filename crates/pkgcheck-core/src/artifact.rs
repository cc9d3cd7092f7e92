use crate::CoreError;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

const WHEEL_EXTENSION: &str = "whl";

/// The `*.whl` file in `dir` with the newest modification time. Ties keep
/// whichever file directory iteration yields first.
pub fn find_latest_wheel(dir: &Path) -> Result<PathBuf, CoreError> {
    let mut latest: Option<(SystemTime, PathBuf)> = None;
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some(WHEEL_EXTENSION) {
            continue;
        }
        let meta = entry.metadata()?;
        if !meta.is_file() {
            continue;
        }
        let modified = meta.modified()?;
        if latest.as_ref().is_none_or(|(best, _)| modified > *best) {
            latest = Some((modified, path));
        }
    }
    latest
        .map(|(_, path)| path)
        .ok_or_else(|| CoreError::ArtifactNotFound(dir.to_path_buf()))
}
