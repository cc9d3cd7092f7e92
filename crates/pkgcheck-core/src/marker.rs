use crate::CoreError;
use std::path::{Path, PathBuf};

pub const MODULE_PATH_PREFIX: &str = "<<pkgcheck<<";
pub const MODULE_PATH_SUFFIX: &str = ">>pkgcheck>>";

/// Python snippet that imports `module` and prints its `__file__` between
/// the delimiters, so the path survives whatever else the import prints.
pub fn module_path_snippet(module: &str) -> String {
    format!(
        "import sys\nimport {module}\nprint('{MODULE_PATH_PREFIX}' + sys.modules['{module}'].__file__ + '{MODULE_PATH_SUFFIX}')"
    )
}

/// Extract the path printed by [`module_path_snippet`] from command output.
pub fn parse_module_path(output: &str) -> Option<PathBuf> {
    let start = output.find(MODULE_PATH_PREFIX)? + MODULE_PATH_PREFIX.len();
    let len = output[start..].find(MODULE_PATH_SUFFIX)?;
    let path = &output[start..start + len];
    (!path.is_empty()).then(|| PathBuf::from(path))
}

/// Require `marker` to be a regular file next to `module_file`.
pub fn require_marker_beside(module_file: &Path, marker: &str) -> Result<PathBuf, CoreError> {
    let dir = module_file.parent().unwrap_or_else(|| Path::new(""));
    let path = dir.join(marker);
    if path.is_file() {
        Ok(path)
    } else {
        Err(CoreError::MarkerNotFound(path))
    }
}
