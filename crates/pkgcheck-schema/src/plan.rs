use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// File name looked up in the project directory when no plan is given.
pub const PLAN_FILE_NAME: &str = "pkgcheck.toml";

/// Marker file a typed package ships next to its `__init__.py` (PEP 561).
pub const DEFAULT_MARKER: &str = "py.typed";

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("failed to read check plan: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse check plan: {0}")]
    ParseToml(#[from] toml::de::Error),
    #[error("unsupported plan_version: {0}, expected 1")]
    UnsupportedVersion(u32),
    #[error("{section} probe #{index} has empty code")]
    EmptyCode { section: &'static str, index: usize },
    #[error("package.marker must be a plain file name, got '{0}'")]
    InvalidMarker(String),
    #[error("invalid module name in require.markers: '{0}'")]
    InvalidModule(String),
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct CheckPlanV1 {
    pub plan_version: u32,
    #[serde(default)]
    pub package: PackageSection,
    #[serde(default)]
    pub python: Vec<PythonEntry>,
    #[serde(default)]
    pub shell: Vec<ShellEntry>,
    #[serde(default)]
    pub require: RequireSection,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct PackageSection {
    #[serde(default = "default_marker")]
    pub marker: String,
}

impl Default for PackageSection {
    fn default() -> Self {
        Self {
            marker: default_marker(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct PythonEntry {
    pub code: String,
    #[serde(default)]
    pub expect_output: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ShellEntry {
    pub code: String,
    #[serde(default)]
    pub expect_exit: i32,
    #[serde(default)]
    pub expect_output: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RequireSection {
    #[serde(default)]
    pub markers: Vec<String>,
}

fn default_marker() -> String {
    DEFAULT_MARKER.to_owned()
}

pub fn parse_plan_str(input: &str) -> Result<CheckPlanV1, PlanError> {
    Ok(toml::from_str(input)?)
}

pub fn parse_plan_file(path: impl AsRef<Path>) -> Result<CheckPlanV1, PlanError> {
    let content = fs::read_to_string(path)?;
    parse_plan_str(&content)
}
