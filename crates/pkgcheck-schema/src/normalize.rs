use crate::plan::{CheckPlanV1, PlanError, PythonEntry, ShellEntry};
use serde::{Deserialize, Serialize};

/// Validated check plan: code trimmed, marker checked, module list sorted
/// and deduplicated.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NormalizedPlan {
    pub marker: String,
    pub python: Vec<PythonProbe>,
    pub shell: Vec<ShellProbe>,
    pub markers: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PythonProbe {
    pub code: String,
    pub expect_output: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShellProbe {
    pub code: String,
    pub expect_exit: i32,
    pub expect_output: Option<String>,
}

impl CheckPlanV1 {
    pub fn normalize(&self) -> Result<NormalizedPlan, PlanError> {
        if self.plan_version != 1 {
            return Err(PlanError::UnsupportedVersion(self.plan_version));
        }

        let marker = self.package.marker.trim().to_owned();
        if marker.is_empty() || marker.contains(['/', '\\']) || marker == "." || marker == ".." {
            return Err(PlanError::InvalidMarker(self.package.marker.clone()));
        }

        let python = self
            .python
            .iter()
            .enumerate()
            .map(|(i, entry)| normalize_python(i, entry))
            .collect::<Result<Vec<_>, _>>()?;

        let shell = self
            .shell
            .iter()
            .enumerate()
            .map(|(i, entry)| normalize_shell(i, entry))
            .collect::<Result<Vec<_>, _>>()?;

        let mut markers = Vec::with_capacity(self.require.markers.len());
        for module in &self.require.markers {
            let module = module.trim();
            if !is_module_name(module) {
                return Err(PlanError::InvalidModule(module.to_owned()));
            }
            markers.push(module.to_owned());
        }
        markers.sort();
        markers.dedup();

        Ok(NormalizedPlan {
            marker,
            python,
            shell,
            markers,
        })
    }
}

impl NormalizedPlan {
    pub fn is_empty(&self) -> bool {
        self.python.is_empty() && self.shell.is_empty() && self.markers.is_empty()
    }

    /// Append probes given outside the plan file (e.g. on the command line).
    pub fn extend(&mut self, other: NormalizedPlan) {
        self.python.extend(other.python);
        self.shell.extend(other.shell);
        self.markers.extend(other.markers);
        self.markers.sort();
        self.markers.dedup();
    }
}

fn normalize_python(index: usize, entry: &PythonEntry) -> Result<PythonProbe, PlanError> {
    let code = entry.code.trim();
    if code.is_empty() {
        return Err(PlanError::EmptyCode {
            section: "python",
            index,
        });
    }
    Ok(PythonProbe {
        code: code.to_owned(),
        expect_output: entry.expect_output.clone(),
    })
}

fn normalize_shell(index: usize, entry: &ShellEntry) -> Result<ShellProbe, PlanError> {
    let code = entry.code.trim();
    if code.is_empty() {
        return Err(PlanError::EmptyCode {
            section: "shell",
            index,
        });
    }
    Ok(ShellProbe {
        code: code.to_owned(),
        expect_exit: entry.expect_exit,
        expect_output: entry.expect_output.clone(),
    })
}

/// Dotted Python identifier, e.g. `greeter` or `pkg.sub`.
pub fn is_module_name(name: &str) -> bool {
    !name.is_empty()
        && name.split('.').all(|part| {
            let mut chars = part.chars();
            matches!(chars.next(), Some(c) if c == '_' || c.is_alphabetic())
                && chars.all(|c| c == '_' || c.is_alphanumeric())
        })
}
