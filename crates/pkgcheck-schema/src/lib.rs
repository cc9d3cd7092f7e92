//! Check plan parsing and normalization for pkgcheck.
//!
//! A check plan (`pkgcheck.toml`) lists the probes to run against a freshly
//! installed wheel: Python snippets, shell snippets with their expected exit
//! codes, and modules that must ship a packaging marker such as `py.typed`.
//! This crate parses the TOML (`CheckPlanV1`) and produces the validated
//! `NormalizedPlan` that the CLI feeds into the pipeline.

pub mod normalize;
pub mod plan;

pub use normalize::{is_module_name, NormalizedPlan, PythonProbe, ShellProbe};
pub use plan::{
    parse_plan_file, parse_plan_str, CheckPlanV1, PackageSection, PlanError, PythonEntry,
    RequireSection, ShellEntry, DEFAULT_MARKER, PLAN_FILE_NAME,
};
