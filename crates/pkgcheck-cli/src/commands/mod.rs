pub mod check;
pub mod completions;
pub mod doctor;
pub mod man_pages;

use pkgcheck_core::CoreError;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_PLAN_ERROR: u8 = 2;
pub const EXIT_VALIDATION_FAILED: u8 = 3;
pub const EXIT_INSTALL_FAILED: u8 = 4;
pub const EXIT_PROBE_FAILED: u8 = 5;

/// Errors starting with this prefix exit with [`EXIT_PLAN_ERROR`].
pub const PLAN_ERROR_PREFIX: &str = "check plan error:";

pub fn json_pretty(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization failed: {e}"))
}

/// Exit code for a failed pipeline run.
pub fn exit_code_for(err: &CoreError) -> u8 {
    match err {
        CoreError::Validation(_) => EXIT_VALIDATION_FAILED,
        CoreError::Install(_) => EXIT_INSTALL_FAILED,
        CoreError::Execution(_)
        | CoreError::MarkerNotFound(_)
        | CoreError::ModuleNotFound { .. }
        | CoreError::InvalidModuleName(_) => EXIT_PROBE_FAILED,
        _ => EXIT_FAILURE,
    }
}

pub fn colorize_status(status: &str) -> String {
    use console::Style;
    match status {
        "passed" => Style::new().green().apply_to(status).to_string(),
        "failed" => Style::new().red().bold().apply_to(status).to_string(),
        other => other.to_owned(),
    }
}
