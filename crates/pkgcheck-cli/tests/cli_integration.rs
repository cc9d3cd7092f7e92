//! CLI subprocess integration tests.
//!
//! These tests invoke the `pkgcheck` binary as a subprocess and verify exit
//! codes, stdout content, and JSON output. Pipeline runs use the stub
//! provisioner, so no real Python or network is involved.

use std::path::Path;
use std::process::Command;

fn pkgcheck_bin() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_pkgcheck"));
    // The stub provisioner does not need python3 on the host
    cmd.env("PKGCHECK_SKIP_PREREQS", "1");
    cmd.env("PKGCHECK_PROVISIONER", "stub");
    cmd.env_remove("PKGCHECK_LOG");
    cmd
}

fn temp_project() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("pyproject.toml"),
        "[project]\nname = \"stub_pkg\"\nversion = \"0.1.0\"\n",
    )
    .unwrap();
    dir
}

fn write_plan(dir: &Path, content: &str) {
    std::fs::write(dir.join("pkgcheck.toml"), content).unwrap();
}

#[test]
fn cli_version_exits_zero() {
    let output = pkgcheck_bin().arg("--version").output().unwrap();
    assert!(output.status.success(), "pkgcheck --version must exit 0");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("pkgcheck"),
        "version output must contain 'pkgcheck': {stdout}"
    );
}

#[test]
fn cli_help_lists_commands() {
    let output = pkgcheck_bin().arg("--help").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for cmd in ["check", "doctor", "completions", "man-pages"] {
        assert!(stdout.contains(cmd), "help must list '{cmd}': {stdout}");
    }
}

#[test]
fn cli_unknown_command_fails() {
    let output = pkgcheck_bin().arg("frobnicate").output().unwrap();
    assert!(!output.status.success());
}

#[test]
fn cli_completions_bash() {
    let output = pkgcheck_bin()
        .args(["completions", "bash"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("pkgcheck"));
}

#[test]
fn cli_man_pages_written() {
    let dir = tempfile::tempdir().unwrap();
    let output = pkgcheck_bin()
        .arg("man-pages")
        .arg(dir.path())
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(dir.path().join("pkgcheck.1").is_file());
    assert!(dir.path().join("pkgcheck-check.1").is_file());
}

#[test]
fn cli_doctor_json_is_valid() {
    let output = pkgcheck_bin().args(["doctor", "--json"]).output().unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout);
    let json: serde_json::Value = serde_json::from_str(&stdout)
        .unwrap_or_else(|e| panic!("doctor --json must be valid JSON: {e}\n{stdout}"));
    assert!(json["checks"].is_array());
    assert!(json["healthy"].is_boolean());
}

#[test]
fn cli_unknown_provisioner_fails() {
    let project = temp_project();
    let output = pkgcheck_bin()
        .env("PKGCHECK_PROVISIONER", "conda")
        .arg("check")
        .arg(project.path())
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("conda"));
}

#[test]
fn cli_invalid_plan_exits_with_plan_error() {
    let project = temp_project();
    write_plan(project.path(), "plan_version = 2\n");
    let output = pkgcheck_bin()
        .arg("check")
        .arg(project.path())
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("check plan error"));
}

#[test]
fn cli_unknown_plan_field_is_rejected() {
    let project = temp_project();
    write_plan(project.path(), "plan_version = 1\nbogus = true\n");
    let output = pkgcheck_bin()
        .arg("check")
        .arg(project.path())
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
}

#[cfg(unix)]
mod stub_pipeline {
    use super::*;

    #[test]
    fn check_reports_ok() {
        let project = temp_project();
        let output = pkgcheck_bin()
            .arg("check")
            .arg(project.path())
            .output()
            .unwrap();
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(output.status.success(), "check must pass: {stdout}");
        assert!(stdout.contains("BUILDING THE .WHL"));
        assert!(stdout.contains("Package is OK!"));
        assert!(!project.path().join("build").exists());
    }

    #[test]
    fn check_json_report() {
        let project = temp_project();
        let output = pkgcheck_bin()
            .args(["check", "--json", "--python", "echo 2"])
            .arg(project.path())
            .output()
            .unwrap();
        assert!(output.status.success());

        let stdout = String::from_utf8_lossy(&output.stdout);
        let json: serde_json::Value = serde_json::from_str(&stdout)
            .unwrap_or_else(|e| panic!("check --json must be valid JSON: {e}\n{stdout}"));
        assert_eq!(json["status"], "ok");
        assert!(json["started_at"].is_string());
        assert!(json["finished_at"].is_string());
        assert_eq!(json["probes"][0]["kind"], "python");
        assert_eq!(json["probes"][0]["status"], "passed");
        assert_eq!(json["probes"][0]["output"], "2");
    }

    #[test]
    fn failing_probe_exits_with_probe_failure() {
        let project = temp_project();
        let output = pkgcheck_bin()
            .args(["check", "--json", "--python", "exit 3"])
            .arg(project.path())
            .output()
            .unwrap();
        assert_eq!(output.status.code(), Some(5));
        let json: serde_json::Value =
            serde_json::from_str(&String::from_utf8_lossy(&output.stdout)).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["probes"][0]["status"], "failed");
    }

    #[test]
    fn plan_expected_output_mismatch_fails() {
        let project = temp_project();
        write_plan(
            project.path(),
            "plan_version = 1\n[[python]]\ncode = \"echo 3\"\nexpect_output = \"2\"\n",
        );
        let output = pkgcheck_bin()
            .arg("check")
            .arg(project.path())
            .output()
            .unwrap();
        assert_eq!(output.status.code(), Some(5));
    }

    #[test]
    fn shell_probe_with_expected_exit() {
        if !Path::new("/bin/bash").exists() {
            return;
        }
        let project = temp_project();
        let output = pkgcheck_bin()
            .args(["check", "--shell", "exit 2", "--expect-exit", "2"])
            .arg(project.path())
            .output()
            .unwrap();
        assert!(output.status.success());
    }

    #[test]
    fn missing_marker_is_probe_failure() {
        let project = temp_project();
        let output = pkgcheck_bin()
            .args(["check", "--require-marker", "stub_pkg"])
            .arg(project.path())
            .output()
            .unwrap();
        assert_eq!(output.status.code(), Some(5));
    }
}
