use super::{
    colorize_status, exit_code_for, json_pretty, EXIT_PROBE_FAILED, EXIT_SUCCESS,
    PLAN_ERROR_PREFIX,
};
use chrono::{DateTime, Utc};
use pkgcheck_core::{CoreError, Package, PackageOptions};
use pkgcheck_schema::{
    parse_plan_file, CheckPlanV1, NormalizedPlan, PackageSection, PlanError, PythonEntry,
    RequireSection, ShellEntry, DEFAULT_MARKER, PLAN_FILE_NAME,
};
use serde::Serialize;
use std::path::Path;
use tracing::{info, warn};

pub struct CheckArgs<'a> {
    pub project: &'a Path,
    pub plan: Option<&'a Path>,
    pub python: &'a [String],
    pub shell: &'a [String],
    pub expect_exit: i32,
    pub require_marker: &'a [String],
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct CheckReport {
    project: String,
    status: &'static str,
    wheel: Option<String>,
    error: Option<String>,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    probes: Vec<ProbeReport>,
}

#[derive(Debug, Serialize)]
struct ProbeReport {
    kind: &'static str,
    target: String,
    status: &'static str,
    output: Option<String>,
    error: Option<String>,
}

impl ProbeReport {
    fn passed(kind: &'static str, target: &str, output: String) -> Self {
        Self {
            kind,
            target: target.to_owned(),
            status: "passed",
            output: Some(output),
            error: None,
        }
    }

    fn failed(kind: &'static str, target: &str, output: Option<String>, error: String) -> Self {
        Self {
            kind,
            target: target.to_owned(),
            status: "failed",
            output,
            error: Some(error),
        }
    }

    fn from_result(
        kind: &'static str,
        target: &str,
        result: Result<String, CoreError>,
        expect_output: Option<&str>,
    ) -> Self {
        match result {
            Ok(out) => match expect_output {
                Some(expected) if out != expected => Self::failed(
                    kind,
                    target,
                    Some(out.clone()),
                    format!("expected output {expected:?}, got {out:?}"),
                ),
                _ => Self::passed(kind, target, out),
            },
            Err(e) => Self::failed(
                kind,
                target,
                e.command_output().map(|o| o.trim_end().to_owned()),
                e.to_string(),
            ),
        }
    }

    fn is_failed(&self) -> bool {
        self.status == "failed"
    }
}

fn plan_error(e: &PlanError) -> String {
    format!("{PLAN_ERROR_PREFIX} {e}")
}

/// The plan file (explicit, or `pkgcheck.toml` in the project) merged with
/// the probes given as flags.
pub fn load_plan(args: &CheckArgs<'_>) -> Result<NormalizedPlan, String> {
    let file = match args.plan {
        Some(path) => Some(path.to_path_buf()),
        None => {
            let default = args.project.join(PLAN_FILE_NAME);
            default.is_file().then_some(default)
        }
    };

    let mut plan = match file {
        Some(path) => {
            info!("using check plan {}", path.display());
            parse_plan_file(&path)
                .and_then(|plan| plan.normalize())
                .map_err(|e| plan_error(&e))?
        }
        None => NormalizedPlan {
            marker: DEFAULT_MARKER.to_owned(),
            ..NormalizedPlan::default()
        },
    };

    let from_flags = CheckPlanV1 {
        plan_version: 1,
        package: PackageSection::default(),
        python: args
            .python
            .iter()
            .map(|code| PythonEntry {
                code: code.clone(),
                expect_output: None,
            })
            .collect(),
        shell: args
            .shell
            .iter()
            .map(|code| ShellEntry {
                code: code.clone(),
                expect_exit: args.expect_exit,
                expect_output: None,
            })
            .collect(),
        require: RequireSection {
            markers: args.require_marker.to_vec(),
        },
    };
    plan.extend(from_flags.normalize().map_err(|e| plan_error(&e))?);
    Ok(plan)
}

fn run_probes(pkg: &Package, plan: &NormalizedPlan) -> Vec<ProbeReport> {
    let mut probes = Vec::new();
    for probe in &plan.python {
        let result = pkg.run_python_code(&probe.code);
        probes.push(ProbeReport::from_result(
            "python",
            &probe.code,
            result,
            probe.expect_output.as_deref(),
        ));
    }
    for probe in &plan.shell {
        let result = pkg.run_shell_code(&probe.code, probe.expect_exit);
        probes.push(ProbeReport::from_result(
            "shell",
            &probe.code,
            result,
            probe.expect_output.as_deref(),
        ));
    }
    for module in &plan.markers {
        let result = pkg
            .require_marker(module)
            .map(|path| path.display().to_string());
        probes.push(ProbeReport::from_result("marker", module, result, None));
    }
    probes
}

pub fn run(args: &CheckArgs<'_>) -> Result<u8, String> {
    let plan = load_plan(args)?;
    if plan.is_empty() {
        info!("no probes configured, checking build and install only");
    }
    let options = PackageOptions::from_env()
        .map_err(|e| e.to_string())?
        .with_marker(plan.marker.clone());

    let started_at = Utc::now();
    let mut report = CheckReport {
        project: std::path::absolute(args.project)
            .unwrap_or_else(|_| args.project.to_path_buf())
            .display()
            .to_string(),
        status: "ok",
        wheel: None,
        error: None,
        started_at,
        finished_at: started_at,
        probes: Vec::new(),
    };

    let code = match Package::open(args.project, options) {
        Ok(mut pkg) => {
            report.wheel = pkg.wheel_name().map(str::to_owned);
            report.probes = run_probes(&pkg, &plan);
            if let Err(e) = pkg.release() {
                warn!("cleanup failed: {e}");
            }
            let failed = report.probes.iter().filter(|p| p.is_failed()).count();
            if failed == 0 {
                EXIT_SUCCESS
            } else {
                report.status = "failed";
                report.error = Some(format!(
                    "{failed} of {} probes failed",
                    report.probes.len()
                ));
                EXIT_PROBE_FAILED
            }
        }
        Err(e) => {
            report.status = "failed";
            report.error = Some(e.to_string());
            exit_code_for(&e)
        }
    };
    report.finished_at = Utc::now();

    print_report(&report, args.json)?;
    Ok(code)
}

fn print_report(report: &CheckReport, json: bool) -> Result<(), String> {
    if json {
        println!("{}", json_pretty(report)?);
        return Ok(());
    }

    if !report.probes.is_empty() {
        println!();
        for probe in &report.probes {
            println!(
                "  {} {}: {}",
                colorize_status(probe.status),
                probe.kind,
                probe.target
            );
            if let Some(err) = &probe.error {
                println!("      {err}");
            }
        }
    }
    match &report.error {
        None => println!("\nPackage is OK!"),
        Some(err) => eprintln!("\nerror: {err}"),
    }
    Ok(())
}
