use super::{json_pretty, EXIT_FAILURE, EXIT_SUCCESS};
use pkgcheck_runtime::{check_prereqs, find_base_python, format_missing, select_provisioner};

pub fn run(json_output: bool) -> Result<u8, String> {
    let mut checks: Vec<Check> = Vec::new();
    let mut all_pass = true;

    match find_base_python() {
        Ok(python) => checks.push(Check::info(
            "base_python",
            &format!("Base interpreter: {}", python.display()),
        )),
        Err(e) => checks.push(Check::warn("base_python", &e.to_string())),
    }

    let missing = check_prereqs();
    if missing.is_empty() {
        checks.push(Check::pass(
            "prereqs",
            "python3 with venv/ensurepip and a shell for probes are available",
        ));
    } else {
        all_pass = false;
        checks.push(Check::fail("prereqs", &format_missing(&missing)));
    }

    let name = pkgcheck_core::configured_provisioner();
    match select_provisioner(&name) {
        Ok(p) if p.available() => checks.push(Check::pass(
            "provisioner",
            &format!("Provisioner '{name}' is available"),
        )),
        Ok(_) => {
            all_pass = false;
            checks.push(Check::fail(
                "provisioner",
                &format!("Provisioner '{name}' cannot run on this host"),
            ));
        }
        Err(e) => {
            all_pass = false;
            checks.push(Check::fail("provisioner", &e.to_string()));
        }
    }

    let tmp = std::env::temp_dir();
    if tmp.is_dir() {
        checks.push(Check::pass(
            "temp_dir",
            &format!("Temporary directory: {}", tmp.display()),
        ));
    } else {
        all_pass = false;
        checks.push(Check::fail(
            "temp_dir",
            &format!("Temporary directory {} does not exist", tmp.display()),
        ));
    }

    print_results(&checks, all_pass, json_output)
}

fn print_results(checks: &[Check], all_pass: bool, json_output: bool) -> Result<u8, String> {
    if json_output {
        let json = serde_json::json!({
            "healthy": all_pass,
            "checks": checks.iter().map(|c| serde_json::json!({
                "name": c.name,
                "status": c.status,
                "message": c.message,
            })).collect::<Vec<_>>(),
        });
        println!("{}", json_pretty(&json)?);
    } else {
        println!("pkgcheck doctor\n");
        for check in checks {
            let icon = match check.status {
                "pass" => "✓",
                "fail" => "✗",
                "warn" => "⚠",
                _ => "ℹ",
            };
            println!("  {icon} {}", check.message);
        }
        println!();
        if all_pass {
            println!("All checks passed.");
        } else {
            println!("Some checks failed. See above for details.");
        }
    }
    Ok(if all_pass { EXIT_SUCCESS } else { EXIT_FAILURE })
}

struct Check {
    name: &'static str,
    status: &'static str,
    message: String,
}

impl Check {
    fn new(name: &'static str, status: &'static str, message: &str) -> Self {
        Self {
            name,
            status,
            message: message.to_owned(),
        }
    }

    fn pass(name: &'static str, message: &str) -> Self {
        Self::new(name, "pass", message)
    }

    fn fail(name: &'static str, message: &str) -> Self {
        Self::new(name, "fail", message)
    }

    fn warn(name: &'static str, message: &str) -> Self {
        Self::new(name, "warn", message)
    }

    fn info(name: &'static str, message: &str) -> Self {
        Self::new(name, "info", message)
    }
}
