use crate::provision::find_base_python;
use std::fmt;
use std::path::Path;
use std::process::Command;

/// A missing prerequisite with actionable install instructions.
#[derive(Debug)]
pub struct MissingPrereq {
    pub name: &'static str,
    pub purpose: &'static str,
    pub install_hint: &'static str,
}

impl fmt::Display for MissingPrereq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "  - {}: {} (install: {})",
            self.name, self.purpose, self.install_hint
        )
    }
}

fn python_can_create_venvs(python: &Path) -> bool {
    Command::new(python)
        .args(["-c", "import venv, ensurepip"])
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Check everything the `venv` provisioner and the shell probes need.
/// Returns a list of missing items. Empty list means all prerequisites are met.
pub fn check_prereqs() -> Vec<MissingPrereq> {
    let mut missing = Vec::new();

    match find_base_python() {
        Err(_) => missing.push(MissingPrereq {
            name: "python3",
            purpose: "creating the build and install environments",
            install_hint: "apt install python3 | dnf install python3 | brew install python, or set PKGCHECK_PYTHON",
        }),
        Ok(python) if !python_can_create_venvs(&python) => missing.push(MissingPrereq {
            name: "venv/ensurepip",
            purpose: "virtual environments with their own pip",
            install_hint: "apt install python3-venv (Debian/Ubuntu ship it separately)",
        }),
        Ok(_) => {}
    }

    if cfg!(unix) && !Path::new("/bin/bash").exists() {
        missing.push(MissingPrereq {
            name: "bash",
            purpose: "running shell probes inside the activated environment",
            install_hint: "apt install bash | apk add bash",
        });
    }

    missing
}

/// Format a list of missing prerequisites into a user-friendly error message.
pub fn format_missing(missing: &[MissingPrereq]) -> String {
    use std::fmt::Write as _;
    let mut msg = String::from("missing prerequisites:\n");
    for m in missing {
        let _ = writeln!(msg, "{m}");
    }
    msg.push_str("\npkgcheck needs these tools to build and install the package.");
    msg
}
