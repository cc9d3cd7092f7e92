//! End-to-end tests against a real Python interpreter.
//!
//! These tests are `#[ignore]` by default because they require:
//! - `python3` with the `venv` and `ensurepip` modules
//! - `/bin/bash` (unix)
//! - Network access (pip installs `build`, `twine`, and setuptools)
//!
//! Run with: `cargo test -p pkgcheck-core --test e2e -- --ignored`

use pkgcheck_core::{CoreError, Package, PackageOptions};
use pkgcheck_runtime::{check_prereqs, format_missing, VenvProvisioner};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

fn prereqs_available() -> bool {
    let missing = check_prereqs();
    if !missing.is_empty() {
        let msg = format_missing(&missing);
        assert!(
            std::env::var("CI").is_err(),
            "CI FATAL: E2E prerequisites missing, tests cannot silently skip in CI.\n{msg}"
        );
        eprintln!("skipping E2E: missing prerequisites: {msg}");
        return false;
    }
    true
}

fn copy_tree(from: &Path, to: &Path) {
    fs::create_dir_all(to).unwrap();
    for entry in fs::read_dir(from).unwrap() {
        let entry = entry.unwrap();
        let target = to.join(entry.file_name());
        if entry.file_type().unwrap().is_dir() {
            copy_tree(&entry.path(), &target);
        } else {
            fs::copy(entry.path(), &target).unwrap();
        }
    }
}

/// Copy a fixture project into a scratch directory so builds never touch
/// the source tree.
fn fixture(name: &str) -> (tempfile::TempDir, PathBuf) {
    let src = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    let tmp = tempfile::tempdir().unwrap();
    let dest = tmp.path().join(name);
    copy_tree(&src, &dest);
    (tmp, dest)
}

fn options() -> PackageOptions {
    PackageOptions::new(Arc::new(VenvProvisioner::from_env().unwrap()))
}

#[test]
#[ignore = "requires python3 with venv, bash, and network"]
fn e2e_greeter_installs_and_runs() {
    if !prereqs_available() {
        return;
    }
    let (_tmp, project) = fixture("greeter");
    let pkg = Package::open(&project, options()).unwrap();

    pkg.run_python_code("import greeter").unwrap();
    assert_eq!(
        pkg.run_python_code("import greeter; greeter.say_hi()")
            .unwrap(),
        "hi!"
    );
    assert_eq!(pkg.run_python_code("print(1+1)").unwrap(), "2");

    assert_eq!(pkg.run_shell_code("greeter_cli hi", 0).unwrap(), "hi!");
    pkg.run_shell_code("greeter_cli", 2).unwrap();
    assert!(matches!(
        pkg.run_shell_code("exit 2", 0),
        Err(CoreError::Execution(_))
    ));

    assert!(!project.join("build").exists());
    assert!(!project.join("greeter.egg-info").exists());
}

#[test]
#[ignore = "requires python3 with venv, bash, and network"]
fn e2e_invalid_metadata_fails_validation() {
    if !prereqs_available() {
        return;
    }
    let (_tmp, project) = fixture("invalid_metadata");
    let err = Package::open(&project, options()).err().unwrap();
    assert!(matches!(err, CoreError::Validation(_)), "{err}");
    assert!(!project.join("build").exists());
}

#[test]
#[ignore = "requires python3 with venv, bash, and network"]
fn e2e_pytyped_marker() {
    if !prereqs_available() {
        return;
    }
    let (_tmp, typed) = fixture("greeter_pytyped");
    let pkg = Package::open(&typed, options()).unwrap();
    let marker = pkg.require_pytyped("greeter").unwrap();
    assert!(marker.ends_with("greeter/py.typed"));
    drop(pkg);

    let (_tmp, untyped) = fixture("greeter");
    let pkg = Package::open(&untyped, options()).unwrap();
    assert!(matches!(
        pkg.require_pytyped("greeter"),
        Err(CoreError::MarkerNotFound(_))
    ));
}
