//! Integration tests for the `shinobi` binary entry point.
//!
//! Tool steps are pointed at shell builtins through `shinobi.toml` so the
//! tests never invoke a real toolchain.

use std::fs;
use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::str::contains;
use tempfile::TempDir;

fn workspace(project_file: &str) -> TempDir {
    let dir = TempDir::new().expect("temp dir");
    fs::write(
        dir.path().join("Cargo.lock"),
        "version = 4\n\n[[package]]\nname = \"shinobid\"\nversion = \"0.1.0\"\n",
    )
    .expect("write lock");
    fs::write(dir.path().join("shinobi.toml"), project_file).expect("write project file");
    dir
}

fn shinobi(root: &Path) -> assert_cmd::Command {
    let mut command = cargo_bin_cmd!("shinobi");
    command.arg("--project-dir").arg(root);
    command
}

#[test]
fn help_lists_every_command() {
    let mut command = cargo_bin_cmd!("shinobi");
    command.arg("--help");
    command
        .assert()
        .success()
        .stdout(contains("install-dev"))
        .stdout(contains("clean"));
}

#[test]
fn invalid_configuration_fails_before_any_command_runs() {
    let dir = workspace("");
    let mut command = cargo_bin_cmd!("shinobi");
    command
        .args(["--port", "70000", "--project-dir"])
        .arg(dir.path())
        .arg("clean");
    command
        .assert()
        .failure()
        .stderr(contains("failed to load configuration"));
}

#[test]
fn clean_on_a_fresh_tree_succeeds() {
    let dir = workspace("");
    shinobi(dir.path())
        .arg("clean")
        .assert()
        .success()
        .stdout(contains("clean: removed 0 path(s)"));
}

#[test]
fn run_refuses_to_start_without_an_install() {
    let dir = workspace("");
    shinobi(dir.path())
        .arg("run")
        .assert()
        .failure()
        .stderr(contains("dependencies are not installed; run `shinobi install`"));
}

#[test]
fn lint_reports_every_check_before_failing() {
    let dir = workspace(
        r#"
[[tasks.lint]]
label = "style"
program = "false"

[[tasks.lint]]
label = "types"
program = "true"
"#,
    );
    shinobi(dir.path())
        .arg("lint")
        .assert()
        .failure()
        .stdout(contains("  style: FAILED"))
        .stdout(contains("  types: ok"))
        .stderr(contains("lint: 1 check(s) failed: style"));
}

#[test]
fn format_stops_at_the_first_failing_tool() {
    let dir = workspace(
        r#"
[[tasks.format]]
label = "fmt"
program = "false"

[[tasks.format]]
label = "sort"
program = "touch"
args = ["sorted"]
"#,
    );
    shinobi(dir.path()).arg("format").assert().failure();
    assert!(!dir.path().join("sorted").exists());
}

#[test]
fn test_mirrors_the_exit_code_of_the_suite() {
    let dir = workspace(
        r#"
[[tasks.test]]
label = "suite"
program = "sh"
args = ["-c", "exit 7"]
"#,
    );
    shinobi(dir.path()).arg("test").assert().code(7);
}

#[test]
fn missing_lock_files_fail_the_install() {
    let dir = workspace("");
    fs::remove_file(dir.path().join("Cargo.lock")).expect("remove lock");
    shinobi(dir.path())
        .arg("install")
        .assert()
        .failure()
        .stderr(contains("Cargo.lock"));
}
