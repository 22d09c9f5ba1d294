use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn devctl(project: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("devctl").unwrap();
    cmd.current_dir(project.path())
        .env_remove("DEVCTL_PROJECT")
        .env("NO_COLOR", "1");
    cmd
}

fn write_config(project: &TempDir, json: &str) {
    fs::write(project.path().join("devctl.json"), json).unwrap();
}

#[test]
fn test_cli_version() {
    let mut cmd = Command::cargo_bin("devctl").unwrap();
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("devctl"));
}

#[test]
fn test_cli_help() {
    let mut cmd = Command::cargo_bin("devctl").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("development servers"))
        .stdout(predicate::str::contains("start"))
        .stdout(predicate::str::contains("status"));
}

#[test]
fn test_missing_config_fails() {
    let project = TempDir::new().unwrap();
    devctl(&project)
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No devctl.json found"));
}

#[test]
fn test_invalid_config_fails() {
    let project = TempDir::new().unwrap();
    write_config(
        &project,
        r#"{"adapters": [{"name": "api", "start": "x", "readyPattern": "("}]}"#,
    );
    devctl(&project).arg("status").assert().failure();
}

#[test]
fn test_status_of_stopped_adapter() {
    let project = TempDir::new().unwrap();
    write_config(
        &project,
        r#"{"adapters": [{"name": "api", "start": "server --port 4001", "port": 4001}]}"#,
    );

    devctl(&project)
        .args(["status", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"name\": \"api\""))
        .stdout(predicate::str::contains("\"url\": \"http://localhost:4001\""));
}

#[test]
fn test_status_json_is_valid() {
    let project = TempDir::new().unwrap();
    write_config(
        &project,
        r#"{"adapters": [{"name": "a", "start": "x"}, {"name": "b", "start": "y"}]}"#,
    );

    let output = devctl(&project).args(["status", "--json"]).output().unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let rows = json.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["status"], "stopped");
    assert!(rows[0]["pid"].is_null());
}

#[test]
fn test_unknown_adapter_fails() {
    let project = TempDir::new().unwrap();
    write_config(&project, r#"{"adapters": [{"name": "api", "start": "x"}]}"#);

    devctl(&project)
        .args(["status", "web"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown adapter: web"));
}

#[test]
fn test_logs_placeholder_for_new_adapter() {
    let project = TempDir::new().unwrap();
    write_config(&project, r#"{"adapters": [{"name": "api", "start": "x"}]}"#);

    devctl(&project)
        .args(["logs", "api", "--no-colors"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No log file found"));
}

#[test]
fn test_project_flag() {
    let project = TempDir::new().unwrap();
    write_config(&project, r#"{"adapters": [{"name": "api", "start": "x"}]}"#);
    let elsewhere = TempDir::new().unwrap();

    devctl(&elsewhere)
        .arg("-C")
        .arg(project.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("api"));
}

#[test]
fn test_package_json_section() {
    let project = TempDir::new().unwrap();
    fs::write(
        project.path().join("package.json"),
        r#"{"name": "shop", "devctl": {"adapters": [{"name": "storefront", "start": "x"}]}}"#,
    )
    .unwrap();

    devctl(&project)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("storefront"));
}
