#![cfg(unix)]

use assert_cmd::Command;
use predicates::prelude::*;
use serial_test::serial;
use std::fs;
use tempfile::TempDir;

fn devctl(project: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("devctl").unwrap();
    cmd.current_dir(project.path())
        .env_remove("DEVCTL_PROJECT")
        .env("NO_COLOR", "1");
    cmd
}

#[test]
#[serial]
fn test_start_status_logs_stop() {
    let project = TempDir::new().unwrap();
    fs::write(
        project.path().join("devctl.json"),
        r#"{"adapters": [{
            "name": "api",
            "start": "sh -c 'echo booting; echo listening; exec sleep 30'",
            "readyPattern": "listening",
            "readyTimeoutMs": 5000
        }]}"#,
    )
    .unwrap();

    devctl(&project)
        .arg("start")
        .assert()
        .success()
        .stdout(predicate::str::contains("api"));

    let registry = fs::read_to_string(project.path().join(".devctl/registry.json")).unwrap();
    assert!(registry.contains("\"status\": \"running\""));

    devctl(&project)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("running"));

    devctl(&project)
        .args(["logs", "api", "-n", "5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("booting"))
        .stdout(predicate::str::contains("listening"));

    devctl(&project)
        .arg("stop")
        .assert()
        .success()
        .stdout(predicate::str::contains("Stopped api"));

    devctl(&project)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("stopped"));

    let registry = fs::read_to_string(project.path().join(".devctl/registry.json")).unwrap();
    assert!(registry.contains("\"status\": \"stopped\""));
}

#[test]
#[serial]
fn test_failed_start_exits_nonzero() {
    let project = TempDir::new().unwrap();
    fs::write(
        project.path().join("devctl.json"),
        r#"{"adapters": [{
            "name": "broken",
            "start": "sh -c 'echo oops; exit 1'",
            "readyPattern": "listening"
        }]}"#,
    )
    .unwrap();

    devctl(&project)
        .arg("start")
        .assert()
        .failure()
        .stdout(predicate::str::contains(
            "broken exited before becoming ready (exit code: 1)",
        ));
}

#[test]
#[serial]
fn test_flat_log_layout() {
    let project = TempDir::new().unwrap();
    fs::write(
        project.path().join("devctl.json"),
        r#"{
            "adapters": [{"name": "web", "start": "sh -c 'echo hi; exec sleep 30'", "readyPattern": "hi"}],
            "logs": {"layout": "flat"}
        }"#,
    )
    .unwrap();

    devctl(&project).arg("start").assert().success();
    assert!(project.path().join(".devctl-web.log").exists());
    devctl(&project).arg("stop").assert().success();
}

#[test]
#[serial]
fn test_append_mode_server_survives_start() {
    let project = TempDir::new().unwrap();
    fs::write(
        project.path().join("devctl.json"),
        r#"{
            "adapters": [{
                "name": "ticker",
                "start": "sh -c 'echo ready; while true; do echo tick; sleep 0.1; done'",
                "readyPattern": "ready"
            }],
            "logs": {"mode": "append"}
        }"#,
    )
    .unwrap();

    devctl(&project).arg("start").assert().success();
    let log = project.path().join(".devctl/logs/ticker.log");
    let before = fs::metadata(&log).unwrap().len();
    std::thread::sleep(std::time::Duration::from_millis(500));
    assert!(fs::metadata(&log).unwrap().len() > before);

    devctl(&project)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("running"));

    devctl(&project).arg("stop").assert().success();
    devctl(&project)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("stopped"));
}
