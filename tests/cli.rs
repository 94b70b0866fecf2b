// ABOUTME: Integration tests for the lander CLI commands.
// ABOUTME: Validates --help output, startup failures, and the status command.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;

fn lander_cmd() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("lander"));
    for var in [
        "WORK_DIR",
        "DESTINATION_DIR",
        "SECRET_KEY",
        "INDEX_MESSAGE",
        "MAX_UPLOAD_SIZE",
        "PORT",
        "BIND_ADDR",
        "RUST_LOG",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

#[test]
fn help_shows_commands() {
    lander_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("status"));
}

#[test]
fn serve_refuses_to_start_without_secret() {
    let dir = tempfile::tempdir().unwrap();
    lander_cmd()
        .arg("serve")
        .env("WORK_DIR", dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "missing required environment variable: SECRET_KEY",
        ));
}

#[test]
fn serve_refuses_to_start_without_work_dir() {
    lander_cmd()
        .arg("serve")
        .env("SECRET_KEY", "abc")
        .assert()
        .failure()
        .stderr(predicate::str::contains("WORK_DIR"));
}

#[test]
fn serve_reports_missing_config_file() {
    let dir = tempfile::tempdir().unwrap();
    lander_cmd()
        .args(["serve", "--config"])
        .arg(dir.path().join("nope.yml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("configuration file not found"));
}

#[test]
fn serve_refuses_a_work_root_that_is_a_file() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("not-a-dir");
    fs::write(&file, "").unwrap();

    lander_cmd()
        .arg("serve")
        .env("WORK_DIR", &file)
        .env("SECRET_KEY", "abc")
        .assert()
        .failure()
        .stderr(predicate::str::contains("work root unusable"));
}

#[test]
fn status_on_empty_work_root() {
    let dir = tempfile::tempdir().unwrap();
    lander_cmd()
        .args(["status", "--work-dir"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Current: (none)"))
        .stdout(predicate::str::contains("Versions: 0"));
}

#[cfg(unix)]
#[test]
fn status_shows_current_version() {
    let dir = tempfile::tempdir().unwrap();
    let digest = lander::types::Digest::of(b"site");
    fs::create_dir(dir.path().join(digest.as_str())).unwrap();
    std::os::unix::fs::symlink(digest.as_str(), dir.path().join("current")).unwrap();

    lander_cmd()
        .arg("status")
        .env("WORK_DIR", dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("Current: {digest}")))
        .stdout(predicate::str::contains("Versions: 1"));
}

#[test]
fn status_requires_a_work_root() {
    lander_cmd()
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("WORK_DIR"));
}

#[cfg(unix)]
#[test]
fn status_json_is_machine_readable() {
    let dir = tempfile::tempdir().unwrap();
    let digest = lander::types::Digest::of(b"site");
    fs::create_dir(dir.path().join(digest.as_str())).unwrap();
    std::os::unix::fs::symlink(digest.as_str(), dir.path().join("current")).unwrap();

    let output = lander_cmd()
        .args(["status", "--json", "--work-dir"])
        .arg(dir.path())
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["current"], digest.as_str());
    assert_eq!(json["versions"], serde_json::json!([digest.as_str()]));
}

#[test]
fn status_with_config_needs_only_the_work_root() {
    let dir = tempfile::tempdir().unwrap();
    let work = dir.path().join("work");
    fs::create_dir(&work).unwrap();
    let config = dir.path().join("lander.yml");
    fs::write(
        &config,
        format!(
            "work_dir: {}\nsecret_key:\n  env: SECRET_KEY\n",
            work.display()
        ),
    )
    .unwrap();

    lander_cmd()
        .args(["status", "--config"])
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("Current: (none)"));
}
