// ABOUTME: Integration tests for the berth CLI commands.
// ABOUTME: Validates --help output and init command behavior.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;

fn berth_cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("berth"))
}

#[test]
fn help_shows_commands() {
    berth_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("init"))
        .stdout(predicate::str::contains("deploy"))
        .stdout(predicate::str::contains("status"))
        .stdout(predicate::str::contains("logs"))
        .stdout(predicate::str::contains("destroy"));
}

#[test]
fn init_creates_config_file() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config_path = temp_dir.path().join("berth.yml");

    berth_cmd()
        .current_dir(temp_dir.path())
        .args(["init", "--base-domain", "apps.example.com"])
        .assert()
        .success();

    assert!(config_path.exists(), "berth.yml should be created");
    let content = fs::read_to_string(&config_path).unwrap();
    assert!(content.contains("base_domain:"));
    assert!(content.contains("apps.example.com"));
}

#[test]
fn init_refuses_to_overwrite_existing_config() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config_path = temp_dir.path().join("berth.yml");

    fs::write(&config_path, "base_domain: existing.example.com").unwrap();

    berth_cmd()
        .current_dir(temp_dir.path())
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn init_force_overwrites() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config_path = temp_dir.path().join("berth.yml");

    fs::write(&config_path, "base_domain: old.example.com").unwrap();

    berth_cmd()
        .current_dir(temp_dir.path())
        .args(["init", "--base-domain", "new.example.com", "--force"])
        .assert()
        .success();

    let content = fs::read_to_string(&config_path).unwrap();
    assert!(content.contains("new.example.com"));
}

#[test]
fn deploy_without_config_fails() {
    let temp_dir = tempfile::tempdir().unwrap();

    berth_cmd()
        .current_dir(temp_dir.path())
        .args(["deploy", "acme/shop"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("configuration file not found"));
}

#[test]
fn status_without_config_fails() {
    let temp_dir = tempfile::tempdir().unwrap();

    berth_cmd()
        .current_dir(temp_dir.path())
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("configuration file not found"));
}

#[test]
fn logs_requires_a_subdomain() {
    berth_cmd().arg("logs").assert().failure();
}
