//! Integration tests for the `homee` CLI binary.
//!
//! These cover argument parsing, config management, and error exit codes
//! without a live hub.
#![allow(clippy::unwrap_used)]

use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a command for the `homee` binary with env isolation.
///
/// Clears all `HOMEE_*` env vars and points config directories at `home`
/// so tests never touch the user's real configuration.
fn homee_cmd(home: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("homee");
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env("NO_COLOR", "1")
        .env_remove("HOMEE_PROFILE")
        .env_remove("HOMEE_HOST")
        .env_remove("HOMEE_USERNAME")
        .env_remove("HOMEE_PASSWORD")
        .env_remove("HOMEE_OUTPUT")
        .env_remove("HOMEE_TIMEOUT")
        .env_remove("RUST_LOG");
    cmd
}

fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let home = tempfile::tempdir().unwrap();
    let output = homee_cmd(home.path()).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("Usage"));
}

#[test]
fn test_help_lists_commands() {
    let home = tempfile::tempdir().unwrap();
    homee_cmd(home.path()).arg("--help").assert().success().stdout(
        predicate::str::contains("homee")
            .and(predicate::str::contains("nodes"))
            .and(predicate::str::contains("watch"))
            .and(predicate::str::contains("config")),
    );
}

#[test]
fn test_version_flag() {
    let home = tempfile::tempdir().unwrap();
    homee_cmd(home.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("homee"));
}

#[test]
fn test_set_requires_numeric_value() {
    let home = tempfile::tempdir().unwrap();
    homee_cmd(home.path())
        .args(["set", "5", "51", "bright"])
        .assert()
        .code(2);
}

// ── Missing configuration ───────────────────────────────────────────

#[test]
fn test_without_hub_points_at_config() {
    let home = tempfile::tempdir().unwrap();
    homee_cmd(home.path())
        .args(["nodes", "list"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("No hub configured"));
}

#[test]
fn test_nodes_follow_flag_is_accepted() {
    let home = tempfile::tempdir().unwrap();
    homee_cmd(home.path())
        .args(["nodes", "ls", "--follow"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("No hub configured"));
}

#[test]
fn test_unknown_profile_exit_code() {
    let home = tempfile::tempdir().unwrap();
    homee_cmd(home.path())
        .args(["--profile", "office", "info"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("office"));
}

#[test]
fn test_host_without_credentials() {
    let home = tempfile::tempdir().unwrap();
    homee_cmd(home.path())
        .args(["--host", "127.0.0.1", "info"])
        .assert()
        .code(3);
}

#[test]
fn test_unreachable_hub_reports_connection_error() {
    let home = tempfile::tempdir().unwrap();
    // Nothing listens on the hub port locally; the first token request
    // fails and the timeout surfaces that failure.
    homee_cmd(home.path())
        .args([
            "--host", "127.0.0.1", "-u", "homee", "--password", "pw", "--timeout", "2",
            "nodes", "list",
        ])
        .assert()
        .code(7)
        .stderr(predicate::str::contains("127.0.0.1"));
}

// ── Config management ───────────────────────────────────────────────

#[test]
fn test_config_path() {
    let home = tempfile::tempdir().unwrap();
    homee_cmd(home.path())
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_config_add_then_profiles() {
    let home = tempfile::tempdir().unwrap();
    homee_cmd(home.path())
        .args(["config", "add", "home", "--hub", "10.0.0.2", "--user", "homee"])
        .assert()
        .success();
    homee_cmd(home.path())
        .args(["config", "add", "cabin", "--hub", "10.0.1.2", "--user", "homee"])
        .assert()
        .success();

    homee_cmd(home.path())
        .args(["config", "profiles"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("* home")
                .and(predicate::str::contains("  cabin"))
                .and(predicate::str::contains("10.0.1.2")),
        );

    homee_cmd(home.path())
        .args(["config", "use", "cabin"])
        .assert()
        .success();
    homee_cmd(home.path())
        .args(["config", "profiles"])
        .assert()
        .success()
        .stdout(predicate::str::contains("* cabin"));
}

#[test]
fn test_config_add_rejects_empty_host() {
    let home = tempfile::tempdir().unwrap();
    homee_cmd(home.path())
        .args(["config", "add", "home", "--hub", "", "--user", "homee"])
        .assert()
        .code(2);
}

#[test]
fn test_config_use_unknown_profile() {
    let home = tempfile::tempdir().unwrap();
    homee_cmd(home.path())
        .args(["config", "use", "missing"])
        .assert()
        .code(4);
}

#[test]
fn test_config_show_json() {
    let home = tempfile::tempdir().unwrap();
    homee_cmd(home.path())
        .args(["config", "add", "home", "--hub", "10.0.0.2", "--user", "homee"])
        .assert()
        .success();
    homee_cmd(home.path())
        .args(["-o", "json", "config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""host": "10.0.0.2""#));
}
