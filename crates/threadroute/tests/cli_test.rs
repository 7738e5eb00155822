//! Integration tests for the `threadroute` binary.
//!
//! Argument parsing, completions, configuration rendering and exit codes,
//! all without a router or multicast network.
#![allow(clippy::unwrap_used)]

use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the binary with env isolation.
///
/// Clears every variable the binary reads and points config directories
/// at a nonexistent path so tests never touch the user's configuration.
fn threadroute_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("threadroute");
    cmd.env("HOME", "/tmp/threadroute-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/threadroute-cli-test-nonexistent")
        .env_remove("THREADROUTE_CONFIG")
        .env_remove("THREADROUTE_ROUTER__PASSWORD")
        .env_remove("THREADROUTE_ROUTER__ENABLED")
        .env_remove("UBIQUITY_ENABLED")
        .env_remove("UBIQUITY_ROUTER_HOSTNAME")
        .env_remove("UBIQUITY_USERNAME")
        .env_remove("UBIQUITY_PASSWORD")
        .env_remove("UBIQUITY_INSECURE_SSL")
        .env_remove("ROUTE_GRACE_PERIOD")
        .env_remove("LOG_LEVEL")
        .env_remove("RUST_LOG");
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

fn write_config(dir: &Path, contents: &str) -> PathBuf {
    let path = dir.join("config.toml");
    std::fs::write(&path, contents).unwrap();
    path
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = threadroute_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    threadroute_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("Thread")
            .and(predicate::str::contains("run"))
            .and(predicate::str::contains("scan"))
            .and(predicate::str::contains("routes")),
    );
}

#[test]
fn test_version_flag() {
    threadroute_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("threadroute"));
}

#[test]
fn test_routes_subcommands_exist() {
    threadroute_cmd()
        .args(["routes", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("list").and(predicate::str::contains("plan")));
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_bash() {
    threadroute_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

#[test]
fn test_completions_zsh() {
    threadroute_cmd()
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

#[test]
fn test_completions_fish() {
    threadroute_cmd()
        .args(["completions", "fish"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

// ── Error cases ─────────────────────────────────────────────────────

#[test]
fn test_invalid_subcommand() {
    let output = threadroute_cmd().arg("foobar").output().unwrap();
    assert!(
        !output.status.success(),
        "Expected failure for invalid subcommand"
    );
    let text = combined_output(&output);
    assert!(
        text.contains("unrecognized") || text.contains("foobar"),
        "Expected error mentioning invalid subcommand:\n{text}"
    );
}

#[test]
fn test_invalid_output_format() {
    let output = threadroute_cmd()
        .args(["--output", "invalid", "config", "show"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    let text = combined_output(&output);
    assert!(
        text.contains("invalid") || text.contains("possible values"),
        "Expected error about valid output formats:\n{text}"
    );
}

#[test]
fn test_invalid_scan_timeout() {
    threadroute_cmd()
        .args(["scan", "--timeout", "soon"])
        .assert()
        .code(2);
}

// ── Configuration ───────────────────────────────────────────────────

#[test]
fn test_config_path_follows_flag() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("custom.toml");
    threadroute_cmd()
        .args(["config", "path", "-c"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("custom.toml"));
}

#[test]
fn test_config_show_no_config() {
    threadroute_cmd()
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("unifi.local")
                .and(predicate::str::contains("10m"))
                .and(predicate::str::contains("Thread route via")),
        );
}

#[test]
fn test_config_show_redacts_password() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        dir.path(),
        r#"
[router]
enabled = true
hostname = "router.lan"
password = "hunter2"
"#,
    );
    threadroute_cmd()
        .args(["config", "show", "-c"])
        .arg(&path)
        .assert()
        .success()
        .stdout(
            predicate::str::contains("router.lan")
                .and(predicate::str::contains("********"))
                .and(predicate::str::contains("hunter2").not()),
        );
}

#[test]
fn test_config_show_json() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        dir.path(),
        r#"
[routes]
grace_period = "30m"
"#,
    );
    let output = threadroute_cmd()
        .args(["config", "show", "-o", "json", "-c"])
        .arg(&path)
        .output()
        .unwrap();
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["routes"]["grace_period"], "30m");
    assert_eq!(value["router"]["enabled"], false);
}

#[test]
fn test_legacy_env_reaches_config() {
    threadroute_cmd()
        .args(["config", "show"])
        .env("UBIQUITY_ROUTER_HOSTNAME", "gw.example.net")
        .env("ROUTE_GRACE_PERIOD", "45m")
        .assert()
        .success()
        .stdout(predicate::str::contains("gw.example.net").and(predicate::str::contains("45m")));
}

#[test]
fn test_invalid_interval_is_usage_error() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        dir.path(),
        r#"
[routes]
reconcile_interval = "soon"
"#,
    );
    let output = threadroute_cmd()
        .args(["scan", "-c"])
        .arg(&path)
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    let text = combined_output(&output);
    assert!(
        text.contains("reconcile_interval"),
        "Expected the offending field:\n{text}"
    );
}

#[test]
fn test_routes_list_router_disabled() {
    let output = threadroute_cmd().args(["routes", "list"]).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    let text = combined_output(&output);
    assert!(text.contains("disabled"), "Expected 'disabled':\n{text}");
}

#[test]
fn test_routes_list_without_password() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        dir.path(),
        r#"
[router]
enabled = true
hostname = "threadroute-cli-test.invalid"
"#,
    );
    let output = threadroute_cmd()
        .args(["routes", "list", "-c"])
        .arg(&path)
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(3));
    let text = combined_output(&output);
    assert!(
        text.contains("threadroute-cli-test.invalid"),
        "Expected the hostname in the error:\n{text}"
    );
}
