//! CLI end-to-end tests
//!
//! Tests for the shortgen command-line interface.

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::process::Command;
use tempfile::tempdir;

/// Get a command for the shortgen binary
#[allow(deprecated)]
fn shortgen_cmd() -> Command {
    Command::cargo_bin("shortgen").unwrap()
}

#[test]
fn test_cli_no_args_shows_help() {
    let mut cmd = shortgen_cmd();
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_cli_help_flag() {
    let mut cmd = shortgen_cmd();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("shortgen"))
        .stdout(predicate::str::contains("Usage"));
}

#[test]
fn test_cli_version_command() {
    let mut cmd = shortgen_cmd();
    cmd.arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(format!(
            "shortgen {}",
            env!("CARGO_PKG_VERSION")
        )));
}

#[test]
fn test_cli_generate_help() {
    let mut cmd = shortgen_cmd();
    cmd.args(["generate", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Generate shorts"))
        .stdout(predicate::str::contains("--preset"));
}

#[test]
fn test_cli_check_tools_command() {
    let mut cmd = shortgen_cmd();
    cmd.arg("check-tools").assert().success().stdout(
        predicate::str::contains("ffmpeg").and(predicate::str::contains("ffprobe")),
    );
}

#[test]
fn test_cli_plan_auto_split() {
    let mut cmd = shortgen_cmd();
    cmd.args(["plan", "--duration", "47"])
        .assert()
        .success()
        .stdout(predicate::str::contains("short_04.mp4"))
        .stdout(predicate::str::contains("+2s"))
        .stdout(predicate::str::contains("short_05.mp4").not());
}

#[test]
fn test_cli_plan_single_past_end_is_skipped() {
    let mut cmd = shortgen_cmd();
    cmd.args(["plan", "--duration", "10", "--offset", "10", "--single"])
        .assert()
        .success()
        .stdout(predicate::str::contains("skipped"));
}

#[test]
fn test_cli_plan_json() {
    let output = shortgen_cmd()
        .args(["plan", "--duration", "30.3", "--length", "30", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let windows: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let windows = windows.as_array().unwrap();
    assert_eq!(windows.len(), 1);
    assert_eq!(windows[0]["index"], 1);
    assert_eq!(windows[0]["duration_secs"], 30.0);
}

#[test]
fn test_cli_plan_rejects_bad_preset_flag() {
    let mut cmd = shortgen_cmd();
    cmd.args(["generate", "x.mp4", "--preset", "placebo"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown preset"));
}

#[test]
fn test_cli_generate_missing_input() {
    let dir = tempdir().unwrap();
    let mut cmd = shortgen_cmd();
    cmd.args(["generate", "--duration", "10"])
        .arg(dir.path().join("missing.mp4"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn test_cli_validate_default() {
    let mut cmd = shortgen_cmd();
    cmd.arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"));
}

#[test]
fn test_cli_validate_reports_warnings() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.json");
    fs::write(
        &path,
        r#"{"generation": {"crf": 40}, "batch": {"min_segment_secs": 1.0}}"#,
    )
    .unwrap();

    let mut cmd = shortgen_cmd();
    cmd.arg("validate")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("warning"))
        .stdout(predicate::str::contains("Skip threshold: 1s"));
}

#[test]
fn test_cli_validate_invalid_json_fails() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.json");
    fs::write(&path, "{ not json").unwrap();

    let mut cmd = shortgen_cmd();
    cmd.arg("validate")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("config parse error"));
}
