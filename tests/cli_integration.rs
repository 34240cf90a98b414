//! CLI integration tests
//!
//! End-to-end tests for CLI commands using assert_cmd.

mod common;

use assert_cmd::Command;
use predicates::prelude::*;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::MockServer;

/// Get the lens binary for testing
fn lens_cmd() -> Command {
    let mut cmd = Command::cargo_bin("lens").unwrap();
    cmd.env_remove("LENS_PRIMARY_URL")
        .env_remove("LENS_LOG_LEVEL")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_version_output() {
    lens_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("lens"));
}

#[test]
fn test_help_shows_all_commands() {
    lens_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("analyze"))
        .stdout(predicate::str::contains("stats"))
        .stdout(predicate::str::contains("probe"))
        .stdout(predicate::str::contains("config"))
        .stdout(predicate::str::contains("completions"));
}

#[test]
fn test_analyze_help() {
    lens_cmd()
        .args(["analyze", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--task"))
        .stdout(predicate::str::contains("--priority"))
        .stdout(predicate::str::contains("--json"));
}

#[test]
fn test_config_init_creates_file() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("lens.toml");

    lens_cmd()
        .args(["config", "init", "-o"])
        .arg(&config_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration file created"));

    let content = std::fs::read_to_string(&config_path).unwrap();
    assert!(content.contains("[analysis]"));
    assert!(content.contains("[[backends]]"));
}

#[test]
fn test_config_init_refuses_overwrite() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("lens.toml");
    std::fs::write(&config_path, "existing").unwrap();

    lens_cmd()
        .args(["config", "init", "-o"])
        .arg(&config_path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));
}

#[test]
fn test_completions_bash() {
    lens_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("lens"));
}

#[test]
fn test_analyze_missing_file_fails() {
    let temp_dir = TempDir::new().unwrap();
    lens_cmd()
        .args(["analyze", "does-not-exist.py", "--no-persist", "-c"])
        .arg(temp_dir.path().join("absent.toml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Cannot read"));
}

#[test]
fn test_analyze_rejects_unknown_priority() {
    lens_cmd()
        .args(["analyze", "a.py", "--priority", "cheapest"])
        .assert()
        .failure();
}

#[test]
fn test_stats_empty_store() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("lens.toml");
    std::fs::write(
        &config_path,
        common::test_config_toml("http://127.0.0.1:9", temp_dir.path()),
    )
    .unwrap();

    lens_cmd()
        .args(["stats", "-c"])
        .arg(&config_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("No statistics recorded yet"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_analyze_then_stats() {
    let server = MockServer::start().await;
    common::mount_tags(&server, Duration::ZERO).await;
    common::mount_generate(
        &server,
        r#"{"suggestions":[{"type":"warning","description":"unused import","lineNumber":1}]}"#,
    )
    .await;

    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("lens.toml");
    std::fs::write(
        &config_path,
        common::test_config_toml(&server.uri(), temp_dir.path()),
    )
    .unwrap();
    let source = temp_dir.path().join("a.py");
    std::fs::write(&source, common::A_PY_V1).unwrap();

    let config_arg = config_path.clone();
    let source_arg = source.clone();
    let analyze = tokio::task::spawn_blocking(move || {
        lens_cmd()
            .args(["analyze", "--json", "--log-level", "error", "-c"])
            .arg(&config_arg)
            .arg(&source_arg)
            .assert()
            .success()
            .get_output()
            .stdout
            .clone()
    })
    .await
    .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&analyze).unwrap();
    assert_eq!(json["state"], "completed");
    assert_eq!(json["result"]["ok"]["suggestions"][0]["kind"], "warning");

    let stats = tokio::task::spawn_blocking(move || {
        lens_cmd()
            .args(["stats", "--json", "-c"])
            .arg(&config_path)
            .assert()
            .success()
            .get_output()
            .stdout
            .clone()
    })
    .await
    .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&stats).unwrap();
    assert_eq!(json["records"][0]["task"], "realtime_analysis");
    assert_eq!(json["records"][0]["requests"], 1);
}
