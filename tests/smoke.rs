//! Smoke tests -- verify the binary runs and the CLI round-trips through storage.

use std::path::Path;

use assert_cmd::Command;

fn write_config(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("incidentmind.toml");
    std::fs::write(
        &path,
        format!(
            r#"
[storage]
db_path = "{db}"

[sources]
log_dir = "{logs}"
metrics_dir = "{metrics}"
"#,
            db = dir.join("incidentmind.db").display(),
            logs = dir.join("live_logs").display(),
            metrics = dir.join("live_metrics").display(),
        ),
    )
    .unwrap();
    path
}

fn cli(config: &Path) -> Command {
    let mut cmd = Command::cargo_bin("incidentmind").unwrap();
    cmd.arg("--config").arg(config);
    cmd
}

#[test]
fn test_cli_help() {
    Command::cargo_bin("incidentmind")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicates::str::contains("Read-only incident triage"));
}

#[test]
fn test_cli_version() {
    Command::cargo_bin("incidentmind")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicates::str::contains("incidentmind"));
}

#[test]
fn test_subcommands_exist() {
    for sub in ["serve", "triage", "show", "list", "generate-logs", "generate-metrics"] {
        Command::cargo_bin("incidentmind")
            .unwrap()
            .args([sub, "--help"])
            .assert()
            .success();
    }
}

#[test]
fn test_triage_show_and_list() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());

    cli(&config)
        .args(["generate-logs", "--service", "orders-api", "--lines", "50", "--seed", "1"])
        .assert()
        .success();
    cli(&config)
        .args(["generate-metrics", "--service", "orders-api", "--ticks", "30", "--seed", "1"])
        .assert()
        .success();
    assert!(dir.path().join("live_logs/orders-api.log").exists());
    assert!(dir.path().join("live_metrics/orders-api.jsonl").exists());

    let alert = dir.path().join("alert.json");
    std::fs::write(
        &alert,
        r#"{"service":"orders-api","severity":"critical","timestamp":"2026-01-20T12:05:00Z","signals":{"error_rate":0.35}}"#,
    )
    .unwrap();

    let output = cli(&config)
        .args(["triage", "--alert"])
        .arg(&alert)
        .output()
        .unwrap();
    assert!(output.status.success());
    let stored: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let id = stored["incident_id"].as_str().unwrap().to_string();
    assert!(id.starts_with("inc_"));
    assert_eq!(stored["report"]["incident_context"]["service"], "orders-api");
    assert_eq!(stored["report"]["log_findings"]["correlated_ids"].as_array().unwrap().len(), 10);

    cli(&config)
        .args(["show", &id])
        .assert()
        .success()
        .stdout(predicates::str::contains(id.as_str()));

    cli(&config)
        .arg("list")
        .assert()
        .success()
        .stdout(predicates::str::contains(id.as_str()));
}

#[test]
fn test_invalid_window_fails() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());
    let alert = dir.path().join("alert.json");
    std::fs::write(&alert, r#"{"service":"a","severity":"low","timestamp":"t"}"#).unwrap();

    cli(&config)
        .args(["triage", "--window", "1000", "--alert"])
        .arg(&alert)
        .assert()
        .failure()
        .stderr(predicates::str::contains("time_window_minutes"));
}

#[test]
fn test_unloadable_env_config_warns() {
    let dir = tempfile::tempdir().unwrap();

    Command::cargo_bin("incidentmind")
        .unwrap()
        .current_dir(dir.path())
        .env("INCIDENTMIND_CONFIG", dir.path().join("missing.toml"))
        .env("RUST_LOG", "info")
        .arg("list")
        .assert()
        .success()
        .stderr(predicates::str::contains(
            "INCIDENTMIND_CONFIG set but file could not be loaded",
        ));
}

#[test]
fn test_malformed_local_config_warns() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("incidentmind.toml"), "[server\nbind = ").unwrap();

    Command::cargo_bin("incidentmind")
        .unwrap()
        .current_dir(dir.path())
        .env_remove("INCIDENTMIND_CONFIG")
        .env("RUST_LOG", "info")
        .arg("list")
        .assert()
        .success()
        .stderr(predicates::str::contains(
            "local config file exists but could not be loaded",
        ));
}

#[test]
fn test_show_unknown_incident_fails() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());

    cli(&config)
        .args(["show", "inc_00000000"])
        .assert()
        .failure()
        .stderr(predicates::str::contains("incident not found"));
}
