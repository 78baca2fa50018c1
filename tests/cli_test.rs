//! Binary-level contract tests
//!
//! Runs the built `repohealth` binary against temporary repositories and
//! checks exit codes, the JSON validation contract, remediation and the
//! health database round trip.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

const README: &str = "# Example Domain\n\n## Overview\n\nThis repository collects the conceptual models for the example domain.\n\n## Usage\n\nBrowse the models directory.\n";

const MANIFEST: &str = r#"{
  "type": "fcm-repository",
  "category": "domains",
  "name": "example",
  "version": "1.0.0",
  "quality": { "fcm-compliance": true }
}"#;

fn repohealth(args: &[&str], db: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_repohealth"))
        .args(args)
        .env("REPOHEALTH_DB", db)
        .env_remove("RUST_LOG")
        .output()
        .expect("run repohealth")
}

/// A domains repository with `models/` but no `schemas/`, no CI and no
/// security policy
fn domains_repo() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir(dir.path().join("models")).unwrap();
    fs::write(dir.path().join("README.md"), README).unwrap();
    fs::write(dir.path().join("fcm.manifest.json"), MANIFEST).unwrap();
    dir
}

fn stdout_json(output: &Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).unwrap_or_else(|e| {
        panic!(
            "stdout is not JSON ({}): {}",
            e,
            String::from_utf8_lossy(&output.stdout)
        )
    })
}

#[test]
fn validate_json_contract() {
    let repo = domains_repo();
    let db = tempfile::tempdir().unwrap();
    let path = repo.path().to_str().unwrap();

    let output = repohealth(
        &["validate", path, "--json", "--min-score", "0"],
        &db.path().join("h.redb"),
    );
    assert_eq!(output.status.code(), Some(0), "{:?}", output);

    let json = stdout_json(&output);
    assert!(json["score"].as_f64().unwrap() > 0.0);
    assert_eq!(json["compliance_level"], "basic");
    assert_eq!(json["violations"][0], "missing required directory: schemas");
    assert_eq!(json["recommendations"][0], "create directory: schemas");
    for key in ["structural", "content", "process", "security"] {
        assert!(json["health_metrics"][key].is_number(), "missing {}", key);
    }
    assert!(json["health_metrics"]["overall_health"].is_string());
}

#[test]
fn validate_gate_fails_below_min_score() {
    let repo = domains_repo();
    let db = tempfile::tempdir().unwrap();
    let path = repo.path().to_str().unwrap();

    let output = repohealth(
        &["validate", path, "--json", "--min-score", "1.0"],
        &db.path().join("h.redb"),
    );
    assert_eq!(output.status.code(), Some(1));
    // Result still printed in full
    stdout_json(&output);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("required_dir:schemas"), "{}", stderr);
    assert!(stderr.contains("create directory: schemas"), "{}", stderr);
}

#[test]
fn validate_fail_on_violations() {
    let repo = domains_repo();
    let db = tempfile::tempdir().unwrap();
    let path = repo.path().to_str().unwrap();

    let output = repohealth(
        &["validate", path, "--min-score", "0", "--fail-on-violations"],
        &db.path().join("h.redb"),
    );
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn validate_unknown_type_is_an_error() {
    let repo = domains_repo();
    let db = tempfile::tempdir().unwrap();
    let path = repo.path().to_str().unwrap();

    let output = repohealth(
        &["validate", path, "--type", "nonsense"],
        &db.path().join("h.redb"),
    );
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("nonsense"), "{}", stderr);
}

#[test]
fn fix_dry_run_then_apply() {
    let repo = domains_repo();
    let db = tempfile::tempdir().unwrap();
    let db = db.path().join("h.redb");
    let path = repo.path().to_str().unwrap();

    let output = repohealth(&["fix", path, "--dry-run", "--json"], &db);
    assert!(output.status.success(), "{:?}", output);
    let report = stdout_json(&output);
    assert_eq!(report["dry_run"], true);
    assert!(report["actions"]
        .as_array()
        .unwrap()
        .iter()
        .any(|a| a["status"] == "would_apply"));
    assert!(!repo.path().join("schemas").exists());

    let output = repohealth(&["fix", path, "--safe-only", "--json"], &db);
    assert!(output.status.success(), "{:?}", output);
    assert!(repo.path().join("schemas").is_dir());
    assert!(repo.path().join("SECURITY.md").is_file());

    // Second run has nothing left to change at this tier
    let output = repohealth(&["fix", path, "--safe-only", "--json"], &db);
    assert!(output.status.success(), "{:?}", output);
    let report = stdout_json(&output);
    assert!(report["actions"]
        .as_array()
        .unwrap()
        .iter()
        .all(|a| a["status"] != "applied"));
}

#[test]
fn health_update_dashboard_and_repository() {
    let first = domains_repo();
    let second = tempfile::tempdir().unwrap();
    fs::write(second.path().join("notes.txt"), "nothing here").unwrap();
    let db = tempfile::tempdir().unwrap();
    let db = db.path().join("nested").join("h.redb");

    let output = repohealth(
        &[
            "health",
            "update",
            first.path().to_str().unwrap(),
            second.path().to_str().unwrap(),
            "--workers",
            "2",
        ],
        &db,
    );
    assert!(output.status.success(), "{:?}", output);
    assert!(db.exists());

    let output = repohealth(&["health", "dashboard", "--format", "json"], &db);
    assert!(output.status.success(), "{:?}", output);
    let dashboard = stdout_json(&output);
    assert_eq!(dashboard["summary"]["total"], 2);
    let repos = dashboard["repositories"].as_array().unwrap();
    assert!(repos[0]["score"].as_f64().unwrap() <= repos[1]["score"].as_f64().unwrap());
    assert_eq!(repos[0]["trend"], "insufficient-data");

    let name = first
        .path()
        .canonicalize()
        .unwrap()
        .file_name()
        .unwrap()
        .to_string_lossy()
        .into_owned();
    let output = repohealth(&["health", "repository", "--repo-name", &name], &db);
    assert!(output.status.success(), "{:?}", output);
    let md = String::from_utf8_lossy(&output.stdout);
    assert!(md.contains(&format!("# Repository Health Report: {}", name)));

    let output = repohealth(&["health", "dashboard", "--format", "html"], &db);
    assert!(output.status.success(), "{:?}", output);
    let html = String::from_utf8_lossy(&output.stdout);
    assert!(html.starts_with("<!DOCTYPE html>"));
    assert!(html.contains(&format!("<td>{}</td>", name)));

    let output = repohealth(
        &["health", "repository", "--repo-name", &name, "--format", "text"],
        &db,
    );
    assert!(output.status.success(), "{:?}", output);
    assert!(!String::from_utf8_lossy(&output.stdout).contains("# Repository"));
}

#[test]
fn health_rejects_out_of_range_window() {
    let db = tempfile::tempdir().unwrap();
    let db = db.path().join("h.redb");
    for days in ["100000000", "0"] {
        let output = repohealth(&["health", "dashboard", "--days", days], &db);
        assert_eq!(output.status.code(), Some(2), "{:?}", output);
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(!stderr.contains("panicked"), "{}", stderr);
    }
}

#[test]
fn health_ingests_validation_result() {
    let repo = domains_repo();
    let db = tempfile::tempdir().unwrap();
    let db_path = db.path().join("h.redb");

    let output = repohealth(
        &["validate", repo.path().to_str().unwrap(), "--json", "--min-score", "0"],
        &db_path,
    );
    let result_file = db.path().join("result.json");
    fs::write(&result_file, &output.stdout).unwrap();

    let output = repohealth(
        &[
            "health",
            "update",
            "--validation-result",
            result_file.to_str().unwrap(),
            "--repo-name",
            "atlas",
        ],
        &db_path,
    );
    assert!(output.status.success(), "{:?}", output);

    let output = repohealth(
        &["health", "repository", "--repo-name", "atlas", "--format", "json"],
        &db_path,
    );
    assert!(output.status.success(), "{:?}", output);
    let report = stdout_json(&output);
    assert_eq!(report["latest"]["result"]["compliance_level"], "basic");

    let output = repohealth(&["health", "repository", "--repo-name", "ghost"], &db_path);
    assert!(!output.status.success());
}

#[test]
fn init_writes_config_once() {
    let repo = tempfile::tempdir().unwrap();
    let db = tempfile::tempdir().unwrap();
    let db = db.path().join("h.redb");
    let path = repo.path().to_str().unwrap();

    let output = repohealth(&["init", path], &db);
    assert!(output.status.success(), "{:?}", output);
    let written = fs::read_to_string(repo.path().join("repohealth.toml")).unwrap();
    assert!(written.contains("[validation]"));

    fs::write(repo.path().join("repohealth.toml"), "# mine\n").unwrap();
    let output = repohealth(&["init", path], &db);
    assert!(output.status.success());
    assert_eq!(
        fs::read_to_string(repo.path().join("repohealth.toml")).unwrap(),
        "# mine\n"
    );
}
