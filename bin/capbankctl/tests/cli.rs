//! ---
//! cb_section: "05-testing"
//! cb_subsection: "module"
//! cb_type: "source"
//! cb_scope: "code"
//! cb_description: "Command-line tests for capbankctl."
//! cb_version: "v0.1.0"
//! cb_owner: "protection-studies"
//! ---
use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

fn capbankctl(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("capbankctl").unwrap();
    cmd.current_dir(dir).env_remove("CAPBANK_CONFIG");
    cmd
}

#[test]
fn lists_every_topology() {
    let dir = tempdir().unwrap();
    capbankctl(dir.path())
        .arg("topologies")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("yy_internal_fuses")
                .and(predicate::str::contains("y_internal_fuses"))
                .and(predicate::str::contains("h_bridge_internal_fuses"))
                .and(predicate::str::contains("yy_external_fuses"))
                .and(predicate::str::contains("h_bridge_external_fuses")),
        );
}

#[test]
fn prints_preset_as_json() {
    let dir = tempdir().unwrap();
    let output = capbankctl(dir.path())
        .args(["preset", "--topology", "h_bridge_external_fuses", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let nameplate: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(nameplate["S"], 5);
    assert_eq!(nameplate["St"], 3);
    assert_eq!(nameplate["line_voltage_v"], 69000.0);
}

#[test]
fn rejects_unknown_topology() {
    let dir = tempdir().unwrap();
    capbankctl(dir.path())
        .args(["preset", "--topology", "delta"])
        .assert()
        .failure();
}

#[test]
fn validate_reports_violations() {
    let dir = tempdir().unwrap();
    let nameplate = dir.path().join("bank.yaml");
    fs::write(
        &nameplate,
        "line_voltage_v: 69000\nreactive_power_var: 15000000\nfrequency_hz: 60\nG: 1\nS: 4\nPt: 8\nPa: 8\n",
    )
    .unwrap();

    capbankctl(dir.path())
        .args(["validate", "--topology", "yy_external_fuses", "--nameplate"])
        .arg(&nameplate)
        .assert()
        .failure()
        .stdout(predicate::str::contains("Pt - Pa >= 1"));

    capbankctl(dir.path())
        .args(["validate", "--topology", "yy_external_fuses"])
        .assert()
        .success()
        .stdout(predicate::str::contains("arrangement is valid"));
}

#[test]
fn sweep_prints_sentinel_row_without_exporting() {
    let dir = tempdir().unwrap();
    capbankctl(dir.path())
        .args([
            "sweep",
            "--topology",
            "h_bridge_external_fuses",
            "--sentinel",
            "--no-export",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("SU").and(predicate::str::contains("SC")));
    assert!(!dir.path().join("reports").exists());
}

#[test]
fn sweep_exports_requested_indices() {
    let dir = tempdir().unwrap();
    let out = dir.path().join("out");
    capbankctl(dir.path())
        .args([
            "sweep",
            "--topology",
            "yy_internal_fuses",
            "--grounding",
            "0",
            "--indices",
            "0,2",
            "--output-dir",
        ])
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("reports written to"));

    let csv = fs::read_to_string(out.join("yy_internal_fuses_unbalance.csv")).unwrap();
    assert_eq!(csv.lines().count(), 3);
    assert!(out.join("yy_internal_fuses_unbalance.json").exists());
    assert!(out.join("yy_internal_fuses_unbalance.tex").exists());
}

#[test]
fn sweep_rejects_bad_index_labels() {
    let dir = tempdir().unwrap();
    capbankctl(dir.path())
        .args([
            "sweep",
            "--topology",
            "yy_external_fuses",
            "--indices",
            "0,x",
            "--no-export",
        ])
        .assert()
        .failure();
}

#[test]
fn run_executes_configured_studies() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("capbank.toml");
    fs::write(
        &config,
        r#"
[logging]
directory = "logs"
format = "pretty"

[export]
output_dir = "studies"
latex = false

[studies.feeder]
topology = "yy_external_fuses"
fault_indices = [0, 1, 2, 3]
"#,
    )
    .unwrap();

    capbankctl(dir.path())
        .args(["run", "--config"])
        .arg(&config)
        .assert()
        .success();

    let reports = dir.path().join("studies").join("feeder");
    assert!(reports.join("yy_external_fuses_unbalance.json").exists());
    assert!(reports.join("yy_external_fuses_unbalance.csv").exists());
    assert!(!reports.join("yy_external_fuses_unbalance.tex").exists());
    assert!(dir.path().join("logs").is_dir());
}

#[test]
fn run_requires_configuration() {
    let dir = tempdir().unwrap();
    capbankctl(dir.path())
        .arg("run")
        .assert()
        .failure()
        .stderr(predicate::str::contains("needs a configuration file"));
}

#[test]
fn run_writes_study_events_to_log_file() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("capbank.toml");
    fs::write(
        &config,
        r#"
[logging]
directory = "logs"
format = "structured-json"

[export]
output_dir = "studies"
latex = false

[studies.feeder]
topology = "yy_external_fuses"
description = "13.8 kV feeder bank, external fuses"
fault_indices = [0, 1, 2, 3]
"#,
    )
    .unwrap();

    capbankctl(dir.path())
        .env("CAPBANK_LOG", "debug")
        .args(["run", "--config"])
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "## feeder: 13.8 kV feeder bank, external fuses",
        ))
        .stdout(predicate::str::contains("tracing initialised").not())
        .stdout(predicate::str::contains("study.sweep").not())
        .stderr(predicate::str::contains("tracing initialised"));

    let mut log = String::new();
    for entry in fs::read_dir(dir.path().join("logs")).unwrap() {
        let path = entry.unwrap().path();
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        if name.starts_with("capbankctl.log") {
            log.push_str(&fs::read_to_string(&path).unwrap());
        }
    }
    assert!(log.contains("tracing initialised"));
    assert!(log.contains(r#""event":"study.sweep""#));
    assert!(log.contains(r#""outcome":"success""#));
    assert!(log.contains(r#""study":"feeder""#));
    assert!(log.contains(r#""fault_index":"3""#));
}
