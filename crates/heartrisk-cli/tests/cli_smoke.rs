//! CLI binary smoke tests using assert_cmd.
//!
//! These tests exercise the compiled `heartrisk` binary end-to-end: argument
//! parsing, the train → evaluate → predict flow, and error exits.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;

fn cmd() -> Command {
    Command::cargo_bin("heartrisk").unwrap()
}

/// 100 deterministic rows, 40 positive, with textual sex values.
fn write_dataset(dir: &Path) -> PathBuf {
    let mut csv = String::from("age,sex,chest_pain,rest_bp,chol,max_hr,st_depr,heart_disease\n");
    for i in 0..100usize {
        let label = usize::from(i % 5 < 2);
        writeln!(
            csv,
            "{},{},{},{},{},{},{:.1},{}",
            40 + (i * 7) % 30 + 8 * label,
            if (i / 2) % 2 == 0 { "male" } else { "female" },
            i % 4,
            120 + (i * 11) % 30 + 5 * label,
            200 + (i * 13) % 80,
            170 - (i * 17) % 40 - 15 * label,
            ((i * 3) % 20) as f64 / 10.0 + label as f64,
            label
        )
        .unwrap();
    }
    let path = dir.join("heart-disease.csv");
    std::fs::write(&path, csv).unwrap();
    path
}

fn path_args(dir: &Path) -> Vec<String> {
    vec![
        "--model".to_string(),
        dir.join("models/model_v1.bin").display().to_string(),
        "--metadata".to_string(),
        dir.join("models/metadata.json").display().to_string(),
    ]
}

const PATIENT: [&str; 14] = [
    "--age",
    "63",
    "--sex",
    "1",
    "--chest-pain",
    "3",
    "--blood-pressure",
    "145",
    "--cholesterol",
    "233",
    "--max-hr",
    "150",
    "--st-depression",
    "2.3",
];

// ---------------------------------------------------------------------------
// Top-level
// ---------------------------------------------------------------------------

#[test]
fn no_args_shows_help() {
    cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn help_lists_subcommands() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("train"))
        .stdout(predicate::str::contains("evaluate"))
        .stdout(predicate::str::contains("predict"))
        .stdout(predicate::str::contains("serve"));
}

#[test]
fn version_flag() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("heartrisk"));
}

// ---------------------------------------------------------------------------
// Predict
// ---------------------------------------------------------------------------

#[test]
fn predict_requires_every_feature() {
    cmd()
        .args(["predict", "--age", "63"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--sex"));
}

#[test]
fn predict_without_model_fails() {
    let dir = tempfile::tempdir().unwrap();
    cmd()
        .arg("predict")
        .args(PATIENT)
        .args(path_args(dir.path()))
        .assert()
        .failure()
        .code(1);
}

#[test]
fn predict_rejects_non_finite_feature() {
    let dir = tempfile::tempdir().unwrap();
    let data = write_dataset(dir.path());
    cmd()
        .args(["train", "--data"])
        .arg(&data)
        .args(path_args(dir.path()))
        .assert()
        .success();

    let mut patient = PATIENT;
    patient[1] = "nan";
    cmd()
        .arg("predict")
        .args(patient)
        .args(path_args(dir.path()))
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::contains("probability").not())
        .stderr(predicate::str::contains("finite"));
}

#[test]
fn missing_config_file_fails() {
    cmd()
        .args(["train", "--config", "/nonexistent/config.json"])
        .assert()
        .failure();
}

#[test]
fn dataset_override_must_be_csv_or_tsv() {
    let dir = tempfile::tempdir().unwrap();
    let bogus = dir.path().join("data.txt");
    std::fs::write(&bogus, "age\n1\n").unwrap();
    cmd()
        .args(["train", "--data"])
        .arg(&bogus)
        .args(path_args(dir.path()))
        .assert()
        .failure();
}

// ---------------------------------------------------------------------------
// Full flow
// ---------------------------------------------------------------------------

#[test]
fn train_evaluate_predict_flow() {
    let dir = tempfile::tempdir().unwrap();
    let data = write_dataset(dir.path());

    cmd()
        .args(["train", "--data"])
        .arg(&data)
        .args(path_args(dir.path()))
        .assert()
        .success()
        .stdout(predicate::str::contains("Best Parameters:"))
        .stdout(predicate::str::contains("classifier__C"))
        .stdout(predicate::str::contains("ROC-AUC:"))
        .stdout(predicate::str::contains("weighted avg"));

    assert!(dir.path().join("models/model_v1.bin").exists());
    assert!(dir.path().join("models/metadata.json").exists());

    cmd()
        .args(["evaluate", "--data"])
        .arg(&data)
        .args(path_args(dir.path()))
        .assert()
        .success()
        .stdout(predicate::str::contains("ROC-AUC (full dataset):"))
        .stdout(predicate::str::contains("Saved training metadata:"))
        .stdout(predicate::str::contains("trained_at"));

    cmd()
        .arg("predict")
        .args(PATIENT)
        .args(path_args(dir.path()))
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"Predicted label: [01]\n").unwrap())
        .stdout(predicate::str::is_match(r"Positive class probability: [01]\.\d{4}\n").unwrap());
}

#[test]
fn config_file_supplies_paths() {
    let dir = tempfile::tempdir().unwrap();
    let data = write_dataset(dir.path());
    let config_path = dir.path().join("config.json");
    let config = serde_json::json!({
        "data_path": data,
        "model_path": dir.path().join("out/model.bin"),
        "metadata_path": dir.path().join("out/meta.json"),
        "classifier": { "c_grid": [1.0] }
    });
    std::fs::write(&config_path, serde_json::to_vec_pretty(&config).unwrap()).unwrap();

    cmd()
        .args(["train", "--config"])
        .arg(&config_path)
        .assert()
        .success();
    assert!(dir.path().join("out/model.bin").exists());

    let meta: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(dir.path().join("out/meta.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(meta["best_params"]["classifier__C"], serde_json::json!(1.0));
}
