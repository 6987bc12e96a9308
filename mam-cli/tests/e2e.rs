//! End-to-end tests for the `mam` binary
//!
//! Each test writes a journey collection to a temp directory and points the
//! user and project config at that directory so local files never leak in.

use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

const JOURNEYS: &str = r#"[
    {"channels": ["Organic", "Email", "Direct"], "converted": true, "conversion_value": 30.0,
     "inter_touch_hours": [200.0, 20.0, 1.0]},
    {"channels": ["Paid", "Direct"], "converted": true, "conversion_value": 10.0,
     "inter_touch_hours": [5.0, 0.5]},
    {"channels": ["Email"], "converted": false, "inter_touch_hours": [3.0]}
]"#;

fn mam(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_mam"))
        .args(args)
        .env("MAM_USER_CONFIG_DIR", dir)
        .env("MAM_PROJECT_CONFIG_DIR", dir)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to run mam")
}

fn workspace() -> (TempDir, String) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("journeys.json");
    std::fs::write(&path, JOURNEYS).unwrap();
    let path = path.to_string_lossy().to_string();
    (dir, path)
}

/// Test that mam --help lists every command
#[test]
fn mam_help_works() {
    let dir = TempDir::new().unwrap();
    let output = mam(dir.path(), &["--help"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for command in ["run", "journeys", "markov", "shapley", "config"] {
        assert!(stdout.contains(command), "missing {command}");
    }
}

/// Test that mam run prints every model column
#[test]
fn mam_run_prints_table() {
    let (dir, journeys) = workspace();
    let output = mam(dir.path(), &["run", "--journeys", &journeys]);

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("attribution_first_click_heuristic"));
    assert!(stdout.contains("attribution_markov_algorithmic"));
    assert!(stdout.contains("attribution_shapley_size4_conv_rate_algorithmic"));
    assert!(stdout.contains("Organic"));
}

/// Test that mam run --json totals each model to the converted value
#[test]
fn mam_run_json_conserves_value() {
    let (dir, journeys) = workspace();
    let output = mam(dir.path(), &["run", "--journeys", &journeys, "--json"]);

    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let rows = json["table"]["rows"].as_object().unwrap();
    let models = json["table"]["models"].as_array().unwrap();
    assert!(!models.is_empty());

    for model in models {
        let model = model.as_str().unwrap();
        let total: f64 = rows
            .values()
            .map(|cells| cells[model].as_f64().unwrap_or(0.0))
            .sum();
        assert!((total - 40.0).abs() < 1e-3, "{model}: {total}");
    }
}

/// Test that a bad config value is rejected before anything runs
#[test]
fn mam_run_rejects_invalid_config() {
    let (dir, journeys) = workspace();
    let config = dir.path().join("bad.toml");
    std::fs::write(&config, "[models.markov]\nvalue_mode = \"weekly\"\n").unwrap();

    let output = mam(
        dir.path(),
        &["run", "--journeys", &journeys, "--config", &config.to_string_lossy()],
    );
    assert!(!output.status.success());
}

/// Test that mam journeys prints per-journey credit
#[test]
fn mam_journeys_prints_credit() {
    let (dir, journeys) = workspace();
    let output = mam(dir.path(), &["journeys", "--journeys", &journeys, "--model", "linear"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Organic > Email > Direct"));
    assert!(stdout.contains("10 > 10 > 10"));
}

/// Test that mam markov prints the matrix and effects
#[test]
fn mam_markov_prints_diagnostics() {
    let (dir, journeys) = workspace();
    let output = mam(dir.path(), &["markov", "--journeys", &journeys]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Transition matrix"));
    assert!(stdout.contains("(conversion)"));
    assert!(stdout.contains("Removal effects"));
}

/// Test that mam shapley prints the conversion table
#[test]
fn mam_shapley_prints_conversion_table() {
    let (dir, journeys) = workspace();
    let output = mam(dir.path(), &["shapley", "--journeys", &journeys]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Conv rate"));
    assert!(stdout.contains("Direct > Paid"));
}

/// Test that mam config show works without config file
#[test]
fn mam_config_show_works_without_config() {
    let dir = TempDir::new().unwrap();
    let output = mam(dir.path(), &["config", "show"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("round_values_to = 4"));
    assert!(stdout.contains("[models.markov]"));
}

/// Test that mam config path shows paths
#[test]
fn mam_config_path_shows_paths() {
    let dir = TempDir::new().unwrap();
    let output = mam(dir.path(), &["config", "path"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("User config:"));
    assert!(stdout.contains("Project config:"));
}
