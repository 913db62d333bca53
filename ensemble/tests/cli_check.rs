//! CLI tests for `ensemble check`.
//!
//! Spawns the binary and verifies exit codes for missing and configured
//! credentials. `check` never calls the completion API, so a placeholder key
//! is enough for the positive path.

use std::process::Command;

use ensemble::exit_codes;

#[test]
fn check_without_api_key_exits_invalid_config() {
    let temp = tempfile::tempdir().expect("tempdir");

    let output = Command::new(env!("CARGO_BIN_EXE_ensemble"))
        .current_dir(temp.path())
        .env_remove("ENSEMBLE_API_KEY")
        .env_remove("OPENAI_API_KEY")
        .arg("check")
        .output()
        .expect("ensemble check");

    assert_eq!(output.status.code(), Some(exit_codes::INVALID_CONFIG));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ENSEMBLE_API_KEY"), "stderr should name the variable: {stderr}");
}

#[test]
fn check_with_api_key_exits_ok() {
    let temp = tempfile::tempdir().expect("tempdir");

    let output = Command::new(env!("CARGO_BIN_EXE_ensemble"))
        .current_dir(temp.path())
        .env("ENSEMBLE_API_KEY", "test-key")
        .arg("check")
        .output()
        .expect("ensemble check");

    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Configuration OK."));
}

#[test]
fn check_with_invalid_config_file_fails() {
    let temp = tempfile::tempdir().expect("tempdir");
    std::fs::write(temp.path().join("ensemble.toml"), "max_iterations = 0\n")
        .expect("write config");

    let output = Command::new(env!("CARGO_BIN_EXE_ensemble"))
        .current_dir(temp.path())
        .env("ENSEMBLE_API_KEY", "test-key")
        .arg("check")
        .output()
        .expect("ensemble check");

    assert_eq!(output.status.code(), Some(exit_codes::FAILURE));
}
