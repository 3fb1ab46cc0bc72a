use std::process::Command;

use tempfile::tempdir;

#[test]
fn setup_errors_are_reported_even_with_syncerr() {
    let dir = tempdir().expect("temporary directory");
    let missing = dir.path().join("config.json");

    let output = Command::new(env!("CARGO_BIN_EXE_garden-tools"))
        .arg("--syncerr")
        .arg("--config")
        .arg(&missing)
        .arg("plants")
        .arg("--dry-run")
        .output()
        .expect("binary runs");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error:"), "stderr was: {stderr}");
    assert!(stderr.contains("config.json"), "stderr was: {stderr}");
}
