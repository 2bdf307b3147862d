//! End-to-end CLI checks: flag surface and a full offline run.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

#[test]
fn test_help_lists_strategy_and_bypass_flags() {
    Command::cargo_bin("dp-harvester")
        .expect("binary builds")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--use-signature-method"))
        .stdout(predicate::str::contains("--datalib"))
        .stdout(predicate::str::contains("--urls-path"))
        .stdout(predicate::str::contains("--download-no-ext"));
}

#[test]
fn test_invalid_thread_count_rejected() {
    Command::cargo_bin("dp-harvester")
        .expect("binary builds")
        .args(["--threads", "0"])
        .assert()
        .failure();
}

#[test]
fn test_offline_run_with_prefetched_inputs_succeeds() {
    // A listing from disk plus an empty URL file: the run touches no
    // network and completes through the success banner path.
    let dir = TempDir::new().expect("temp dir");
    let listing = dir.path().join("datalib.html");
    std::fs::write(
        &listing,
        r#"<html><a href="http://dp/SMS_DP_SMSPKG$/PKG001">PKG001</a></html>"#,
    )
    .expect("write listing");
    let urls = dir.path().join("urls.txt");
    std::fs::write(&urls, "\n").expect("write url file");
    let output = dir.path().join("loot");

    Command::cargo_bin("dp-harvester")
        .expect("binary builds")
        .arg("--datalib")
        .arg(&listing)
        .arg("--urls-path")
        .arg(&urls)
        .arg("--output")
        .arg(&output)
        .assert()
        .success();
}

#[test]
fn test_missing_listing_file_fails() {
    let dir = TempDir::new().expect("temp dir");
    Command::cargo_bin("dp-harvester")
        .expect("binary builds")
        .args(["--datalib", "/nonexistent/datalib.html"])
        .arg("--output")
        .arg(dir.path().join("loot"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("unable to read listing file"));
}
