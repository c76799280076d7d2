//! CLI integration tests
//!
//! These tests drive the compiled binary with assert_cmd.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;

fn seed_project(root: &Path) {
    fs::create_dir_all(root.join("src")).unwrap();
    fs::write(
        root.join("src/Cart.php"),
        r#"<?php
class Cart {
    public function total() {
        return 10;
    }

    private function legacyDiscount() {
        return 0;
    }
}
"#,
    )
    .unwrap();
}

#[test]
fn test_help_lists_category_flags() {
    Command::cargo_bin("codesweep")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--dry-run"))
        .stdout(predicate::str::contains("--remove-unused-methods"))
        .stdout(predicate::str::contains("--create-components"))
        .stdout(predicate::str::contains("--delete-files"));
}

#[test]
fn test_version_flag() {
    Command::cargo_bin("codesweep")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("codesweep"));
}

#[test]
fn test_dry_run_reports_without_touching_files() {
    let dir = tempfile::tempdir().unwrap();
    seed_project(dir.path());
    let original = fs::read_to_string(dir.path().join("src/Cart.php")).unwrap();

    Command::cargo_bin("codesweep")
        .unwrap()
        .arg(dir.path())
        .args(["--dry-run", "--yes", "--quiet"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Dry run"));

    assert_eq!(
        fs::read_to_string(dir.path().join("src/Cart.php")).unwrap(),
        original
    );
}

#[test]
fn test_json_report_written_to_file() {
    let dir = tempfile::tempdir().unwrap();
    seed_project(dir.path());
    let out = dir.path().join("report.json");

    Command::cargo_bin("codesweep")
        .unwrap()
        .arg(dir.path())
        .args(["--dry-run", "--yes", "--quiet", "--format", "json"])
        .arg("--output")
        .arg(&out)
        .assert()
        .success();

    let json = fs::read_to_string(&out).unwrap();
    assert!(json.contains("\"version\": \"1.0\""));
    assert!(json.contains("\"dry_run\": true"));
    assert!(json.contains("\"planned_methods\": 1"));
}

#[test]
fn test_empty_project_exits_nonzero() {
    let dir = tempfile::tempdir().unwrap();
    // no src/ directory: the pipeline never reaches planning

    Command::cargo_bin("codesweep")
        .unwrap()
        .arg(dir.path())
        .args(["--dry-run", "--yes", "--quiet"])
        .assert()
        .failure();
}
