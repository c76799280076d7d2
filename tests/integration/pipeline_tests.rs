//! End-to-end pipeline tests
//!
//! Full runs over real trees in tempdirs, with a real git repository for
//! the checkpoint/rollback paths.

use codesweep::config::CleanupConfig;
use codesweep::error::{CleanupError, Result};
use codesweep::pipeline::{CleanupPipeline, Phase};
use codesweep::safety::{CriticalPath, GitCli, ProbeOutcome, SuiteOutcome, ValidationRunner};
use std::fs;
use std::path::Path;
use std::process::Command;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Passes everything
struct PassingRunner;

impl ValidationRunner for PassingRunner {
    fn run_suite(&self, name: &str) -> Result<SuiteOutcome> {
        Ok(SuiteOutcome {
            name: name.to_string(),
            passed: true,
            output: String::new(),
            duration_secs: 0,
            over_budget: false,
        })
    }

    fn probe(&self, path: CriticalPath) -> Result<ProbeOutcome> {
        Ok(ProbeOutcome {
            path,
            passed: true,
            detail: String::new(),
        })
    }
}

/// Suites pass for the baseline run, then fail afterwards
struct RegressingRunner {
    suite_calls: AtomicUsize,
    baseline_budget: usize,
}

impl RegressingRunner {
    fn new(baseline_budget: usize) -> Self {
        Self {
            suite_calls: AtomicUsize::new(0),
            baseline_budget,
        }
    }
}

impl ValidationRunner for RegressingRunner {
    fn run_suite(&self, name: &str) -> Result<SuiteOutcome> {
        let call = self.suite_calls.fetch_add(1, Ordering::SeqCst);
        Ok(SuiteOutcome {
            name: name.to_string(),
            passed: call < self.baseline_budget,
            output: String::new(),
            duration_secs: 0,
            over_budget: false,
        })
    }

    fn probe(&self, path: CriticalPath) -> Result<ProbeOutcome> {
        Ok(ProbeOutcome {
            path,
            passed: true,
            detail: String::new(),
        })
    }
}

/// Suites run clean at baseline, then the runner itself breaks
struct CrashingRunner {
    suite_calls: AtomicUsize,
    baseline_budget: usize,
}

impl CrashingRunner {
    fn new(baseline_budget: usize) -> Self {
        Self {
            suite_calls: AtomicUsize::new(0),
            baseline_budget,
        }
    }
}

impl ValidationRunner for CrashingRunner {
    fn run_suite(&self, name: &str) -> Result<SuiteOutcome> {
        let call = self.suite_calls.fetch_add(1, Ordering::SeqCst);
        if call >= self.baseline_budget {
            return Err(CleanupError::ExecutionFailure {
                path: std::path::PathBuf::from("vendor/bin/phpunit"),
                reason: format!("failed to launch suite `{}`", name),
            });
        }
        Ok(SuiteOutcome {
            name: name.to_string(),
            passed: true,
            output: String::new(),
            duration_secs: 0,
            over_budget: false,
        })
    }

    fn probe(&self, path: CriticalPath) -> Result<ProbeOutcome> {
        Ok(ProbeOutcome {
            path,
            passed: true,
            detail: String::new(),
        })
    }
}

fn git(root: &Path, args: &[&str]) {
    let status = Command::new("git")
        .args(args)
        .current_dir(root)
        .status()
        .expect("git should be runnable");
    assert!(status.success(), "git {:?} failed", args);
}

fn init_repo(root: &Path) {
    git(root, &["init", "-q"]);
    git(root, &["config", "user.email", "test@example.com"]);
    git(root, &["config", "user.name", "Test"]);
}

const CART_WITH_DEAD_METHOD: &str = r#"<?php
class Cart {
    public function total() {
        return $this->sum();
    }

    private function sum() {
        return 10;
    }

    private function legacyDiscount() {
        return 0;
    }
}
"#;

fn seed_project(root: &Path) {
    fs::create_dir_all(root.join("src")).unwrap();
    fs::write(root.join("src/Cart.php"), CART_WITH_DEAD_METHOD).unwrap();
}

#[test]
fn test_dry_run_touches_nothing() {
    let dir = tempfile::tempdir().unwrap();
    seed_project(dir.path());

    let mut config = CleanupConfig::default();
    config.dry_run = true;

    let report = CleanupPipeline::new(config, dir.path()).run();

    assert!(report.succeeded());
    assert!(report.dry_run);
    assert_eq!(report.planned_methods, 1);
    assert!(report.execution.is_none());
    assert!(report.safety_score.is_none());

    // nothing on disk changed
    assert_eq!(
        fs::read_to_string(dir.path().join("src/Cart.php")).unwrap(),
        CART_WITH_DEAD_METHOD
    );
}

#[test]
fn test_full_run_removes_dead_method() {
    let dir = tempfile::tempdir().unwrap();
    seed_project(dir.path());
    init_repo(dir.path());

    let config = CleanupConfig::default();
    let report = CleanupPipeline::new(config, dir.path())
        .with_vcs(Box::new(GitCli::new(dir.path())))
        .with_runner(Box::new(PassingRunner))
        .run();

    assert!(report.succeeded(), "run failed: {:?}", report.error);
    assert_eq!(report.safety_score, Some(100));

    let execution = report.execution.expect("execution result present");
    assert_eq!(execution.methods_removed, 1);
    assert!(execution.failures.is_empty());

    let after = fs::read_to_string(dir.path().join("src/Cart.php")).unwrap();
    assert!(!after.contains("legacyDiscount"));
    assert!(after.contains("function total"));
    assert!(after.contains("function sum"));
}

#[test]
fn test_failed_post_validation_rolls_back() {
    let dir = tempfile::tempdir().unwrap();
    seed_project(dir.path());
    init_repo(dir.path());

    // two configured suites pass at baseline, fail at post-validation
    let config = CleanupConfig::default();
    let baseline_budget = config.safety.test_suites.len();
    let report = CleanupPipeline::new(config, dir.path())
        .with_vcs(Box::new(GitCli::new(dir.path())))
        .with_runner(Box::new(RegressingRunner::new(baseline_budget)))
        .run();

    assert_eq!(report.phase_reached, Phase::Failed);
    assert!(report.rollback_performed);
    assert!(report.rollback_verified);
    assert!(report.error.is_some());

    // the tree is back to its checkpointed state
    assert_eq!(
        fs::read_to_string(dir.path().join("src/Cart.php")).unwrap(),
        CART_WITH_DEAD_METHOD
    );
}

#[test]
fn test_full_run_starts_from_committed_clean_tree() {
    // a fully committed tree is the normal starting state; the pre-cleanup
    // checkpoint must still succeed
    let dir = tempfile::tempdir().unwrap();
    seed_project(dir.path());
    init_repo(dir.path());
    git(dir.path(), &["add", "-A"]);
    git(dir.path(), &["commit", "-q", "-m", "seed"]);

    let config = CleanupConfig::default();
    let report = CleanupPipeline::new(config, dir.path())
        .with_vcs(Box::new(GitCli::new(dir.path())))
        .with_runner(Box::new(PassingRunner))
        .run();

    assert!(report.succeeded(), "run failed: {:?}", report.error);
    let after = fs::read_to_string(dir.path().join("src/Cart.php")).unwrap();
    assert!(!after.contains("legacyDiscount"));
}

#[test]
fn test_broken_post_validation_still_rolls_back() {
    let dir = tempfile::tempdir().unwrap();
    seed_project(dir.path());
    init_repo(dir.path());

    // suites launch fine at baseline, then the runner errors outright
    let config = CleanupConfig::default();
    let baseline_budget = config.safety.test_suites.len();
    let report = CleanupPipeline::new(config, dir.path())
        .with_vcs(Box::new(GitCli::new(dir.path())))
        .with_runner(Box::new(CrashingRunner::new(baseline_budget)))
        .run();

    assert_eq!(report.phase_reached, Phase::Failed);
    assert!(report.rollback_performed);
    assert!(report.rollback_verified);
    assert!(report.error.is_some());
    assert_eq!(
        fs::read_to_string(dir.path().join("src/Cart.php")).unwrap(),
        CART_WITH_DEAD_METHOD
    );
}

#[test]
fn test_missing_source_dir_fails_before_planning() {
    let dir = tempfile::tempdir().unwrap();
    // no src/ directory at all

    let mut config = CleanupConfig::default();
    config.dry_run = true;
    let report = CleanupPipeline::new(config, dir.path()).run();

    assert_eq!(report.phase_reached, Phase::Failed);
    assert!(report.error.is_some());
}

#[test]
fn test_report_always_produced_with_risks() {
    let dir = tempfile::tempdir().unwrap();
    seed_project(dir.path());
    // a dynamic dispatcher suppresses removals but surfaces as risk input
    fs::write(
        dir.path().join("src/Dispatcher.php"),
        "<?php\nclass Dispatcher {\n    public function call($t, $m) {\n        return $t->$m();\n    }\n}\n",
    )
    .unwrap();

    let mut config = CleanupConfig::default();
    config.dry_run = true;
    let report = CleanupPipeline::new(config, dir.path()).run();

    assert!(report.succeeded());
    // the conservative policy keeps everything once dynamic dispatch shows up
    assert_eq!(report.planned_methods, 0);
}
