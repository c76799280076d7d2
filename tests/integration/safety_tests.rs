//! Integration tests for the safety and rollback system
//!
//! The rollback tests drive a real git repository in a tempdir.

use codesweep::analysis::{DynamicCall, DynamicPattern};
use codesweep::config::SafetyConfig;
use codesweep::error::Result;
use codesweep::plan::CleanupPlan;
use codesweep::safety::{
    safety_score, CriticalPath, DynamicFinding, GitCli, ProbeOutcome, SafetyManager, SuiteOutcome,
    ValidationRunner, Vcs,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

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

fn tree_contents(root: &Path) -> Vec<(PathBuf, Vec<u8>)> {
    let mut files = Vec::new();
    for entry in walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| !e.path().components().any(|c| c.as_os_str() == ".git"))
    {
        files.push((
            entry.path().to_path_buf(),
            fs::read(entry.path()).unwrap(),
        ));
    }
    files.sort();
    files
}

#[test]
fn test_rollback_restores_tree_exactly() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    init_repo(root);
    fs::write(root.join("a.php"), "<?php echo 'a';\n").unwrap();
    fs::write(root.join("b.php"), "<?php echo 'b';\n").unwrap();

    let mut manager = SafetyManager::new(
        SafetyConfig::default(),
        Box::new(GitCli::new(root)),
        Box::new(PassingRunner),
    );

    manager.create_checkpoint("pre-cleanup").unwrap();
    let before = tree_contents(root);

    // arbitrary mutations, including a deletion and a new file
    fs::write(root.join("a.php"), "mangled").unwrap();
    fs::remove_file(root.join("b.php")).unwrap();
    fs::write(root.join("c.php"), "<?php // new\n").unwrap();

    // stage the damage so the hard reset sweeps the new file too
    git(root, &["add", "-A"]);
    manager.emergency_rollback().unwrap();

    assert_eq!(tree_contents(root), before);
}

#[test]
fn test_can_rollback_requires_clean_tree() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    init_repo(root);
    fs::write(root.join("a.php"), "<?php\n").unwrap();

    let mut manager = SafetyManager::new(
        SafetyConfig::default(),
        Box::new(GitCli::new(root)),
        Box::new(PassingRunner),
    );
    let id = manager.create_checkpoint("pre-cleanup").unwrap().id.clone();
    assert!(manager.can_rollback(&id).unwrap());

    fs::write(root.join("a.php"), "dirty").unwrap();
    assert!(!manager.can_rollback(&id).unwrap());
}

#[test]
fn test_checkpoint_commit_exists() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    init_repo(root);
    fs::write(root.join("a.php"), "<?php\n").unwrap();

    let vcs = GitCli::new(root);
    vcs.stage_all().unwrap();
    let hash = vcs.commit("checkpoint").unwrap();

    assert!(vcs.commit_exists(&hash).unwrap());
    assert!(!vcs.commit_exists("0000000000000000000000000000000000000000").unwrap());
    assert!(vcs.working_tree_is_clean().unwrap());
}

#[test]
fn test_checkpoint_on_committed_clean_tree() {
    // a checkpoint must still succeed when there is nothing to commit
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    init_repo(root);
    fs::write(root.join("a.php"), "<?php\n").unwrap();
    git(root, &["add", "-A"]);
    git(root, &["commit", "-q", "-m", "seed"]);

    let mut manager = SafetyManager::new(
        SafetyConfig::default(),
        Box::new(GitCli::new(root)),
        Box::new(PassingRunner),
    );
    let commit = manager.create_checkpoint("pre-cleanup").unwrap().commit.clone();

    let vcs = GitCli::new(root);
    assert!(vcs.commit_exists(&commit).unwrap());
    assert!(vcs.working_tree_is_clean().unwrap());
}

#[test]
fn test_gate_monotonicity_under_added_findings() {
    // adding a high-risk finding never raises the score and never flips
    // the gate from rejecting to accepting
    let mut findings: Vec<DynamicFinding> = Vec::new();
    let mut last_score = safety_score(&findings, &[], &[]);
    let mut last_rejected = false;

    for line in 0..6 {
        findings.push(DynamicFinding {
            file: PathBuf::from("app/Cart.php"),
            call: DynamicCall {
                pattern: DynamicPattern::Eval,
                name_hint: None,
                line,
            },
        });

        let score = safety_score(&findings, &[], &[]);
        assert!(score <= last_score);
        last_score = score;

        let dir = tempfile::tempdir().unwrap();
        init_repo(dir.path());
        fs::write(dir.path().join("app.php"), "<?php\n").unwrap();
        let mut manager = SafetyManager::new(
            SafetyConfig::default(),
            Box::new(GitCli::new(dir.path())),
            Box::new(PassingRunner),
        );
        manager.create_checkpoint("pre-cleanup").unwrap();
        let assessment = manager.assess(findings.clone(), false).unwrap();

        let mut plan = CleanupPlan::default();
        plan.file_deletions.push(codesweep::plan::DeletionItem {
            path: PathBuf::from("app/Cart.php"),
            byte_len: 1,
        });
        let rejected = manager.is_safe_to_cleanup(&plan, &assessment).is_err();
        // once rejected, it stays rejected as findings accumulate
        assert!(rejected >= last_rejected);
        last_rejected = rejected;
    }
    assert!(last_rejected);
}
