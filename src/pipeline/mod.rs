//! Cleanup orchestrator.
//!
//! A strict state machine: Analyzing -> Planning -> ValidatingSafety ->
//! BackingUp -> Executing -> TestingChanges -> Reporting, with Failed
//! reachable from any state. Dry runs short-circuit from Planning straight
//! to Reporting. Whatever happens, one [`CleanupReport`] comes out.

use crate::analysis::AnalysisCollector;
use crate::config::CleanupConfig;
use crate::discovery::FileFinder;
use crate::dupes::DuplicateDetector;
use crate::error::{CleanupError, Result};
use crate::execute::{BackupManager, ExecutionResult, RefactorExecutor};
use crate::plan::{CleanupPlan, PlanBuilder};
use crate::risk::{self, RiskAssessment};
use crate::safety::{
    CommandRunner, DynamicFinding, GitCli, SafetyManager, ValidationRunner, Vcs,
};
use crate::usage::{UsageResolver, UseGraph};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{error, info, warn};

/// Pipeline phase; the report records the furthest one reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Analyzing,
    Planning,
    ValidatingSafety,
    BackingUp,
    Executing,
    TestingChanges,
    Reporting,
    Failed,
}

impl Phase {
    pub fn display_name(&self) -> &'static str {
        match self {
            Phase::Analyzing => "analyzing",
            Phase::Planning => "planning",
            Phase::ValidatingSafety => "validating safety",
            Phase::BackingUp => "backing up",
            Phase::Executing => "executing",
            Phase::TestingChanges => "testing changes",
            Phase::Reporting => "reporting",
            Phase::Failed => "failed",
        }
    }
}

/// The one value every run produces, success or not
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanupReport {
    pub phase_reached: Phase,
    pub dry_run: bool,

    pub files_analyzed: usize,
    pub files_skipped: usize,

    pub planned_imports: usize,
    pub planned_variables: usize,
    pub planned_methods: usize,
    pub planned_duplicate_groups: usize,
    pub planned_deletions: usize,
    pub estimated_bytes_saved: u64,

    pub safety_score: Option<u8>,
    pub execution: Option<ExecutionResult>,
    pub risks: Vec<RiskAssessment>,

    pub rollback_performed: bool,
    pub rollback_verified: bool,

    pub error: Option<String>,
    pub duration_secs: u64,
}

impl CleanupReport {
    fn empty(dry_run: bool) -> Self {
        Self {
            phase_reached: Phase::Analyzing,
            dry_run,
            files_analyzed: 0,
            files_skipped: 0,
            planned_imports: 0,
            planned_variables: 0,
            planned_methods: 0,
            planned_duplicate_groups: 0,
            planned_deletions: 0,
            estimated_bytes_saved: 0,
            safety_score: None,
            execution: None,
            risks: Vec::new(),
            rollback_performed: false,
            rollback_verified: false,
            error: None,
            duration_secs: 0,
        }
    }

    fn record_plan(&mut self, plan: &CleanupPlan) {
        self.planned_imports = plan.unused_imports.len();
        self.planned_variables = plan.unused_variables.len();
        self.planned_methods = plan.unused_methods.len();
        self.planned_duplicate_groups = plan.duplicate_methods.len()
            + plan.duplicate_templates.len()
            + plan.duplicate_styles.len();
        self.planned_deletions = plan.file_deletions.len();
        self.estimated_bytes_saved = plan.estimated_savings();
    }

    pub fn succeeded(&self) -> bool {
        self.phase_reached == Phase::Reporting && self.error.is_none()
    }
}

/// Sequences a full cleanup run
pub struct CleanupPipeline {
    config: CleanupConfig,
    project_root: PathBuf,
    vcs: Option<Box<dyn Vcs>>,
    runner: Option<Box<dyn ValidationRunner>>,
}

impl CleanupPipeline {
    pub fn new(config: CleanupConfig, project_root: impl Into<PathBuf>) -> Self {
        Self {
            config,
            project_root: project_root.into(),
            vcs: None,
            runner: None,
        }
    }

    /// Substitute the VCS collaborator (tests use an in-memory fake)
    pub fn with_vcs(mut self, vcs: Box<dyn Vcs>) -> Self {
        self.vcs = Some(vcs);
        self
    }

    /// Substitute the validation collaborator
    pub fn with_runner(mut self, runner: Box<dyn ValidationRunner>) -> Self {
        self.runner = Some(runner);
        self
    }

    /// Runs the whole pipeline. Never returns an error; failures land in
    /// the report.
    pub fn run(self) -> CleanupReport {
        let started = Instant::now();
        let mut report = CleanupReport::empty(self.config.dry_run);
        if let Err(e) = self.drive(&mut report) {
            error!("Run failed during {}: {}", report.phase_reached.display_name(), e);
            if e.requires_manual_recovery() {
                error!("MANUAL RECOVERY REQUIRED: the tree may be in an inconsistent state");
            }
            report.error = Some(e.to_string());
            report.phase_reached = Phase::Failed;
        }
        report.duration_secs = started.elapsed().as_secs();
        report
    }

    fn drive(self, report: &mut CleanupReport) -> Result<()> {
        let Self {
            config,
            project_root,
            vcs,
            runner,
        } = self;

        // Analyzing
        report.phase_reached = Phase::Analyzing;
        info!("Analyzing {}", project_root.display());
        let files = FileFinder::new(&config).find_files(&project_root)?;
        let (analyses, skipped) = AnalysisCollector::new().collect(&files)?;
        report.files_analyzed = analyses.len();
        report.files_skipped = skipped;

        for dir in &config.source_dirs {
            let prefix = project_root.join(dir);
            if !analyses.iter().any(|a| a.path.starts_with(&prefix)) {
                return Err(CleanupError::Config(format!(
                    "no analyzable files under source directory {}",
                    dir.display()
                )));
            }
        }

        // Planning
        report.phase_reached = Phase::Planning;
        let graph = UseGraph::build(&analyses);
        let resolver = UsageResolver::new(&graph);
        let unused_symbols = resolver.unused_symbols(&analyses);
        let unused_imports = resolver.unused_imports(&analyses);

        let duplicates = DuplicateDetector::new().detect(&analyses);

        let plan = PlanBuilder::new(&config).build(
            &analyses,
            unused_symbols,
            unused_imports,
            duplicates,
        );
        plan.validate(&config, &analyses)?;
        report.record_plan(&plan);

        let findings: Vec<DynamicFinding> = analyses
            .iter()
            .flat_map(|a| {
                a.dynamic_calls.iter().map(|call| DynamicFinding {
                    file: a.path.clone(),
                    call: call.clone(),
                })
            })
            .collect();

        if config.dry_run {
            // no checkpoint, no backup, no mutation
            info!("Dry run: {} planned changes, nothing touched", plan.total_items());
            report.risks = risk::assess(&plan, None, None);
            report.phase_reached = Phase::Reporting;
            return Ok(());
        }

        // ValidatingSafety
        report.phase_reached = Phase::ValidatingSafety;
        let vcs = vcs.unwrap_or_else(|| Box::new(GitCli::new(&project_root)));
        let runner = runner.unwrap_or_else(|| {
            Box::new(CommandRunner::new(
                &project_root,
                config.safety.max_suite_seconds,
            ))
        });
        let mut safety = SafetyManager::new(config.safety.clone(), vcs, runner);

        safety.create_checkpoint("pre-cleanup")?;
        let assessment = safety.assess(findings, config.run_tests)?;
        report.safety_score = Some(assessment.score);
        safety.is_safe_to_cleanup(&plan, &assessment)?;

        if plan.is_empty() {
            info!("Nothing to clean up");
            report.risks = risk::assess(&plan, None, Some(&assessment));
            report.phase_reached = Phase::Reporting;
            return Ok(());
        }

        // BackingUp is delegated to the executor, which copies each file
        // right before its first mutation
        if config.create_backup {
            report.phase_reached = Phase::BackingUp;
        }

        // Executing
        report.phase_reached = Phase::Executing;
        let mut executor = RefactorExecutor::new(&config, &project_root);
        let result = executor.execute(&plan);

        // TestingChanges
        report.phase_reached = Phase::TestingChanges;
        let post = match safety.post_validate(config.run_tests) {
            Ok(post) => post,
            Err(e) => {
                // the validation run itself broke; the mutated tree must
                // not be left in place
                warn!("Post-validation could not run ({}); rolling back", e);
                report.rollback_performed = true;
                report.rollback_verified = safety.emergency_rollback().is_ok();
                report.execution = Some(result);
                return Err(e);
            }
        };
        if post.rollback_required {
            warn!("Post-validation failed; rolling back");
            report.rollback_performed = true;
            match safety.emergency_rollback() {
                Ok(()) => {
                    report.rollback_verified = true;
                    report.risks = risk::assess(&plan, Some(&result), Some(&assessment));
                    report.execution = Some(result);
                    report.phase_reached = Phase::Reporting;
                    return Err(CleanupError::PostValidationFailed {
                        reason: "changes reverted; see report for failing checks".to_string(),
                    });
                }
                Err(e) => {
                    report.execution = Some(result);
                    return Err(e);
                }
            }
        }

        // Reporting
        report.phase_reached = Phase::Reporting;
        report.risks = risk::assess(&plan, Some(&result), Some(&assessment));
        report.execution = Some(result);

        let backup_root = project_root.join(&config.backup_dir);
        if let Err(e) = BackupManager::prune_sessions(&backup_root, config.safety.retention) {
            warn!("Backup prune failed: {}", e);
        }
        Ok(())
    }
}
