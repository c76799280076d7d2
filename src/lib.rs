//! codesweep - batch cleanup for multi-language web codebases
//!
//! This library analyzes a project tree (PHP, JavaScript, stylesheets,
//! templates), finds dead code and duplicated fragments, and applies the
//! resulting cleanup plan behind a safety gate with full rollback.
//!
//! # Architecture
//!
//! A cleanup run moves through fixed phases:
//! 1. **File Discovery** - find analyzable source files
//! 2. **Analysis** - per-language collaborators produce `FileAnalysis` records
//! 3. **Usage Resolution** - hierarchy-aware reachability over symbols
//! 4. **Duplicate Detection** - signature bucketing plus pairwise scoring
//! 5. **Planning** - merge findings into an immutable `CleanupPlan`
//! 6. **Safety Gate** - checkpoints, critical-path probes, safety score
//! 7. **Execution** - ordered edits with per-file backups, deletions last
//! 8. **Post-validation** - re-probe; roll back when anything regressed
//! 9. **Reporting** - one report per run, success or not

pub mod analysis;
pub mod config;
pub mod discovery;
pub mod dupes;
pub mod error;
pub mod execute;
pub mod pipeline;
pub mod plan;
pub mod report;
pub mod risk;
pub mod safety;
pub mod usage;

pub use analysis::{AnalysisCollector, Analyzer, FileAnalysis};
pub use config::CleanupConfig;
pub use discovery::{FileFinder, SourceFile, SourceKind};
pub use dupes::{DuplicateDetector, DuplicateMatch};
pub use error::{CleanupError, Result};
pub use execute::{BackupManager, ExecutionResult, RefactorExecutor};
pub use pipeline::{CleanupPipeline, CleanupReport, Phase};
pub use plan::{CleanupPlan, PlanBuilder};
pub use report::{ReportFormat, Reporter};
pub use risk::{RiskAssessment, Severity};
pub use safety::{GitCli, SafetyManager, ValidationRunner, Vcs};
pub use usage::{UsageResolver, UseGraph};
