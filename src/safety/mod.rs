//! Safety & Rollback System.
//!
//! Gates execution behind critical-path probes, dynamic-usage risk and a
//! valid VCS checkpoint, and provides the rollback paths the orchestrator
//! relies on when validation fails after execution.

pub mod validation;
pub mod vcs;

use crate::analysis::{DynamicCall, DynamicRisk};
use crate::config::SafetyConfig;
use crate::error::{CleanupError, Result};
use crate::plan::CleanupPlan;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{error, info, warn};

pub use validation::{CommandRunner, CriticalPath, ProbeOutcome, SuiteOutcome, ValidationRunner};
pub use vcs::{GitCli, Vcs};

/// A dynamic-dispatch pattern observed in a specific file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DynamicFinding {
    pub file: PathBuf,
    pub call: DynamicCall,
}

/// One recorded VCS checkpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyCheckpoint {
    pub id: String,
    pub commit: String,
    pub operation: String,
    pub created_at: u64,
    pub session: String,
}

/// Pre-execution verdict: score plus everything it was derived from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyAssessment {
    /// Advisory score in [0, 100]; execution is gated on the hard checks,
    /// not on this number
    pub score: u8,
    pub suites: Vec<SuiteOutcome>,
    pub probes: Vec<ProbeOutcome>,
    pub dynamic_findings: Vec<DynamicFinding>,
}

impl SafetyAssessment {
    pub fn failing_probes(&self) -> Vec<&ProbeOutcome> {
        self.probes.iter().filter(|p| !p.passed).collect()
    }

    pub fn failing_suites(&self) -> Vec<&SuiteOutcome> {
        self.suites.iter().filter(|s| !s.passed).collect()
    }
}

/// Post-execution validation verdict
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostValidation {
    pub suites: Vec<SuiteOutcome>,
    pub probes: Vec<ProbeOutcome>,
    pub rollback_required: bool,
}

/// Advisory safety score: start at 100, subtract per finding, clamp at 0
pub fn safety_score(
    findings: &[DynamicFinding],
    suites: &[SuiteOutcome],
    probes: &[ProbeOutcome],
) -> u8 {
    let mut penalty: u32 = 0;
    for finding in findings {
        penalty += match finding.call.pattern.risk() {
            DynamicRisk::High => 30,
            DynamicRisk::Medium => 15,
            DynamicRisk::Low => 5,
        };
    }
    penalty += suites.iter().filter(|s| !s.passed).count() as u32 * 20;
    penalty += probes.iter().filter(|p| !p.passed).count() as u32 * 25;
    100u32.saturating_sub(penalty) as u8
}

/// Owns the checkpoint history and the gate decisions for one run
pub struct SafetyManager {
    config: SafetyConfig,
    vcs: Box<dyn Vcs>,
    runner: Box<dyn ValidationRunner>,
    checkpoints: Vec<SafetyCheckpoint>,
    session: String,
}

impl SafetyManager {
    pub fn new(config: SafetyConfig, vcs: Box<dyn Vcs>, runner: Box<dyn ValidationRunner>) -> Self {
        let session = format!("sweep-{}", unix_now());
        Self {
            config,
            vcs,
            runner,
            checkpoints: Vec::new(),
            session,
        }
    }

    pub fn checkpoints(&self) -> &[SafetyCheckpoint] {
        &self.checkpoints
    }

    fn suite_names(&self, run_suites: bool) -> &[String] {
        if run_suites {
            &self.config.test_suites
        } else {
            &[]
        }
    }

    /// Runs the baseline suites and probes and scores the run
    pub fn assess(
        &self,
        findings: Vec<DynamicFinding>,
        run_suites: bool,
    ) -> Result<SafetyAssessment> {
        let (suites, probes) =
            validation::run_all(self.runner.as_ref(), self.suite_names(run_suites))?;

        let score = safety_score(&findings, &suites, &probes);
        info!("Safety score: {}/100", score);

        Ok(SafetyAssessment {
            score,
            suites,
            probes,
            dynamic_findings: findings,
        })
    }

    /// The hard gate. Rejects when a high-risk dynamic pattern touches a
    /// planned target, when a baseline critical-path probe fails, or when
    /// no checkpoint could be verified.
    pub fn is_safe_to_cleanup(
        &self,
        plan: &CleanupPlan,
        assessment: &SafetyAssessment,
    ) -> Result<()> {
        let touched = plan.touched_files();
        for finding in &assessment.dynamic_findings {
            if finding.call.pattern.risk() == DynamicRisk::High
                && touched.contains(&finding.file)
            {
                return Err(CleanupError::SafetyGateRejected {
                    reason: format!(
                        "high-risk dynamic pattern in planned target {} (line {})",
                        finding.file.display(),
                        finding.call.line
                    ),
                });
            }
        }

        if let Some(probe) = assessment.failing_probes().first() {
            return Err(CleanupError::SafetyGateRejected {
                reason: format!(
                    "critical path `{}` failed its baseline probe: {}",
                    probe.path.display_name(),
                    probe.detail
                ),
            });
        }

        let Some(checkpoint) = self.checkpoints.last() else {
            return Err(CleanupError::SafetyGateRejected {
                reason: "no checkpoint recorded for this run".to_string(),
            });
        };
        if !self.vcs.commit_exists(&checkpoint.commit)? {
            return Err(CleanupError::SafetyGateRejected {
                reason: format!("checkpoint commit {} not found", checkpoint.commit),
            });
        }

        Ok(())
    }

    /// Stages everything and commits it as a named restore point
    pub fn create_checkpoint(&mut self, operation: &str) -> Result<&SafetyCheckpoint> {
        self.vcs.stage_all()?;
        let message = format!("codesweep checkpoint: {} [{}]", operation, self.session);
        let commit = self.vcs.commit(&message)?;

        let checkpoint = SafetyCheckpoint {
            id: format!("{}-{:03}", self.session, self.checkpoints.len() + 1),
            commit,
            operation: operation.to_string(),
            created_at: unix_now(),
            session: self.session.clone(),
        };
        info!(
            "Checkpoint {} at commit {}",
            checkpoint.id, checkpoint.commit
        );
        self.checkpoints.push(checkpoint);
        self.prune();
        Ok(self.checkpoints.last().unwrap())
    }

    /// Clean working tree and an existing commit are both required
    pub fn can_rollback(&self, id: &str) -> Result<bool> {
        let Some(checkpoint) = self.checkpoints.iter().find(|c| c.id == id) else {
            return Ok(false);
        };
        Ok(self.vcs.working_tree_is_clean()? && self.vcs.commit_exists(&checkpoint.commit)?)
    }

    /// Hard-resets to a checkpoint and forgets everything recorded after it
    pub fn rollback_to_checkpoint(&mut self, id: &str) -> Result<()> {
        if !self.can_rollback(id)? {
            return Err(CleanupError::RollbackFailed {
                reason: format!("checkpoint {} is not in a rollbackable state", id),
            });
        }
        let position = self
            .checkpoints
            .iter()
            .position(|c| c.id == id)
            .expect("checkpoint verified above");
        let commit = self.checkpoints[position].commit.clone();

        self.vcs.hard_reset_to(&commit)?;
        self.checkpoints.truncate(position + 1);
        info!("Rolled back to checkpoint {}", id);
        Ok(())
    }

    /// Re-runs probes and suites after execution; any failure demands a
    /// rollback
    pub fn post_validate(&self, run_suites: bool) -> Result<PostValidation> {
        let (suites, probes) =
            validation::run_all(self.runner.as_ref(), self.suite_names(run_suites))?;

        let rollback_required =
            suites.iter().any(|s| !s.passed) || probes.iter().any(|p| !p.passed);
        if rollback_required {
            warn!("Post-execution validation failed; rollback required");
        }
        Ok(PostValidation {
            suites,
            probes,
            rollback_required,
        })
    }

    /// Last-resort path after failed post-validation: reset to the most
    /// recent checkpoint without the clean-tree precondition, then verify
    /// the critical paths again. A failure here leaves the tree in an
    /// unknown state and is reported as fatal.
    pub fn emergency_rollback(&mut self) -> Result<()> {
        let Some(checkpoint) = self.checkpoints.last().cloned() else {
            return Err(CleanupError::RollbackFailed {
                reason: "no checkpoint to roll back to".to_string(),
            });
        };

        if !self.vcs.commit_exists(&checkpoint.commit)? {
            error!("Checkpoint commit {} has vanished", checkpoint.commit);
            return Err(CleanupError::RollbackFailed {
                reason: format!("checkpoint commit {} no longer exists", checkpoint.commit),
            });
        }
        self.vcs.hard_reset_to(&checkpoint.commit)?;

        for path in CriticalPath::ALL {
            let outcome = self.runner.probe(path)?;
            if !outcome.passed {
                error!(
                    "Critical path `{}` still failing after rollback",
                    path.display_name()
                );
                return Err(CleanupError::RollbackFailed {
                    reason: format!(
                        "critical path `{}` failed verification after reset to {}",
                        path.display_name(),
                        checkpoint.commit
                    ),
                });
            }
        }
        info!("Emergency rollback to {} verified", checkpoint.commit);
        Ok(())
    }

    fn prune(&mut self) {
        let retention = self.config.retention.max(1);
        if self.checkpoints.len() > retention {
            let drop = self.checkpoints.len() - retention;
            self.checkpoints.drain(..drop);
        }
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
