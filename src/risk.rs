// Advisory risk findings derived from a plan and its execution result.
// Nothing here feeds back into execution.

use crate::analysis::DynamicRisk;
use crate::execute::ExecutionResult;
use crate::plan::CleanupPlan;
use crate::safety::SafetyAssessment;
use crate::usage::DynamicExposure;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn display_name(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskCategory {
    DynamicUsage,
    FileDeletion,
    DuplicateRefactor,
    PartialExecution,
    ValidationGap,
}

impl RiskCategory {
    pub fn display_name(&self) -> &'static str {
        match self {
            RiskCategory::DynamicUsage => "dynamic usage",
            RiskCategory::FileDeletion => "file deletion",
            RiskCategory::DuplicateRefactor => "duplicate refactor",
            RiskCategory::PartialExecution => "partial execution",
            RiskCategory::ValidationGap => "validation gap",
        }
    }
}

/// One advisory finding attached to the final report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub severity: Severity,
    pub category: RiskCategory,
    pub description: String,
    pub mitigation: Vec<String>,
    /// Rough probability the risk materializes
    pub likelihood: Severity,
    /// How hard a regression from this change would be to notice
    pub detection_difficulty: Severity,
}

/// Derives the advisory findings for a finished (or aborted) run
pub fn assess(
    plan: &CleanupPlan,
    result: Option<&ExecutionResult>,
    safety: Option<&SafetyAssessment>,
) -> Vec<RiskAssessment> {
    let mut risks = Vec::new();

    let exposed = plan.dynamic_exposures();
    if !exposed.is_empty() {
        let name_matched = exposed
            .iter()
            .filter(|e| **e == DynamicExposure::NameMatch)
            .count();
        risks.push(RiskAssessment {
            severity: if name_matched > 0 {
                Severity::High
            } else {
                Severity::Medium
            },
            category: RiskCategory::DynamicUsage,
            description: format!(
                "{} planned removals sit in a codebase with dynamic dispatch patterns",
                exposed.len()
            ),
            mitigation: vec![
                "review each removal against the dynamic call sites".to_string(),
                "run the full test suite before trusting the result".to_string(),
            ],
            likelihood: Severity::Medium,
            detection_difficulty: Severity::High,
        });
    }

    if let Some(safety) = safety {
        let high = safety
            .dynamic_findings
            .iter()
            .filter(|f| f.call.pattern.risk() == DynamicRisk::High)
            .count();
        if high > 0 {
            risks.push(RiskAssessment {
                severity: Severity::High,
                category: RiskCategory::DynamicUsage,
                description: format!(
                    "{} high-risk dynamic patterns (eval/reflection) observed in the tree",
                    high
                ),
                mitigation: vec![
                    "audit the reflective call sites by hand".to_string(),
                    "keep these files out of the deletion set".to_string(),
                ],
                likelihood: Severity::High,
                detection_difficulty: Severity::Critical,
            });
        }
        if safety.suites.is_empty() {
            risks.push(RiskAssessment {
                severity: Severity::Medium,
                category: RiskCategory::ValidationGap,
                description: "no validation suites were run for this cleanup".to_string(),
                mitigation: vec!["enable run_tests or configure test suites".to_string()],
                likelihood: Severity::Medium,
                detection_difficulty: Severity::High,
            });
        }
    }

    if !plan.file_deletions.is_empty() {
        risks.push(RiskAssessment {
            severity: Severity::High,
            category: RiskCategory::FileDeletion,
            description: format!(
                "{} whole files slated for deletion",
                plan.file_deletions.len()
            ),
            mitigation: vec![
                "verify nothing references the files by a computed path".to_string(),
                "keep the backup directory until the next release cycle".to_string(),
            ],
            likelihood: Severity::Low,
            detection_difficulty: Severity::Medium,
        });
    }

    let duplicate_groups = plan.duplicate_methods.len()
        + plan.duplicate_templates.len()
        + plan.duplicate_styles.len();
    if duplicate_groups > 0 {
        risks.push(RiskAssessment {
            severity: Severity::Medium,
            category: RiskCategory::DuplicateRefactor,
            description: format!(
                "{} duplicate groups rewritten into delegating calls",
                duplicate_groups
            ),
            mitigation: vec![
                "spot-check the canonical member of each group".to_string(),
                "diff the delegating rewrites before committing".to_string(),
            ],
            likelihood: Severity::Medium,
            detection_difficulty: Severity::Low,
        });
    }

    if let Some(result) = result {
        if !result.failures.is_empty() {
            risks.push(RiskAssessment {
                severity: Severity::Medium,
                category: RiskCategory::PartialExecution,
                description: format!(
                    "{} operations failed and left their files untouched",
                    result.failures.len()
                ),
                mitigation: vec![
                    "inspect the failure list in the report".to_string(),
                    "re-run after fixing the skipped files".to_string(),
                ],
                likelihood: Severity::High,
                detection_difficulty: Severity::Low,
            });
        }
    }

    risks.sort_by(|a, b| b.severity.cmp(&a.severity));
    risks
}
