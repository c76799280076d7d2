use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Error taxonomy for a cleanup run.
///
/// File-level and operation-level errors are recovered locally and aggregated
/// into counts; plan-level and safety-gate errors abort the run before any
/// mutation; rollback failures escalate to an explicit human-intervention
/// signal and are never swallowed.
#[derive(Debug, Error, Diagnostic)]
pub enum CleanupError {
    /// A collaborator could not parse a source file. Recovered by excluding
    /// the file from the plan.
    #[error("unparsable file: {path}")]
    #[diagnostic(code(codesweep::unparsable_file))]
    UnparsableFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The plan references an unsafe or impossible target (protected file,
    /// missing source). Aborts the run before any mutation.
    #[error("plan validation failed: {reason}")]
    #[diagnostic(code(codesweep::plan_validation))]
    PlanValidation { reason: String },

    /// A single operation failed during execution. Counted; siblings in the
    /// same category continue.
    #[error("operation failed on {path}: {reason}")]
    #[diagnostic(code(codesweep::execution_failure))]
    ExecutionFailure { path: PathBuf, reason: String },

    /// The safety gate rejected the plan. Fatal before any mutation.
    #[error("safety gate rejected the plan: {reason}")]
    #[diagnostic(code(codesweep::safety_gate_rejected))]
    SafetyGateRejected { reason: String },

    /// Post-execution validation failed. Triggers a mandatory rollback
    /// attempt.
    #[error("post-execution validation failed: {reason}")]
    #[diagnostic(code(codesweep::post_validation_failed))]
    PostValidationFailed { reason: String },

    /// Rollback itself failed. Manual recovery required.
    #[error("ROLLBACK FAILED - manual intervention required: {reason}")]
    #[diagnostic(
        code(codesweep::rollback_failed),
        help("the working tree may be in an inconsistent state; inspect the VCS log and restore from the backup directory")
    )]
    RollbackFailed { reason: String },

    /// A version-control operation returned an error. Always fatal to the
    /// safety layer, never silently ignored.
    #[error("vcs operation '{operation}' failed: {detail}")]
    #[diagnostic(code(codesweep::vcs))]
    Vcs { operation: String, detail: String },

    #[error("configuration error: {0}")]
    #[diagnostic(code(codesweep::config))]
    Config(String),

    #[error(transparent)]
    #[diagnostic(code(codesweep::io))]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CleanupError>;

impl CleanupError {
    /// Whether this error aborts the whole run (as opposed to being recovered
    /// locally and aggregated).
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            CleanupError::PlanValidation { .. }
                | CleanupError::SafetyGateRejected { .. }
                | CleanupError::RollbackFailed { .. }
                | CleanupError::Vcs { .. }
                | CleanupError::Config(_)
        )
    }

    /// Rollback failures are the only class that must escalate to a
    /// "human intervention required" signal.
    pub fn requires_manual_recovery(&self) -> bool {
        matches!(self, CleanupError::RollbackFailed { .. })
    }
}
