// Validation collaborator: test suites and critical-path probes.

use crate::error::{CleanupError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Instant;
use tracing::{debug, warn};

/// Application areas probed before and after execution. The set is closed;
/// a failed probe in any of them blocks or reverts the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CriticalPath {
    Database,
    Cache,
    Filesystem,
    Auth,
    Routing,
}

impl CriticalPath {
    pub const ALL: [CriticalPath; 5] = [
        CriticalPath::Database,
        CriticalPath::Cache,
        CriticalPath::Filesystem,
        CriticalPath::Auth,
        CriticalPath::Routing,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            CriticalPath::Database => "database",
            CriticalPath::Cache => "cache",
            CriticalPath::Filesystem => "filesystem",
            CriticalPath::Auth => "auth",
            CriticalPath::Routing => "routing",
        }
    }
}

/// Result of one test-suite run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteOutcome {
    pub name: String,
    pub passed: bool,
    pub output: String,
    pub duration_secs: u64,
    /// Suite exceeded the configured time budget; a risk signal, not a
    /// failure
    pub over_budget: bool,
}

/// Result of one critical-path probe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeOutcome {
    pub path: CriticalPath,
    pub passed: bool,
    pub detail: String,
}

/// Runs validation suites and critical-path probes.
///
/// Tests substitute canned outcomes; production shells out via
/// [`CommandRunner`].
pub trait ValidationRunner: Send + Sync {
    fn run_suite(&self, name: &str) -> Result<SuiteOutcome>;

    fn probe(&self, path: CriticalPath) -> Result<ProbeOutcome>;
}

/// Shells out to the project's test runner and probe scripts.
///
/// Suites run through a command template with `{suite}` substituted.
/// Probes look for `scripts/probe-<path>.sh` in the project root; a
/// missing script counts as a pass, since not every project wires every
/// probe.
pub struct CommandRunner {
    root: PathBuf,
    suite_command: String,
    max_suite_seconds: u64,
}

impl CommandRunner {
    pub fn new(root: impl Into<PathBuf>, max_suite_seconds: u64) -> Self {
        Self {
            root: root.into(),
            suite_command: "vendor/bin/phpunit --testsuite {suite}".to_string(),
            max_suite_seconds,
        }
    }

    pub fn with_suite_command(mut self, template: impl Into<String>) -> Self {
        self.suite_command = template.into();
        self
    }

    fn probe_script(&self, path: CriticalPath) -> PathBuf {
        self.root
            .join("scripts")
            .join(format!("probe-{}.sh", path.display_name()))
    }
}

impl ValidationRunner for CommandRunner {
    fn run_suite(&self, name: &str) -> Result<SuiteOutcome> {
        let command = self.suite_command.replace("{suite}", name);
        debug!("Running validation suite `{}`: {}", name, command);

        let started = Instant::now();
        let output = Command::new("sh")
            .arg("-c")
            .arg(&command)
            .current_dir(&self.root)
            .output()
            .map_err(|e| CleanupError::ExecutionFailure {
                path: self.root.clone(),
                reason: format!("failed to launch suite `{}`: {}", name, e),
            })?;
        let duration_secs = started.elapsed().as_secs();

        let over_budget = duration_secs > self.max_suite_seconds;
        if over_budget {
            warn!(
                "Suite `{}` took {}s, over the {}s budget",
                name, duration_secs, self.max_suite_seconds
            );
        }

        Ok(SuiteOutcome {
            name: name.to_string(),
            passed: output.status.success(),
            output: String::from_utf8_lossy(&output.stdout).to_string(),
            duration_secs,
            over_budget,
        })
    }

    fn probe(&self, path: CriticalPath) -> Result<ProbeOutcome> {
        let script = self.probe_script(path);
        if !script.exists() {
            return Ok(ProbeOutcome {
                path,
                passed: true,
                detail: "no probe script configured".to_string(),
            });
        }

        let output = Command::new("sh")
            .arg(&script)
            .current_dir(&self.root)
            .output()
            .map_err(|e| CleanupError::ExecutionFailure {
                path: script.clone(),
                reason: format!("failed to launch probe: {}", e),
            })?;

        Ok(ProbeOutcome {
            path,
            passed: output.status.success(),
            detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

/// Convenience: run every configured suite and every probe
pub fn run_all(
    runner: &dyn ValidationRunner,
    suites: &[String],
) -> Result<(Vec<SuiteOutcome>, Vec<ProbeOutcome>)> {
    let mut suite_outcomes = Vec::with_capacity(suites.len());
    for suite in suites {
        suite_outcomes.push(runner.run_suite(suite)?);
    }
    let mut probe_outcomes = Vec::with_capacity(CriticalPath::ALL.len());
    for path in CriticalPath::ALL {
        probe_outcomes.push(runner.probe(path)?);
    }
    Ok((suite_outcomes, probe_outcomes))
}
