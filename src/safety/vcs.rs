// Version-control abstraction used for checkpoints and rollback.

use crate::error::{CleanupError, Result};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Mutex;
use tracing::debug;

/// All VCS operations in the process are serialized through this lock;
/// concurrent index mutation corrupts a checkpoint
static VCS_LOCK: Mutex<()> = Mutex::new(());

/// The minimal version-control surface checkpointing needs.
///
/// Tests substitute an in-memory implementation; production uses
/// [`GitCli`].
pub trait Vcs: Send + Sync {
    /// Stage every change in the working tree
    fn stage_all(&self) -> Result<()>;

    /// Commit staged changes, returning the new commit hash
    fn commit(&self, message: &str) -> Result<String>;

    /// Discard the working tree and index back to a commit
    fn hard_reset_to(&self, hash: &str) -> Result<()>;

    fn working_tree_is_clean(&self) -> Result<bool>;

    fn commit_exists(&self, hash: &str) -> Result<bool>;
}

/// Shells out to the `git` binary in a repository root
pub struct GitCli {
    root: PathBuf,
}

impl GitCli {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn run(&self, args: &[&str]) -> Result<String> {
        let _guard = VCS_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        debug!("git {}", args.join(" "));
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.root)
            .output()
            .map_err(|e| CleanupError::Vcs {
                operation: args.first().copied().unwrap_or("git").to_string(),
                detail: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(CleanupError::Vcs {
                operation: args.first().copied().unwrap_or("git").to_string(),
                detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

impl Vcs for GitCli {
    fn stage_all(&self) -> Result<()> {
        self.run(&["add", "-A"])?;
        Ok(())
    }

    fn commit(&self, message: &str) -> Result<String> {
        // --allow-empty: a checkpoint taken on a fully committed tree must
        // still succeed and record HEAD
        self.run(&["commit", "--allow-empty", "--no-verify", "-m", message])?;
        self.run(&["rev-parse", "HEAD"])
    }

    fn hard_reset_to(&self, hash: &str) -> Result<()> {
        self.run(&["reset", "--hard", hash])?;
        Ok(())
    }

    fn working_tree_is_clean(&self) -> Result<bool> {
        Ok(self.run(&["status", "--porcelain"])?.is_empty())
    }

    fn commit_exists(&self, hash: &str) -> Result<bool> {
        let _guard = VCS_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let status = Command::new("git")
            .args(["cat-file", "-e", &format!("{}^{{commit}}", hash)])
            .current_dir(&self.root)
            .status()
            .map_err(|e| CleanupError::Vcs {
                operation: "cat-file".into(),
                detail: e.to_string(),
            })?;
        Ok(status.success())
    }
}
