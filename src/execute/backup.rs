// On-disk backup copies taken before every mutation.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

/// One saved copy of a file about to be modified or deleted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupRecord {
    pub original: PathBuf,
    pub backup: PathBuf,
    pub created_at: u64,
}

/// Copies files into a per-run timestamped directory under the configured
/// backup root, mirroring their relative layout
pub struct BackupManager {
    session_dir: PathBuf,
    project_root: PathBuf,
    records: Vec<BackupRecord>,
}

impl BackupManager {
    pub fn new(backup_root: impl Into<PathBuf>, project_root: impl Into<PathBuf>) -> Self {
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Self {
            session_dir: backup_root.into().join(stamp.to_string()),
            project_root: project_root.into(),
            records: Vec::new(),
        }
    }

    pub fn records(&self) -> &[BackupRecord] {
        &self.records
    }

    /// Saves a copy of `path` before it gets touched. A file already backed
    /// up this session is not copied again; the first copy is the pristine
    /// one.
    pub fn back_up(&mut self, path: &Path) -> Result<&BackupRecord> {
        if let Some(pos) = self.records.iter().position(|r| r.original == path) {
            return Ok(&self.records[pos]);
        }

        let relative = path.strip_prefix(&self.project_root).unwrap_or(path);
        let destination = self.session_dir.join(relative);
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(path, &destination)?;
        debug!("Backed up {} -> {}", path.display(), destination.display());

        self.records.push(BackupRecord {
            original: path.to_path_buf(),
            backup: destination,
            created_at: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0),
        });
        Ok(self.records.last().unwrap())
    }

    /// Puts every backed-up file back where it came from
    pub fn restore_all(&self) -> Result<usize> {
        let mut restored = 0;
        for record in &self.records {
            if let Some(parent) = record.original.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(&record.backup, &record.original)?;
            restored += 1;
        }
        Ok(restored)
    }

    /// Deletes the oldest session directories under the backup root,
    /// keeping the most recent `retention`
    pub fn prune_sessions(backup_root: &Path, retention: usize) -> Result<usize> {
        if !backup_root.is_dir() {
            return Ok(0);
        }
        let mut sessions: Vec<PathBuf> = fs::read_dir(backup_root)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|p| p.is_dir())
            .collect();
        sessions.sort();

        let mut removed = 0;
        while sessions.len() > retention.max(1) {
            let oldest = sessions.remove(0);
            if let Err(e) = fs::remove_dir_all(&oldest) {
                warn!("Could not prune backup {}: {}", oldest.display(), e);
            } else {
                removed += 1;
            }
        }
        Ok(removed)
    }
}
