//! Refactoring execution engine.
//!
//! Applies a validated plan to the working tree. Categories run in a fixed
//! order with file deletion always last, every mutation is preceded by a
//! backup when backups are enabled, and a failure in one operation never
//! stops its siblings.

pub mod backup;
pub mod edits;

use crate::analysis::{Fragment, SymbolKind};
use crate::config::CleanupConfig;
use crate::dupes::DuplicateMatch;
use crate::error::Result;
use crate::plan::{CleanupPlan, RemovalItem};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub use backup::{BackupManager, BackupRecord};
pub use edits::{CanonicalScorer, DefaultScorer};

/// One operation that could not be applied; the file was left untouched
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureRecord {
    pub file: PathBuf,
    pub reason: String,
}

/// Counters and touched-file lists for everything the executor changed
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub imports_removed: usize,
    pub variables_removed: usize,
    pub methods_removed: usize,
    pub duplicates_refactored: usize,
    pub components_created: usize,
    pub files_deleted: usize,
    /// Actual bytes the applied edits and deletions took out of the tree
    pub bytes_removed: u64,
    pub lines_removed: usize,
    pub files_created: Vec<PathBuf>,
    pub files_modified: Vec<PathBuf>,
    pub files_backed_up: Vec<PathBuf>,
    pub failures: Vec<FailureRecord>,
    /// Category names in the order they ran; stable across runs
    pub order_trace: Vec<String>,
}

impl ExecutionResult {
    pub fn total_changes(&self) -> usize {
        self.imports_removed
            + self.variables_removed
            + self.methods_removed
            + self.duplicates_refactored
            + self.components_created
            + self.files_deleted
    }

    fn record_modified(&mut self, path: &Path) {
        if !self.files_modified.iter().any(|p| p == path) {
            self.files_modified.push(path.to_path_buf());
        }
    }

    fn record_backed_up(&mut self, path: &Path) {
        if !self.files_backed_up.iter().any(|p| p == path) {
            self.files_backed_up.push(path.to_path_buf());
        }
    }
}

/// Applies a [`CleanupPlan`] to the tree under `project_root`
pub struct RefactorExecutor<'a> {
    config: &'a CleanupConfig,
    project_root: PathBuf,
    scorer: Box<dyn CanonicalScorer>,
    backups: Option<BackupManager>,
}

impl<'a> RefactorExecutor<'a> {
    pub fn new(config: &'a CleanupConfig, project_root: impl Into<PathBuf>) -> Self {
        let project_root = project_root.into();
        let backups = if config.create_backup {
            Some(BackupManager::new(
                project_root.join(&config.backup_dir),
                &project_root,
            ))
        } else {
            None
        };
        Self {
            config,
            project_root,
            scorer: Box::new(DefaultScorer),
            backups,
        }
    }

    pub fn with_scorer(mut self, scorer: Box<dyn CanonicalScorer>) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn backups(&self) -> Option<&BackupManager> {
        self.backups.as_ref()
    }

    /// Runs every category in the fixed order. Deletion is last so that a
    /// failure earlier in the run never leaves a half-edited tree missing
    /// files too.
    pub fn execute(&mut self, plan: &CleanupPlan) -> ExecutionResult {
        let mut result = ExecutionResult::default();

        result.order_trace.push("imports".into());
        self.remove_imports(plan, &mut result);

        result.order_trace.push("variables".into());
        self.remove_symbols(&plan.unused_variables, SymbolKind::Variable, &mut result);

        result.order_trace.push("methods".into());
        self.remove_symbols(&plan.unused_methods, SymbolKind::Method, &mut result);

        result.order_trace.push("duplicates".into());
        for group in plan.duplicate_methods.iter().chain(plan.duplicate_styles.iter()) {
            self.refactor_group(group, &mut result);
        }

        result.order_trace.push("components".into());
        for group in &plan.duplicate_templates {
            self.create_component(group, &mut result);
        }

        result.order_trace.push("deletions".into());
        self.delete_files(plan, &mut result);

        info!(
            "Execution done: {} changes, {} failures",
            result.total_changes(),
            result.failures.len()
        );
        result
    }

    fn read(&self, path: &Path) -> Result<String> {
        Ok(fs::read_to_string(path)?)
    }

    fn write(&mut self, path: &Path, contents: &str, result: &mut ExecutionResult) -> Result<()> {
        let previous = fs::read_to_string(path).unwrap_or_default();
        if let Some(backups) = &mut self.backups {
            backups.back_up(path)?;
            result.record_backed_up(path);
        }
        fs::write(path, contents)?;
        result.bytes_removed += (previous.len() as u64).saturating_sub(contents.len() as u64);
        result.lines_removed += previous
            .lines()
            .count()
            .saturating_sub(contents.lines().count());
        result.record_modified(path);
        Ok(())
    }

    fn record_failure(&self, result: &mut ExecutionResult, file: &Path, reason: impl Into<String>) {
        let reason = reason.into();
        warn!("Skipped {}: {}", file.display(), reason);
        result.failures.push(FailureRecord {
            file: file.to_path_buf(),
            reason,
        });
    }

    fn remove_imports(&mut self, plan: &CleanupPlan, result: &mut ExecutionResult) {
        // group per file, edit bottom-up so earlier spans stay valid
        let mut per_file: HashMap<&Path, Vec<&crate::usage::UnusedImport>> = HashMap::new();
        for import in &plan.unused_imports {
            per_file.entry(import.file.as_path()).or_default().push(import);
        }

        for (file, mut imports) in per_file {
            imports.sort_by(|a, b| b.import.span.start_line.cmp(&a.import.span.start_line));
            let mut contents = match self.read(file) {
                Ok(c) => c,
                Err(e) => {
                    self.record_failure(result, file, e.to_string());
                    continue;
                }
            };

            let mut removed = 0;
            for import in imports {
                match edits::remove_lines(
                    &contents,
                    import.import.span.start_line,
                    import.import.span.end_line,
                ) {
                    Some(edited) => {
                        contents = edited;
                        removed += 1;
                    }
                    None => self.record_failure(
                        result,
                        file,
                        format!("import `{}` span out of range", import.import.short_name),
                    ),
                }
            }

            if removed > 0 {
                match self.write(file, &contents, result) {
                    Ok(()) => result.imports_removed += removed,
                    Err(e) => self.record_failure(result, file, e.to_string()),
                }
            }
        }
    }

    fn remove_symbols(
        &mut self,
        items: &[RemovalItem],
        kind: SymbolKind,
        result: &mut ExecutionResult,
    ) {
        let mut per_file: HashMap<&Path, Vec<&RemovalItem>> = HashMap::new();
        for item in items {
            per_file.entry(item.file()).or_default().push(item);
        }

        for (file, mut file_items) in per_file {
            file_items.sort_by(|a, b| {
                b.unused.decl.span.start_byte.cmp(&a.unused.decl.span.start_byte)
            });
            let mut contents = match self.read(file) {
                Ok(c) => c,
                Err(e) => {
                    self.record_failure(result, file, e.to_string());
                    continue;
                }
            };

            let mut removed = 0;
            for item in file_items {
                let edited = match kind {
                    SymbolKind::Variable => {
                        edits::remove_span(&contents, &item.unused.decl.span)
                    }
                    _ => edits::remove_braced_block(&contents, item.unused.decl.span.start_byte),
                };
                match edited {
                    Some(edited) => {
                        contents = edited;
                        removed += 1;
                    }
                    None => self.record_failure(
                        result,
                        file,
                        format!("could not bound removal of `{}`", item.name()),
                    ),
                }
            }

            if removed > 0 {
                match self.write(file, &contents, result) {
                    Ok(()) => match kind {
                        SymbolKind::Variable => result.variables_removed += removed,
                        _ => result.methods_removed += removed,
                    },
                    Err(e) => self.record_failure(result, file, e.to_string()),
                }
            }
        }
    }

    /// Rewrites every non-canonical member into a call to the canonical one
    fn refactor_group(&mut self, group: &DuplicateMatch, result: &mut ExecutionResult) {
        let canonical_index = edits::pick_canonical(&group.members, self.scorer.as_ref());
        let canonical = group.members[canonical_index].clone();

        for (index, member) in group.members.iter().enumerate() {
            if index == canonical_index {
                continue;
            }
            match self.rewrite_member(member, &canonical, result) {
                Ok(()) => result.duplicates_refactored += 1,
                Err(reason) => self.record_failure(result, &member.file, reason),
            }
        }
    }

    fn rewrite_member(
        &mut self,
        member: &Fragment,
        canonical: &Fragment,
        result: &mut ExecutionResult,
    ) -> std::result::Result<(), String> {
        let contents = self.read(&member.file).map_err(|e| e.to_string())?;
        let rewritten = edits::rewrite_as_delegate(&contents, member, canonical)
            .ok_or_else(|| format!("could not bound duplicate `{}`", member.name))?;
        self.write(&member.file, &rewritten, result)
            .map_err(|e| e.to_string())
    }

    /// Extracts the canonical template block into a shared partial and
    /// replaces every member with an include of it
    fn create_component(&mut self, group: &DuplicateMatch, result: &mut ExecutionResult) {
        let canonical_index = edits::pick_canonical(&group.members, self.scorer.as_ref());
        let canonical = &group.members[canonical_index];

        let component_name = format!("extracted-{}", result.components_created + 1);
        let component_path = self
            .project_root
            .join("resources/components")
            .join(format!("{}.blade.php", component_name));
        if let Some(parent) = component_path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                self.record_failure(result, &component_path, e.to_string());
                return;
            }
        }
        if let Err(e) = fs::write(&component_path, &canonical.content) {
            self.record_failure(result, &component_path, e.to_string());
            return;
        }
        result.files_created.push(component_path.clone());

        let include = format!("@include('components.{}')", component_name);
        let mut replaced_any = false;
        for member in &group.members {
            match self.replace_block(member, &include, result) {
                Ok(()) => replaced_any = true,
                Err(reason) => self.record_failure(result, &member.file, reason),
            }
        }
        if replaced_any {
            result.components_created += 1;
        }
    }

    fn replace_block(
        &mut self,
        member: &Fragment,
        replacement: &str,
        result: &mut ExecutionResult,
    ) -> std::result::Result<(), String> {
        let contents = self.read(&member.file).map_err(|e| e.to_string())?;
        let start = member.span.start_byte;
        let end = member.span.end_byte;
        if start >= end || end > contents.len() || !contents.is_char_boundary(start) || !contents.is_char_boundary(end) {
            return Err(format!("could not bound template block `{}`", member.name));
        }
        let mut out = String::with_capacity(contents.len());
        out.push_str(&contents[..start]);
        out.push_str(replacement);
        out.push_str(&contents[end..]);
        self.write(&member.file, &out, result).map_err(|e| e.to_string())
    }

    /// Deletion is double-gated at execution time: the file must still
    /// exist, and an independent check re-verifies it is not protected and
    /// not a dynamically-referenced naming pattern
    fn delete_files(&mut self, plan: &CleanupPlan, result: &mut ExecutionResult) {
        for deletion in &plan.file_deletions {
            let path = &deletion.path;
            if !path.exists() {
                self.record_failure(result, path, "file vanished before deletion");
                continue;
            }
            if !self.safe_to_delete(path) {
                self.record_failure(result, path, "deletion gate refused at execution time");
                continue;
            }
            if let Some(backups) = &mut self.backups {
                if let Err(e) = backups.back_up(path) {
                    self.record_failure(result, path, e.to_string());
                    continue;
                }
                result.record_backed_up(path);
            }
            let removed = fs::read_to_string(path).ok();
            match fs::remove_file(path) {
                Ok(()) => {
                    result.files_deleted += 1;
                    if let Some(contents) = removed {
                        result.bytes_removed += contents.len() as u64;
                        result.lines_removed += contents.lines().count();
                    }
                }
                Err(e) => self.record_failure(result, path, e.to_string()),
            }
        }
    }

    fn safe_to_delete(&self, path: &Path) -> bool {
        !self.config.is_protected(path) && !self.config.matches_dynamic_pattern(path)
    }
}
