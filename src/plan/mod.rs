//! Cleanup plan assembly.
//!
//! Merges the unused-symbol findings with the duplicate matches into a
//! single plan the executor and the safety gate both consume. The plan is
//! data only; nothing here touches the filesystem.

use crate::analysis::{FileAnalysis, FragmentKind, SymbolKind};
use crate::config::CleanupConfig;
use crate::dupes::DuplicateMatch;
use crate::error::{CleanupError, Result};
use crate::usage::{DynamicExposure, UnusedImport, UnusedSymbol};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::info;

/// Average on-disk cost of one import line
pub const IMPORT_ESTIMATE_BYTES: u64 = 50;
/// Average on-disk cost of one method body
pub const METHOD_ESTIMATE_BYTES: u64 = 500;

/// One removable symbol, carried with enough context to edit the file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemovalItem {
    pub unused: UnusedSymbol,
}

impl RemovalItem {
    pub fn file(&self) -> &Path {
        &self.unused.file
    }

    pub fn name(&self) -> &str {
        &self.unused.decl.name
    }
}

/// A whole file judged removable (no retained symbol, no inbound reference)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletionItem {
    pub path: PathBuf,
    pub byte_len: u64,
}

/// Everything the run intends to change, split by category.
///
/// The executor consumes the categories in a fixed order; the plan itself
/// imposes none.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CleanupPlan {
    pub unused_imports: Vec<UnusedImport>,
    pub unused_variables: Vec<RemovalItem>,
    pub unused_methods: Vec<RemovalItem>,
    pub duplicate_methods: Vec<DuplicateMatch>,
    pub duplicate_templates: Vec<DuplicateMatch>,
    pub duplicate_styles: Vec<DuplicateMatch>,
    pub file_deletions: Vec<DeletionItem>,
}

impl CleanupPlan {
    pub fn is_empty(&self) -> bool {
        self.total_items() == 0
    }

    pub fn total_items(&self) -> usize {
        self.unused_imports.len()
            + self.unused_variables.len()
            + self.unused_methods.len()
            + self.duplicate_methods.len()
            + self.duplicate_templates.len()
            + self.duplicate_styles.len()
            + self.file_deletions.len()
    }

    /// Symbols in the plan that remain exposed to dynamic dispatch; the
    /// safety gate prices these in
    pub fn dynamic_exposures(&self) -> Vec<DynamicExposure> {
        self.unused_methods
            .iter()
            .chain(self.unused_variables.iter())
            .map(|item| item.unused.exposure)
            .filter(|e| *e != DynamicExposure::None)
            .collect()
    }

    /// Estimated bytes reclaimed: flat per-item rates for edits, actual
    /// file sizes for deletions
    pub fn estimated_savings(&self) -> u64 {
        let imports = self.unused_imports.len() as u64 * IMPORT_ESTIMATE_BYTES;
        let methods = (self.unused_methods.len() + self.unused_variables.len()) as u64
            * METHOD_ESTIMATE_BYTES;
        let deletions: u64 = self.file_deletions.iter().map(|d| d.byte_len).sum();
        imports + methods + deletions
    }

    /// Every file the plan touches, deduplicated
    pub fn touched_files(&self) -> Vec<PathBuf> {
        let mut files: HashSet<PathBuf> = HashSet::new();
        for import in &self.unused_imports {
            files.insert(import.file.clone());
        }
        for item in self.unused_variables.iter().chain(self.unused_methods.iter()) {
            files.insert(item.file().to_path_buf());
        }
        for group in self
            .duplicate_methods
            .iter()
            .chain(self.duplicate_templates.iter())
            .chain(self.duplicate_styles.iter())
        {
            for member in &group.members {
                files.insert(member.file.clone());
            }
        }
        for deletion in &self.file_deletions {
            files.insert(deletion.path.clone());
        }
        let mut out: Vec<PathBuf> = files.into_iter().collect();
        out.sort();
        out
    }

    /// Rejects a plan that targets protected paths or files the analysis
    /// never saw
    pub fn validate(&self, config: &CleanupConfig, analyzed: &[FileAnalysis]) -> Result<()> {
        let known: HashSet<&Path> = analyzed.iter().map(|a| a.path.as_path()).collect();

        for file in self.touched_files() {
            if config.is_protected(&file) {
                return Err(CleanupError::PlanValidation {
                    reason: format!("plan targets protected path {}", file.display()),
                });
            }
            if !known.contains(file.as_path()) {
                return Err(CleanupError::PlanValidation {
                    reason: format!(
                        "plan targets {} which was never analyzed",
                        file.display()
                    ),
                });
            }
        }
        Ok(())
    }
}

/// Builds a [`CleanupPlan`] from findings, honoring the per-category
/// config toggles
pub struct PlanBuilder<'a> {
    config: &'a CleanupConfig,
}

impl<'a> PlanBuilder<'a> {
    pub fn new(config: &'a CleanupConfig) -> Self {
        Self { config }
    }

    pub fn build(
        &self,
        analyses: &[FileAnalysis],
        unused_symbols: Vec<UnusedSymbol>,
        unused_imports: Vec<UnusedImport>,
        duplicates: Vec<DuplicateMatch>,
    ) -> CleanupPlan {
        let categories = &self.config.categories;
        let mut plan = CleanupPlan::default();

        if categories.remove_unused_imports {
            plan.unused_imports = unused_imports;
        }

        for unused in unused_symbols {
            match unused.decl.kind {
                SymbolKind::Variable if categories.remove_unused_variables => {
                    plan.unused_variables.push(RemovalItem { unused });
                }
                SymbolKind::Function | SymbolKind::Method
                    if categories.remove_unused_methods =>
                {
                    plan.unused_methods.push(RemovalItem { unused });
                }
                _ => {}
            }
        }

        if categories.refactor_duplicates || categories.create_components {
            for group in duplicates {
                match group.kind {
                    FragmentKind::TemplateBlock if categories.create_components => {
                        plan.duplicate_templates.push(group);
                    }
                    FragmentKind::StyleRule if categories.refactor_duplicates => {
                        plan.duplicate_styles.push(group);
                    }
                    FragmentKind::MethodBody if categories.refactor_duplicates => {
                        plan.duplicate_methods.push(group);
                    }
                    _ => {}
                }
            }
        }

        if categories.delete_files {
            plan.file_deletions = self.deletable_files(analyses, &plan);
        }

        info!(
            "Plan: {} imports, {} variables, {} methods, {} duplicate groups, {} deletions",
            plan.unused_imports.len(),
            plan.unused_variables.len(),
            plan.unused_methods.len(),
            plan.duplicate_methods.len()
                + plan.duplicate_templates.len()
                + plan.duplicate_styles.len(),
            plan.file_deletions.len()
        );
        plan
    }

    /// A file is deletable only when every symbol it declares is in the
    /// unused set and nothing else in the codebase imports it
    fn deletable_files(&self, analyses: &[FileAnalysis], plan: &CleanupPlan) -> Vec<DeletionItem> {
        let removed: HashSet<(PathBuf, String)> = plan
            .unused_methods
            .iter()
            .chain(plan.unused_variables.iter())
            .map(|item| (item.file().to_path_buf(), item.name().to_string()))
            .collect();

        let imported_files: HashSet<String> = analyses
            .iter()
            .flat_map(|a| a.imports.iter().map(|i| i.short_name.clone()))
            .collect();

        analyses
            .iter()
            .filter(|analysis| {
                !analysis.symbols.is_empty()
                    && analysis.symbols.iter().all(|s| {
                        removed.contains(&(analysis.path.clone(), s.name.clone()))
                    })
                    && analysis
                        .path
                        .file_stem()
                        .and_then(|s| s.to_str())
                        .map(|stem| !imported_files.contains(stem))
                        .unwrap_or(false)
                    && !self.config.is_protected(&analysis.path)
            })
            .map(|analysis| DeletionItem {
                path: analysis.path.clone(),
                byte_len: analysis.byte_len as u64,
            })
            .collect()
    }
}
