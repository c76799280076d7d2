// File discovery utilities

use crate::config::CleanupConfig;
use crate::error::Result;
use ignore::WalkBuilder;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Kind of source artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceKind {
    Php,
    JavaScript,
    Stylesheet,
    Template,
}

impl SourceKind {
    /// Determine source kind from path
    pub fn from_path(path: &Path) -> Option<Self> {
        let file_name = path.file_name()?.to_str()?;

        // Blade templates carry a double extension
        if file_name.ends_with(".blade.php") {
            return Some(SourceKind::Template);
        }

        let extension = path.extension()?.to_str()?;
        match extension {
            "php" => Some(SourceKind::Php),
            "js" | "mjs" => Some(SourceKind::JavaScript),
            "css" | "scss" | "less" => Some(SourceKind::Stylesheet),
            "html" | "htm" | "twig" | "tpl" => Some(SourceKind::Template),
            _ => None,
        }
    }

    /// Check if this kind carries callable symbols
    pub fn is_code(&self) -> bool {
        matches!(self, SourceKind::Php | SourceKind::JavaScript)
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            SourceKind::Php => "php",
            SourceKind::JavaScript => "javascript",
            SourceKind::Stylesheet => "stylesheet",
            SourceKind::Template => "template",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// A discovered source file
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Path to the file
    pub path: PathBuf,

    /// Kind of source artifact
    pub kind: SourceKind,
}

impl SourceFile {
    pub fn new(path: PathBuf, kind: SourceKind) -> Self {
        Self { path, kind }
    }

    /// Load and return owned contents
    pub fn read_contents(&self) -> Result<String> {
        Ok(std::fs::read_to_string(&self.path)?)
    }
}

/// File finder for discovering source files in a project
pub struct FileFinder<'a> {
    config: &'a CleanupConfig,
}

impl<'a> FileFinder<'a> {
    pub fn new(config: &'a CleanupConfig) -> Self {
        Self { config }
    }

    /// Find all source files under the configured source directories
    pub fn find_files(&self, root: &Path) -> Result<Vec<SourceFile>> {
        debug!("Scanning for files in: {}", root.display());

        let targets = if self.config.source_dirs.is_empty() {
            vec![root.to_path_buf()]
        } else {
            self.config
                .source_dirs
                .iter()
                .map(|t| root.join(t))
                .collect()
        };

        let files: Vec<SourceFile> = targets
            .par_iter()
            .flat_map(|target| self.scan_directory(target))
            .collect();

        debug!("Found {} files", files.len());
        Ok(files)
    }

    /// Scan a single directory for source files
    fn scan_directory(&self, dir: &Path) -> Vec<SourceFile> {
        if !dir.exists() {
            trace!("Directory does not exist: {}", dir.display());
            return Vec::new();
        }

        let walker = WalkBuilder::new(dir)
            .hidden(true)
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true)
            .ignore(true)
            .parents(true)
            .follow_links(false)
            .build();

        walker
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
            .filter_map(|entry| {
                let path = entry.path();

                if self.config.should_exclude(path) {
                    trace!("Excluding: {}", path.display());
                    return None;
                }

                let kind = SourceKind::from_path(path)?;

                trace!("Found {:?}: {}", kind, path.display());
                Some(SourceFile::new(path.to_path_buf(), kind))
            })
            .collect()
    }

    /// Find only code files (PHP and JavaScript)
    pub fn find_code_files(&self, root: &Path) -> Result<Vec<SourceFile>> {
        let files = self.find_files(root)?;
        Ok(files.into_iter().filter(|f| f.kind.is_code()).collect())
    }
}

/// Statistics about discovered files
#[derive(Debug, Default)]
pub struct FileStats {
    pub php_files: usize,
    pub js_files: usize,
    pub stylesheet_files: usize,
    pub template_files: usize,
}

impl FileStats {
    pub fn from_files(files: &[SourceFile]) -> Self {
        let mut stats = Self::default();
        for file in files {
            match file.kind {
                SourceKind::Php => stats.php_files += 1,
                SourceKind::JavaScript => stats.js_files += 1,
                SourceKind::Stylesheet => stats.stylesheet_files += 1,
                SourceKind::Template => stats.template_files += 1,
            }
        }
        stats
    }

    pub fn total(&self) -> usize {
        self.php_files + self.js_files + self.stylesheet_files + self.template_files
    }
}
