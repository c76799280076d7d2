// Parallel per-file analysis collection

use super::{analyzer_for, Analyzer, FileAnalysis};
use crate::discovery::SourceFile;
use crate::error::Result;
use rayon::prelude::*;
use tracing::{debug, info, warn};

/// Fans per-file analysis out across the rayon pool and collects the
/// surviving records. A collaborator failure on one file never cancels
/// sibling work; the file is logged and excluded.
pub struct AnalysisCollector {
    custom: Vec<Box<dyn Analyzer>>,
}

impl AnalysisCollector {
    pub fn new() -> Self {
        Self { custom: Vec::new() }
    }

    /// Register a collaborator that takes precedence over the built-ins
    pub fn with_analyzer(mut self, analyzer: Box<dyn Analyzer>) -> Self {
        self.custom.push(analyzer);
        self
    }

    /// Analyze all files, returning records plus the count of excluded files
    pub fn collect(&self, files: &[SourceFile]) -> Result<(Vec<FileAnalysis>, usize)> {
        info!("Analyzing {} files...", files.len());

        let results: Vec<std::result::Result<FileAnalysis, String>> = files
            .par_iter()
            .map(|file| self.analyze_one(file))
            .collect();

        let mut analyses = Vec::with_capacity(results.len());
        let mut excluded = 0usize;
        for result in results {
            match result {
                Ok(analysis) => analyses.push(analysis),
                Err(msg) => {
                    // File excluded, run continues
                    warn!("Analysis failed (file excluded): {}", msg);
                    excluded += 1;
                }
            }
        }

        let total_symbols: usize = analyses.iter().map(|a| a.symbols.len()).sum();
        let total_fragments: usize = analyses.iter().map(|a| a.fragments.len()).sum();
        info!(
            "Collected {} records ({} symbols, {} fragments), {} excluded",
            analyses.len(),
            total_symbols,
            total_fragments,
            excluded
        );

        Ok((analyses, excluded))
    }

    fn analyze_one(&self, file: &SourceFile) -> std::result::Result<FileAnalysis, String> {
        let contents = std::fs::read_to_string(&file.path)
            .map_err(|e| format!("{}: {}", file.path.display(), e))?;

        let analyzer = self
            .custom
            .iter()
            .find(|a| a.handles(file.kind))
            .map(|a| a.as_ref())
            .unwrap_or_else(|| analyzer_for(file.kind));

        debug!("Analyzing {}", file.path.display());
        analyzer
            .parse_file(&file.path, &contents)
            .map_err(|e| format!("{}: {}", file.path.display(), e))
    }
}

impl Default for AnalysisCollector {
    fn default() -> Self {
        Self::new()
    }
}
