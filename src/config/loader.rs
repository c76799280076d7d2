// Configuration loader

use miette::{IntoDiagnostic, Result, WrapErr};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for a cleanup run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanupConfig {
    /// Source directories to analyze (relative to the project root)
    pub source_dirs: Vec<PathBuf>,

    /// Patterns to exclude from analysis
    pub exclude: Vec<String>,

    /// Report the plan without touching any file
    pub dry_run: bool,

    /// Copy every file into the backup directory before modifying it
    pub create_backup: bool,

    /// Run the validation test suites before and after execution
    pub run_tests: bool,

    /// Per-category enable flags
    pub categories: CategoryConfig,

    /// Safety gate configuration
    pub safety: SafetyConfig,

    /// Directory for timestamped backup copies
    pub backup_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryConfig {
    pub remove_unused_imports: bool,
    pub remove_unused_methods: bool,
    pub remove_unused_variables: bool,
    pub refactor_duplicates: bool,
    pub create_components: bool,
    pub delete_files: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetyConfig {
    /// Paths that must never be modified or deleted
    pub protected_paths: Vec<String>,

    /// Naming patterns that suggest dynamic references; files matching these
    /// are never deleted
    pub dynamic_reference_patterns: Vec<String>,

    /// Validation suites to run as part of the safety gate
    pub test_suites: Vec<String>,

    /// Treat a suite run longer than this many seconds as a risk signal
    pub max_suite_seconds: u64,

    /// How many checkpoints/backups to keep when pruning history
    pub retention: usize,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            source_dirs: vec![PathBuf::from("src")],
            exclude: vec![
                "**/vendor/**".to_string(),
                "**/node_modules/**".to_string(),
                "**/cache/**".to_string(),
                "**/.git/**".to_string(),
            ],
            dry_run: false,
            create_backup: true,
            run_tests: true,
            categories: CategoryConfig::default(),
            safety: SafetyConfig::default(),
            backup_dir: PathBuf::from(".codesweep-backups"),
        }
    }
}

impl Default for CategoryConfig {
    fn default() -> Self {
        Self {
            remove_unused_imports: true,
            remove_unused_methods: true,
            remove_unused_variables: true,
            refactor_duplicates: true,
            create_components: false,
            delete_files: false,
        }
    }
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            protected_paths: vec![
                "**/config/**".to_string(),
                "**/migrations/**".to_string(),
                "index.php".to_string(),
                "**/bootstrap/**".to_string(),
            ],
            dynamic_reference_patterns: vec![
                "*Controller*".to_string(),
                "*Handler*".to_string(),
                "*Provider*".to_string(),
            ],
            test_suites: vec!["unit".to_string(), "feature".to_string()],
            max_suite_seconds: 300,
            retention: 10,
        }
    }
}

impl CleanupConfig {
    /// Load configuration from a file (YAML or TOML)
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .into_diagnostic()
            .wrap_err_with(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        match extension {
            "yml" | "yaml" => serde_yaml::from_str(&contents)
                .into_diagnostic()
                .wrap_err("Failed to parse YAML config"),
            "toml" => toml::from_str(&contents)
                .into_diagnostic()
                .wrap_err("Failed to parse TOML config"),
            _ => {
                // Try YAML first, then TOML
                if let Ok(config) = serde_yaml::from_str(&contents) {
                    Ok(config)
                } else {
                    toml::from_str(&contents)
                        .into_diagnostic()
                        .wrap_err("Failed to parse config file")
                }
            }
        }
    }

    /// Try to load configuration from default locations
    pub fn from_default_locations(project_root: &Path) -> Result<Self> {
        let default_names = [
            ".codesweep.yml",
            ".codesweep.yaml",
            ".codesweep.toml",
            "codesweep.yml",
            "codesweep.yaml",
            "codesweep.toml",
        ];

        for name in &default_names {
            let path = project_root.join(name);
            if path.exists() {
                return Self::from_file(&path);
            }
        }

        // No config file found, use defaults
        Ok(Self::default())
    }

    /// Check if a path matches an exclusion pattern
    pub fn should_exclude(&self, path: &Path) -> bool {
        let path_str = path.to_string_lossy();
        self.exclude.iter().any(|pattern| glob_match(pattern, &path_str))
    }

    /// Check if a path is protected from modification and deletion
    pub fn is_protected(&self, path: &Path) -> bool {
        let path_str = path.to_string_lossy();
        self.safety
            .protected_paths
            .iter()
            .any(|pattern| glob_match(pattern, &path_str))
    }

    /// Check if a file name matches a dynamic-reference naming pattern
    pub fn matches_dynamic_pattern(&self, path: &Path) -> bool {
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        self.safety
            .dynamic_reference_patterns
            .iter()
            .any(|pattern| glob_match(pattern, &name))
    }
}

/// Simple glob matching for patterns like "*Controller" or "**/vendor/**"
pub fn glob_match(pattern: &str, text: &str) -> bool {
    // Pattern like "*Thing*" matches anything containing "Thing"
    if pattern.starts_with('*') && pattern.ends_with('*') && !pattern.contains('/') {
        let inner = pattern.trim_matches('*');
        if !inner.is_empty() {
            return text.contains(inner);
        }
        return true;
    }

    if pattern.starts_with('*') && !pattern.contains('/') {
        let suffix = &pattern[1..];
        return text.ends_with(suffix);
    }

    if pattern.ends_with('*') && !pattern.contains('/') {
        let prefix = &pattern[..pattern.len() - 1];
        return text.starts_with(prefix);
    }

    // Path patterns with **
    if pattern.contains("**") {
        if pattern.starts_with("**/") && pattern.ends_with("/**") {
            let dir_name = pattern
                .trim_start_matches("**/")
                .trim_end_matches("/**")
                .trim_matches('/');
            // Must match as a complete directory name, not a substring
            let dir_pattern = format!("/{}/", dir_name);
            return text.contains(&dir_pattern) || text.starts_with(&format!("{}/", dir_name));
        }

        let parts: Vec<&str> = pattern.split("**").collect();
        if parts.len() == 2 {
            let prefix = parts[0].trim_end_matches('/');
            let suffix = parts[1].trim_start_matches('/');

            if prefix.is_empty() && suffix.is_empty() {
                return true;
            }
            if prefix.is_empty() {
                return text.ends_with(suffix) || text.contains(&format!("/{}", suffix));
            }
            if suffix.is_empty() {
                return text.starts_with(prefix) || text.contains(&format!("{}/", prefix));
            }
            return (text.starts_with(prefix) || text.contains(&format!("/{}/", prefix)))
                && (text.ends_with(suffix) || text.contains(&format!("/{}", suffix)));
        }
    }

    // Exact match (the file name itself, anywhere in the tree)
    text == pattern || text.ends_with(&format!("/{}", pattern))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glob_match_suffix() {
        assert!(glob_match("*Controller", "UserController"));
        assert!(!glob_match("*Controller", "ControllerHelper"));
    }

    #[test]
    fn test_glob_match_contains() {
        assert!(glob_match("*Handler*", "RequestHandlerFactory"));
        assert!(!glob_match("*Handler*", "RequestDispatcher"));
    }

    #[test]
    fn test_glob_match_path() {
        assert!(glob_match("**/vendor/**", "/project/vendor/lib.php"));
        assert!(glob_match("**/vendor/**", "app/vendor/autoload.php"));
        assert!(!glob_match("**/vendor/**", "/project/src/main.php"));
    }

    #[test]
    fn test_exact_file_pattern() {
        assert!(glob_match("index.php", "public/index.php"));
        assert!(!glob_match("index.php", "public/index.phps"));
    }

    #[test]
    fn test_default_config() {
        let config = CleanupConfig::default();
        assert!(config.categories.remove_unused_imports);
        assert!(!config.categories.delete_files);
        assert!(config.create_backup);
    }

    #[test]
    fn test_protected_path() {
        let config = CleanupConfig::default();
        assert!(config.is_protected(Path::new("app/config/database.php")));
        assert!(!config.is_protected(Path::new("app/models/User.php")));
    }

    #[test]
    fn test_dynamic_pattern() {
        let config = CleanupConfig::default();
        assert!(config.matches_dynamic_pattern(Path::new("app/UserController.php")));
        assert!(!config.matches_dynamic_pattern(Path::new("app/User.php")));
    }
}
