mod loader;

pub use loader::{glob_match, CategoryConfig, CleanupConfig, SafetyConfig};
