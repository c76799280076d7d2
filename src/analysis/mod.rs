//! Shared analysis data model and the per-language collaborator seam.
//!
//! The core never parses source text itself; it consumes normalized
//! [`FileAnalysis`] records produced by [`Analyzer`] implementations, one per
//! source file. Records are immutable once produced.

mod collect;
mod extractors;

pub use collect::AnalysisCollector;
pub use extractors::{
    analyzer_for, PhpAnalyzer, ScriptAnalyzer, StylesheetAnalyzer, TemplateAnalyzer,
};
pub(crate) use extractors::match_braces;

use crate::discovery::SourceKind;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Source span of a declaration or fragment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    /// Line number (1-indexed)
    pub start_line: usize,
    /// Inclusive end line, when known
    pub end_line: usize,
    pub start_byte: usize,
    pub end_byte: usize,
}

impl Span {
    pub fn new(start_line: usize, end_line: usize, start_byte: usize, end_byte: usize) -> Self {
        Self {
            start_line,
            end_line,
            start_byte,
            end_byte,
        }
    }

    pub fn byte_len(&self) -> usize {
        self.end_byte.saturating_sub(self.start_byte)
    }
}

/// Visibility modifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Visibility {
    #[default]
    Public,
    Protected,
    Private,
}

impl Visibility {
    pub fn from_modifier(modifier: &str) -> Self {
        match modifier {
            "private" => Visibility::Private,
            "protected" => Visibility::Protected,
            _ => Visibility::Public,
        }
    }

    /// Public symbols are never removal candidates; cross-repository
    /// consumers are invisible to the engine.
    pub fn is_removal_candidate(&self) -> bool {
        !matches!(self, Visibility::Public)
    }
}

/// Kind of declared symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SymbolKind {
    Function,
    Method,
    Variable,
}

impl SymbolKind {
    pub fn display_name(&self) -> &'static str {
        match self {
            SymbolKind::Function => "function",
            SymbolKind::Method => "method",
            SymbolKind::Variable => "variable",
        }
    }
}

/// Uniquely identifies a method/function across the codebase.
/// Owner is `None` for free functions and file-level variables.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SymbolKey {
    pub owner: Option<String>,
    pub name: String,
}

impl SymbolKey {
    pub fn new(owner: Option<String>, name: impl Into<String>) -> Self {
        Self {
            owner,
            name: name.into(),
        }
    }

    pub fn free(name: impl Into<String>) -> Self {
        Self {
            owner: None,
            name: name.into(),
        }
    }

    pub fn method(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: Some(owner.into()),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for SymbolKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.owner {
            Some(owner) => write!(f, "{}::{}", owner, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// A declared function, method or variable
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolDecl {
    pub name: String,

    /// Owning type, when the symbol is a class member
    pub owner: Option<String>,

    pub kind: SymbolKind,
    pub visibility: Visibility,

    /// Parameter names (types folded in where the source declares them)
    pub params: Vec<String>,

    pub return_type: Option<String>,

    pub span: Span,

    /// Raw body text, used for duplicate comparison and canonical selection
    pub body: String,

    /// Whether a doc comment precedes the declaration
    pub has_doc: bool,
}

impl SymbolDecl {
    pub fn key(&self) -> SymbolKey {
        SymbolKey::new(self.owner.clone(), self.name.clone())
    }
}

/// A declared class or interface with its hierarchy links
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeDecl {
    pub name: String,
    pub parent: Option<String>,
    pub interfaces: Vec<String>,
    pub is_interface: bool,
}

/// An observed call site
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallSite {
    /// Receiver type hint: the enclosing class for `$this->` calls, the named
    /// class for static calls, `None` for free calls
    pub receiver: Option<String>,
    pub name: String,
    pub line: usize,
}

/// A dynamic-dispatch pattern observed in a file.
///
/// Presence of these patterns anywhere in the codebase makes name-based
/// removal unsound, so each occurrence is recorded with whatever name
/// correlation the source offers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DynamicCall {
    pub pattern: DynamicPattern,
    /// Symbol name the pattern could be observed referring to, when the
    /// source makes one visible (e.g. a string literal argument)
    pub name_hint: Option<String>,
    pub line: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DynamicPattern {
    /// `$obj->$method()` / `obj[expr]()` — computed member access
    ComputedMember,
    /// `call_user_func`, `Function.prototype.apply`, reflection APIs
    ReflectiveInvocation,
    /// `eval` and equivalents
    Eval,
    /// variable-variable / computed property name
    ComputedProperty,
}

impl DynamicPattern {
    /// Risk weight used by the safety gate
    pub fn risk(&self) -> DynamicRisk {
        match self {
            DynamicPattern::Eval | DynamicPattern::ReflectiveInvocation => DynamicRisk::High,
            DynamicPattern::ComputedMember => DynamicRisk::Medium,
            DynamicPattern::ComputedProperty => DynamicRisk::Low,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DynamicRisk {
    Low,
    Medium,
    High,
}

/// Kind of fragment considered for duplicate comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FragmentKind {
    MethodBody,
    StyleRule,
    TemplateBlock,
}

/// A unit of code/style/template content considered for duplicate comparison
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fragment {
    pub file: PathBuf,
    pub kind: FragmentKind,

    /// Method name, style selector or template block label
    pub name: String,

    pub content: String,
    pub byte_len: usize,

    /// Class names (selector classes for style rules, `class=` attribute
    /// values for template blocks)
    pub classes: Vec<String>,

    /// Method signature data; empty/None for non-method fragments
    pub params: Vec<String>,
    pub return_type: Option<String>,

    pub span: Span,
}

/// Normalized per-file analysis record produced by a collaborator.
/// Immutable once produced; one per source file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileAnalysis {
    pub path: PathBuf,
    pub kind: SourceKind,
    pub byte_len: usize,

    pub symbols: Vec<SymbolDecl>,
    pub types: Vec<TypeDecl>,

    /// Imported/used external names
    pub imports: Vec<ImportDecl>,

    pub calls: Vec<CallSite>,
    pub dynamic_calls: Vec<DynamicCall>,

    pub fragments: Vec<Fragment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportDecl {
    /// Imported name as written (`App\Models\User`, `./util.js`)
    pub name: String,
    /// Short name used to look for references (`User`, `util`)
    pub short_name: String,
    pub span: Span,
}

impl FileAnalysis {
    pub fn empty(path: PathBuf, kind: SourceKind) -> Self {
        Self {
            path,
            kind,
            byte_len: 0,
            symbols: Vec::new(),
            types: Vec::new(),
            imports: Vec::new(),
            calls: Vec::new(),
            dynamic_calls: Vec::new(),
            fragments: Vec::new(),
        }
    }
}

/// Per-language analysis collaborator.
///
/// A failure means "file excluded from the plan", never a fatal run error.
pub trait Analyzer: Send + Sync {
    fn handles(&self, kind: SourceKind) -> bool;

    fn parse_file(&self, path: &std::path::Path, contents: &str) -> crate::error::Result<FileAnalysis>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_key_display() {
        assert_eq!(SymbolKey::method("Cart", "total").to_string(), "Cart::total");
        assert_eq!(SymbolKey::free("render").to_string(), "render");
    }

    #[test]
    fn test_visibility_candidates() {
        assert!(!Visibility::Public.is_removal_candidate());
        assert!(Visibility::Private.is_removal_candidate());
        assert!(Visibility::Protected.is_removal_candidate());
    }

    #[test]
    fn test_dynamic_pattern_risk() {
        assert_eq!(DynamicPattern::Eval.risk(), DynamicRisk::High);
        assert_eq!(DynamicPattern::ComputedMember.risk(), DynamicRisk::Medium);
        assert!(DynamicRisk::High > DynamicRisk::Low);
    }
}
