//! Usage Resolution Engine.
//!
//! Builds a cross-file class/interface hierarchy and a call-site table from
//! the analysis records, then answers "is this symbol reachable". Built once
//! per run; read-only afterward.

use crate::analysis::{
    CallSite, DynamicCall, FileAnalysis, ImportDecl, SymbolDecl, SymbolKey, SymbolKind,
};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use tracing::{debug, info};

/// Method names the host language or framework invokes implicitly; never
/// removal candidates
const LIFECYCLE_METHODS: &[&str] = &[
    "__construct",
    "__destruct",
    "__get",
    "__set",
    "__call",
    "__callStatic",
    "__toString",
    "__invoke",
    "__clone",
    "__wakeup",
    "__sleep",
    "__isset",
    "__unset",
    "boot",
    "register",
    "main",
];

/// How exposed a symbol is to dynamic dispatch.
///
/// The engine keeps the original conservative policy: any dynamic-call
/// pattern anywhere in the codebase marks every symbol as possibly used.
/// The per-symbol distinction makes the over-approximation explicit and
/// gives a seam for tightening it to name correlation later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DynamicExposure {
    /// No dynamic pattern anywhere in the codebase
    None,
    /// Dynamic patterns exist somewhere, with no name correlation to this
    /// symbol
    Global,
    /// A dynamic call site names this symbol (string literal correlation)
    NameMatch,
}

/// Inheritance edge kind in the type hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HierEdge {
    Extends,
    Implements,
}

#[derive(Debug, Clone)]
struct TypeInfo {
    parent: Option<String>,
    interfaces: Vec<String>,
    is_interface: bool,
    declared: Vec<SymbolKey>,
}

/// A non-public symbol with no observed use
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnusedSymbol {
    pub file: PathBuf,
    pub decl: SymbolDecl,
    pub exposure: DynamicExposure,
}

/// An import never referenced in its file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnusedImport {
    pub file: PathBuf,
    pub import: ImportDecl,
}

/// Cross-file type hierarchy plus observed call sites
pub struct UseGraph {
    hierarchy: DiGraph<String, HierEdge>,
    type_nodes: HashMap<String, NodeIndex>,
    types: HashMap<String, TypeInfo>,

    /// Call sites keyed by `(receiver, name)`
    call_index: HashMap<SymbolKey, Vec<CallSite>>,
    /// Names observed in receiver-less calls
    free_call_names: HashSet<String>,

    dynamic_calls: Vec<DynamicCall>,
    dynamic_name_hints: HashSet<String>,
}

impl UseGraph {
    /// Two-pass build: type declarations first, then symbols and call sites
    pub fn build(analyses: &[FileAnalysis]) -> Self {
        let mut graph = Self {
            hierarchy: DiGraph::new(),
            type_nodes: HashMap::new(),
            types: HashMap::new(),
            call_index: HashMap::new(),
            free_call_names: HashSet::new(),
            dynamic_calls: Vec::new(),
            dynamic_name_hints: HashSet::new(),
        };

        // Pass 1: types with their parent/interface links
        for analysis in analyses {
            for ty in &analysis.types {
                graph.types.insert(
                    ty.name.clone(),
                    TypeInfo {
                        parent: ty.parent.clone(),
                        interfaces: ty.interfaces.clone(),
                        is_interface: ty.is_interface,
                        declared: Vec::new(),
                    },
                );
                graph.type_node(&ty.name);
            }
        }
        let edges: Vec<(String, String, HierEdge)> = graph
            .types
            .iter()
            .flat_map(|(name, info)| {
                let mut out = Vec::new();
                if let Some(parent) = &info.parent {
                    out.push((name.clone(), parent.clone(), HierEdge::Extends));
                }
                for iface in &info.interfaces {
                    out.push((name.clone(), iface.clone(), HierEdge::Implements));
                }
                out
            })
            .collect();
        for (child, parent, kind) in edges {
            let c = graph.type_node(&child);
            let p = graph.type_node(&parent);
            graph.hierarchy.add_edge(c, p, kind);
        }

        // Pass 2: declared symbols, call sites, dynamic patterns
        for analysis in analyses {
            for symbol in &analysis.symbols {
                if let Some(owner) = &symbol.owner {
                    if let Some(info) = graph.types.get_mut(owner) {
                        info.declared.push(symbol.key());
                    }
                }
            }
            for call in &analysis.calls {
                match &call.receiver {
                    Some(receiver) => {
                        graph
                            .call_index
                            .entry(SymbolKey::method(receiver.clone(), call.name.clone()))
                            .or_default()
                            .push(call.clone());
                    }
                    None => {
                        graph.free_call_names.insert(call.name.clone());
                    }
                }
            }
            for dynamic in &analysis.dynamic_calls {
                if let Some(hint) = &dynamic.name_hint {
                    graph.dynamic_name_hints.insert(hint.clone());
                }
                graph.dynamic_calls.push(dynamic.clone());
            }
        }

        info!(
            "Use graph: {} types, {} keyed call sites, {} dynamic patterns",
            graph.types.len(),
            graph.call_index.len(),
            graph.dynamic_calls.len()
        );
        graph
    }

    fn type_node(&mut self, name: &str) -> NodeIndex {
        if let Some(&idx) = self.type_nodes.get(name) {
            return idx;
        }
        let idx = self.hierarchy.add_node(name.to_string());
        self.type_nodes.insert(name.to_string(), idx);
        idx
    }

    /// All ancestor types (parents and implemented interfaces, transitively)
    pub fn ancestors(&self, type_name: &str) -> Vec<String> {
        self.walk(type_name, Direction::Outgoing)
    }

    /// All descendant types, transitively
    pub fn descendants(&self, type_name: &str) -> Vec<String> {
        self.walk(type_name, Direction::Incoming)
    }

    fn walk(&self, type_name: &str, direction: Direction) -> Vec<String> {
        let Some(&start) = self.type_nodes.get(type_name) else {
            return Vec::new();
        };
        let mut seen = HashSet::new();
        let mut stack = vec![start];
        let mut out = Vec::new();
        while let Some(idx) = stack.pop() {
            for neighbor in self.hierarchy.neighbors_directed(idx, direction) {
                if seen.insert(neighbor) {
                    out.push(self.hierarchy[neighbor].clone());
                    stack.push(neighbor);
                }
            }
        }
        out
    }

    /// Whether any dynamic-dispatch pattern was observed anywhere
    pub fn has_dynamic_patterns(&self) -> bool {
        !self.dynamic_calls.is_empty()
    }

    pub fn dynamic_calls(&self) -> &[DynamicCall] {
        &self.dynamic_calls
    }

    /// Dynamic exposure for a symbol name
    pub fn exposure(&self, name: &str) -> DynamicExposure {
        if self.dynamic_name_hints.contains(name) {
            DynamicExposure::NameMatch
        } else if self.has_dynamic_patterns() {
            DynamicExposure::Global
        } else {
            DynamicExposure::None
        }
    }

    /// Whether a `(type, name)` symbol is judged used
    pub fn is_used(&self, key: &SymbolKey) -> bool {
        // (e) lifecycle names are invoked implicitly
        if LIFECYCLE_METHODS.contains(&key.name.as_str()) {
            return true;
        }

        // (f) dynamic dispatch: conservative over-approximation
        if self.exposure(&key.name) != DynamicExposure::None {
            return true;
        }

        match &key.owner {
            None => self.free_call_names.contains(&key.name),
            Some(owner) => {
                // (a) call site keyed to exactly this (type, name)
                if self.call_index.contains_key(key) {
                    return true;
                }

                // (b) inherited override still reachable through an
                // ancestor-typed receiver
                for ancestor in self.ancestors(owner) {
                    if self
                        .call_index
                        .contains_key(&SymbolKey::method(ancestor, key.name.clone()))
                    {
                        return true;
                    }
                }

                // (c) call on any descendant type with the same name
                for descendant in self.descendants(owner) {
                    if self
                        .call_index
                        .contains_key(&SymbolKey::method(descendant, key.name.clone()))
                    {
                        return true;
                    }
                }

                // (d) interface method contract, checked through ancestor
                // interfaces
                if self.satisfies_interface_contract(owner, &key.name) {
                    return true;
                }

                false
            }
        }
    }

    fn satisfies_interface_contract(&self, type_name: &str, method: &str) -> bool {
        for ancestor in self.ancestors(type_name) {
            if let Some(info) = self.types.get(&ancestor) {
                if info.is_interface && info.declared.iter().any(|k| k.name == method) {
                    return true;
                }
            }
        }
        false
    }
}

/// Runs the use-graph queries over all analysis records
pub struct UsageResolver<'a> {
    graph: &'a UseGraph,
}

impl<'a> UsageResolver<'a> {
    pub fn new(graph: &'a UseGraph) -> Self {
        Self { graph }
    }

    /// Non-public symbols with no observed use. Public symbols are never
    /// flagged; cross-repository consumers are invisible here.
    pub fn unused_symbols(&self, analyses: &[FileAnalysis]) -> Vec<UnusedSymbol> {
        let mut unused = Vec::new();

        for analysis in analyses {
            for symbol in &analysis.symbols {
                if !symbol.visibility.is_removal_candidate() {
                    continue;
                }
                match symbol.kind {
                    SymbolKind::Variable => {
                        if !self.variable_read(analysis, &symbol.name, symbol.span.start_byte) {
                            unused.push(UnusedSymbol {
                                file: analysis.path.clone(),
                                decl: symbol.clone(),
                                exposure: self.graph.exposure(&symbol.name),
                            });
                        }
                    }
                    SymbolKind::Function | SymbolKind::Method => {
                        if !self.graph.is_used(&symbol.key()) {
                            debug!("Unused: {}", symbol.key());
                            unused.push(UnusedSymbol {
                                file: analysis.path.clone(),
                                decl: symbol.clone(),
                                exposure: self.graph.exposure(&symbol.name),
                            });
                        }
                    }
                }
            }
        }

        unused.sort_by(|a, b| {
            a.file
                .cmp(&b.file)
                .then(a.decl.span.start_line.cmp(&b.decl.span.start_line))
        });
        unused
    }

    /// Imports whose short name is never referenced in the importing file
    pub fn unused_imports(&self, analyses: &[FileAnalysis]) -> Vec<UnusedImport> {
        let mut unused = Vec::new();

        for analysis in analyses {
            for import in &analysis.imports {
                let name = &import.short_name;
                let referenced = analysis.calls.iter().any(|c| {
                    c.name == *name || c.receiver.as_deref() == Some(name.as_str())
                }) || analysis.types.iter().any(|t| {
                    t.parent.as_deref() == Some(name.as_str())
                        || t.interfaces.iter().any(|i| i == name)
                }) || analysis
                    .symbols
                    .iter()
                    .any(|s| s.body.contains(name.as_str()))
                    || self.graph.dynamic_name_hints.contains(name);

                if !referenced {
                    unused.push(UnusedImport {
                        file: analysis.path.clone(),
                        import: import.clone(),
                    });
                }
            }
        }

        unused
    }

    /// A variable counts as read if it appears outside its own declaration
    fn variable_read(&self, analysis: &FileAnalysis, name: &str, decl_byte: usize) -> bool {
        if self.graph.exposure(name) != DynamicExposure::None {
            return true;
        }
        let dollar = format!("${}", name);
        let arrow = format!("->{}", name);
        analysis.symbols.iter().any(|s| {
            s.span.start_byte != decl_byte && (s.body.contains(&dollar) || s.body.contains(&arrow))
        })
    }
}
