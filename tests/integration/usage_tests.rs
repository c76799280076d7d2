//! Integration tests for the usage resolution engine
//!
//! Cross-file scenarios driven through the real PHP analyzer.

use codesweep::analysis::{Analyzer, PhpAnalyzer, ScriptAnalyzer, SymbolKey};
use codesweep::usage::{DynamicExposure, UsageResolver, UseGraph};
use std::path::Path;

fn parse(name: &str, source: &str) -> codesweep::analysis::FileAnalysis {
    PhpAnalyzer
        .parse_file(Path::new(name), source)
        .expect("fixture should parse")
}

#[test]
fn test_inherited_call_marks_base_method_used() {
    // private foo on A, only ever called from inside B extends A
    let base = parse(
        "app/A.php",
        r#"<?php
class A {
    protected function foo() {
        return 1;
    }
}
"#,
    );
    let child = parse(
        "app/B.php",
        r#"<?php
class B extends A {
    public function bar() {
        return $this->foo();
    }
}
"#,
    );

    let graph = UseGraph::build(&[base, child]);
    assert!(graph.is_used(&SymbolKey::method("A", "foo")));
}

#[test]
fn test_interface_contract_keeps_implementation() {
    let iface = parse(
        "app/Renderable.php",
        r#"<?php
interface Renderable {
    public function render();
}
"#,
    );
    let class = parse(
        "app/Page.php",
        r#"<?php
class Page implements Renderable {
    public function render() {
        return '<html>';
    }
}
"#,
    );

    let graph = UseGraph::build(&[iface, class]);
    assert!(graph.is_used(&SymbolKey::method("Page", "render")));
}

#[test]
fn test_unused_private_method_flagged_across_files() {
    let cart = parse(
        "app/Cart.php",
        r#"<?php
class Cart {
    public function total() {
        return $this->sum();
    }

    private function sum() {
        return 10;
    }

    private function legacyDiscount() {
        return 0;
    }
}
"#,
    );
    let caller = parse(
        "app/Checkout.php",
        r#"<?php
class Checkout {
    public function handle(Cart $cart) {
        return $cart->total();
    }
}
"#,
    );

    let graph = UseGraph::build(&[cart.clone(), caller.clone()]);
    let resolver = UsageResolver::new(&graph);
    let unused = resolver.unused_symbols(&[cart, caller]);

    let names: Vec<&str> = unused.iter().map(|u| u.decl.name.as_str()).collect();
    assert!(names.contains(&"legacyDiscount"));
    assert!(!names.contains(&"sum"));
    assert!(!names.contains(&"total"));
}

#[test]
fn test_dead_script_function_flagged() {
    // the declaration itself must not count as a call site
    let app = ScriptAnalyzer
        .parse_file(
            Path::new("resources/app.js"),
            "export function render(el) {\n  fmt(el);\n}\n\nfunction neverCalled(x) {\n  return x + 1;\n}\n",
        )
        .expect("fixture should parse");

    let graph = UseGraph::build(&[app.clone()]);
    let resolver = UsageResolver::new(&graph);
    let unused = resolver.unused_symbols(&[app]);

    let names: Vec<&str> = unused.iter().map(|u| u.decl.name.as_str()).collect();
    assert_eq!(names, vec!["neverCalled"]);
}

#[test]
fn test_dynamic_pattern_anywhere_suppresses_findings() {
    let cart = parse(
        "app/Cart.php",
        r#"<?php
class Cart {
    private function legacyDiscount() {
        return 0;
    }
}
"#,
    );
    let dispatcher = parse(
        "app/Dispatcher.php",
        r#"<?php
class Dispatcher {
    public function call($target, $method) {
        return $target->$method();
    }
}
"#,
    );

    let graph = UseGraph::build(&[cart.clone(), dispatcher.clone()]);
    assert!(graph.has_dynamic_patterns());
    assert_eq!(graph.exposure("legacyDiscount"), DynamicExposure::Global);

    let resolver = UsageResolver::new(&graph);
    assert!(resolver.unused_symbols(&[cart, dispatcher]).is_empty());
}

#[test]
fn test_lifecycle_methods_never_flagged() {
    let model = parse(
        "app/Model.php",
        r#"<?php
class Model {
    private function __construct() {
    }

    private function __wakeup() {
    }
}
"#,
    );

    let graph = UseGraph::build(&[model.clone()]);
    let resolver = UsageResolver::new(&graph);
    assert!(resolver.unused_symbols(&[model]).is_empty());
}

#[test]
fn test_unused_import_found_and_used_import_kept() {
    let file = parse(
        "app/Invoice.php",
        r#"<?php
use App\Support\Money;
use App\Support\Tax;

class Invoice {
    public function total() {
        return Money::of(100);
    }
}
"#,
    );

    let graph = UseGraph::build(&[file.clone()]);
    let resolver = UsageResolver::new(&graph);
    let unused = resolver.unused_imports(&[file]);

    assert_eq!(unused.len(), 1);
    assert_eq!(unused[0].import.short_name, "Tax");
}
