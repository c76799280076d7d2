//! Integration tests for duplicate detection
//!
//! Real source text in, scored matches out.

use codesweep::analysis::{Analyzer, FragmentKind, PhpAnalyzer, StylesheetAnalyzer};
use codesweep::dupes::{DuplicateDetector, Effort, RefactorKind};
use std::path::Path;

fn parse_php(name: &str, source: &str) -> codesweep::analysis::FileAnalysis {
    PhpAnalyzer
        .parse_file(Path::new(name), source)
        .expect("fixture should parse")
}

#[test]
fn test_renamed_variables_still_match() {
    // identical bodies except $a vs $b, same arity and return type
    let first = parse_php(
        "app/OrderTotal.php",
        r#"<?php
class OrderTotal {
    public function lineTotal($a): float {
        $sum = $a->price * $a->qty;
        return $sum;
    }
}
"#,
    );
    let second = parse_php(
        "app/InvoiceTotal.php",
        r#"<?php
class InvoiceTotal {
    public function lineTotal($b): float {
        $sum = $b->price * $b->qty;
        return $sum;
    }
}
"#,
    );

    let matches = DuplicateDetector::new().detect(&[first, second]);
    let method_matches: Vec<_> = matches
        .iter()
        .filter(|m| m.kind == FragmentKind::MethodBody)
        .collect();

    assert_eq!(method_matches.len(), 1);
    let group = method_matches[0];
    assert!(group.similarity >= 0.95);
    assert_eq!(group.effort, Effort::Low);
    assert_eq!(group.members.len(), 2);
}

#[test]
fn test_unrelated_methods_do_not_match() {
    let first = parse_php(
        "app/Mailer.php",
        r#"<?php
class Mailer {
    public function send($message) {
        $transport = $this->transport();
        $transport->deliver($message);
        return true;
    }
}
"#,
    );
    let second = parse_php(
        "app/Tax.php",
        r#"<?php
class Tax {
    public function rate($region, $category, $date): float {
        if ($region === 'EU') {
            return 0.21;
        }
        return 0.0;
    }
}
"#,
    );

    let matches = DuplicateDetector::new().detect(&[first, second]);
    assert!(matches
        .iter()
        .all(|m| m.kind != FragmentKind::MethodBody || m.members.len() < 2));
}

#[test]
fn test_style_rules_bucket_on_sorted_properties() {
    let first = StylesheetAnalyzer
        .parse_file(
            Path::new("assets/site.css"),
            ".btn { color: red; padding: 4px; }\n.other { margin: 0; }\n",
        )
        .unwrap();
    let second = StylesheetAnalyzer
        .parse_file(
            Path::new("assets/admin.css"),
            ".button { padding: 4px; color: red; }\n",
        )
        .unwrap();

    let matches = DuplicateDetector::new().detect(&[first, second]);
    let style_matches: Vec<_> = matches
        .iter()
        .filter(|m| m.kind == FragmentKind::StyleRule)
        .collect();

    assert_eq!(style_matches.len(), 1);
    assert_eq!(style_matches[0].similarity, 1.0);
    assert_eq!(style_matches[0].suggestion, RefactorKind::Consolidate);
}

#[test]
fn test_groups_sorted_by_priority() {
    // the three-way duplicate should outrank the pair
    let mut analyses = Vec::new();
    for name in ["A", "B", "C"] {
        analyses.push(parse_php(
            &format!("app/{}.php", name),
            r#"<?php
class Repeated {
    public function busy($x) {
        if ($x > 0) {
            $y = $x * 2;
            return $y + compute($x);
        }
        return 0;
    }
}
"#,
        ));
    }
    for name in ["D", "E"] {
        analyses.push(parse_php(
            &format!("app/{}.php", name),
            r#"<?php
class Simple {
    public function tiny($v) {
        return $v;
    }
}
"#,
        ));
    }

    let matches = DuplicateDetector::new().detect(&analyses);
    assert!(matches.len() >= 2);
    assert!(matches.windows(2).all(|w| w[0].priority >= w[1].priority));
    assert_eq!(matches[0].members.len(), 3);
}

#[test]
fn test_same_group_reported_once() {
    let first = parse_php(
        "app/X.php",
        r#"<?php
function dupA($n) { return $n + 1; }
"#,
    );
    let second = parse_php(
        "app/Y.php",
        r#"<?php
function dupB($n) { return $n + 1; }
"#,
    );

    let matches = DuplicateDetector::new().detect(&[first, second]);
    let method_matches: Vec<_> = matches
        .iter()
        .filter(|m| m.kind == FragmentKind::MethodBody)
        .collect();
    assert_eq!(method_matches.len(), 1);
}
