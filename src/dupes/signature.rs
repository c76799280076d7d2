// Fragment normalization and exact-duplicate signatures.
//
// Two fragments that differ only in variable names, literals or whitespace
// must normalize to the same string and therefore hash to the same
// signature.

use crate::analysis::{Fragment, FragmentKind};
use regex::Regex;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::OnceLock;

/// Placeholder token for dynamic template expressions
const EXPR_TOKEN: &str = "\u{1}EXPR\u{1}";

fn regex(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("static regex"))
}

/// Stable exact-duplicate signature for a fragment
pub fn signature(fragment: &Fragment) -> u64 {
    let normalized = normalize(fragment);
    let mut hasher = DefaultHasher::new();
    fragment.kind.hash(&mut hasher);
    normalized.hash(&mut hasher);
    hasher.finish()
}

/// Kind-specific normalization used both for bucketing and for pairwise
/// text similarity
pub fn normalize(fragment: &Fragment) -> String {
    match fragment.kind {
        FragmentKind::MethodBody => normalize_code(&fragment.content),
        FragmentKind::StyleRule => normalize_style(&fragment.content),
        FragmentKind::TemplateBlock => normalize_template(&fragment.content),
    }
}

/// Code: strip comments, replace variable names and literals with
/// placeholders, collapse whitespace
pub fn normalize_code(content: &str) -> String {
    static LINE_COMMENT: OnceLock<Regex> = OnceLock::new();
    static BLOCK_COMMENT: OnceLock<Regex> = OnceLock::new();
    static VARIABLE: OnceLock<Regex> = OnceLock::new();
    static STRING_LIT: OnceLock<Regex> = OnceLock::new();
    static NUMBER_LIT: OnceLock<Regex> = OnceLock::new();
    static WS: OnceLock<Regex> = OnceLock::new();

    let mut text = regex(&BLOCK_COMMENT, r"(?s)/\*.*?\*/")
        .replace_all(content, "")
        .into_owned();
    text = regex(&LINE_COMMENT, r"(?m)//[^\n]*|#[^\n]*")
        .replace_all(&text, "")
        .into_owned();
    text = regex(&STRING_LIT, r#""[^"]*"|'[^']*'"#)
        .replace_all(&text, "LIT")
        .into_owned();
    text = regex(&VARIABLE, r"\$\w+")
        .replace_all(&text, "VAR")
        .into_owned();
    text = regex(&NUMBER_LIT, r"\b\d+(?:\.\d+)?\b")
        .replace_all(&text, "LIT")
        .into_owned();
    regex(&WS, r"\s+").replace_all(text.trim(), " ").into_owned()
}

/// Style rules: sorted, whitespace-normalized property list (selector
/// excluded, so renamed-but-identical rules bucket together)
pub fn normalize_style(content: &str) -> String {
    let body = match (content.find('{'), content.rfind('}')) {
        (Some(open), Some(close)) if close > open => &content[open + 1..close],
        _ => content,
    };

    let mut props: Vec<String> = body
        .split(';')
        .map(|p| {
            p.split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
                .to_lowercase()
        })
        .filter(|p| !p.is_empty())
        .collect();
    props.sort();
    props.join(";")
}

/// Templates: whitespace collapsed, dynamic expressions replaced by a fixed
/// placeholder token
pub fn normalize_template(content: &str) -> String {
    static MUSTACHE: OnceLock<Regex> = OnceLock::new();
    static PHP_TAG: OnceLock<Regex> = OnceLock::new();
    static TWIG_TAG: OnceLock<Regex> = OnceLock::new();
    static WS: OnceLock<Regex> = OnceLock::new();

    let mut text = regex(&MUSTACHE, r"\{\{[^}]*\}\}")
        .replace_all(content, EXPR_TOKEN)
        .into_owned();
    text = regex(&PHP_TAG, r"(?s)<\?(?:php)?.*?\?>")
        .replace_all(&text, EXPR_TOKEN)
        .into_owned();
    text = regex(&TWIG_TAG, r"\{%[^%]*%\}")
        .replace_all(&text, EXPR_TOKEN)
        .into_owned();
    regex(&WS, r"\s+").replace_all(text.trim(), " ").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Span;
    use std::path::PathBuf;

    fn method_fragment(content: &str) -> Fragment {
        Fragment {
            file: PathBuf::from("a.php"),
            kind: FragmentKind::MethodBody,
            name: "m".into(),
            content: content.into(),
            byte_len: content.len(),
            classes: Vec::new(),
            params: Vec::new(),
            return_type: None,
            span: Span::new(1, 1, 0, content.len()),
        }
    }

    #[test]
    fn test_signature_idempotent() {
        let frag = method_fragment("function m($a) { return $a + 1; }");
        assert_eq!(signature(&frag), signature(&frag));
    }

    #[test]
    fn test_variable_rename_hashes_identically() {
        let a = method_fragment("function m($a) { return $a + 1; }");
        let b = method_fragment("function m($b)  {\n  return $b + 1;\n}");
        assert_eq!(signature(&a), signature(&b));
    }

    #[test]
    fn test_literal_and_comment_invariance() {
        let a = method_fragment("function m() { /* doc */ return \"x\"; }");
        let b = method_fragment("function m() { return 'y'; }");
        assert_eq!(signature(&a), signature(&b));
    }

    #[test]
    fn test_different_structure_differs() {
        let a = method_fragment("function m($a) { return $a + 1; }");
        let b = method_fragment("function m($a) { return $a * 2; }");
        assert_ne!(signature(&a), signature(&b));
    }

    #[test]
    fn test_style_property_order_invariant() {
        assert_eq!(
            normalize_style(".a { color: red; padding: 4px; }"),
            normalize_style(".b {\n  padding:  4px;\n  color: red;\n}")
        );
    }

    #[test]
    fn test_template_expression_placeholder() {
        assert_eq!(
            normalize_template("<h1>{{ title }}</h1>"),
            normalize_template("<h1>{{ other.name }}</h1>")
        );
        assert_ne!(
            normalize_template("<h1>{{ title }}</h1>"),
            normalize_template("<h2>{{ title }}</h2>")
        );
    }
}
