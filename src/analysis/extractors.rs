// Built-in regex-based analysis collaborators.
//
// These are deliberately shallow: a real deployment can swap in proper
// parsers behind the `Analyzer` trait. The core only sees `FileAnalysis`.

use super::{
    Analyzer, CallSite, DynamicCall, DynamicPattern, FileAnalysis, Fragment, FragmentKind,
    ImportDecl, Span, SymbolDecl, SymbolKind, TypeDecl, Visibility,
};
use crate::discovery::SourceKind;
use crate::error::Result;
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

/// Pick the built-in collaborator for a source kind
pub fn analyzer_for(kind: SourceKind) -> &'static dyn Analyzer {
    static PHP: PhpAnalyzer = PhpAnalyzer;
    static SCRIPT: ScriptAnalyzer = ScriptAnalyzer;
    static STYLE: StylesheetAnalyzer = StylesheetAnalyzer;
    static TEMPLATE: TemplateAnalyzer = TemplateAnalyzer;

    match kind {
        SourceKind::Php => &PHP,
        SourceKind::JavaScript => &SCRIPT,
        SourceKind::Stylesheet => &STYLE,
        SourceKind::Template => &TEMPLATE,
    }
}

fn regex(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("static regex"))
}

/// Find the end byte of a brace-delimited block starting at `open_brace`.
/// Returns `None` when braces never balance (malformed source).
pub(crate) fn match_braces(contents: &str, open_brace: usize) -> Option<usize> {
    let bytes = contents.as_bytes();
    let mut depth = 0usize;
    let mut in_string: Option<u8> = None;

    for (i, &b) in bytes.iter().enumerate().skip(open_brace) {
        if let Some(quote) = in_string {
            if b == quote && (i == 0 || bytes[i - 1] != b'\\') {
                in_string = None;
            }
            continue;
        }
        match b {
            b'"' | b'\'' => in_string = Some(b),
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }
    None
}

fn line_of(contents: &str, byte: usize) -> usize {
    contents[..byte.min(contents.len())]
        .bytes()
        .filter(|&b| b == b'\n')
        .count()
        + 1
}

fn has_doc_before(contents: &str, decl_start: usize) -> bool {
    contents[..decl_start].trim_end().ends_with("*/")
}

/// PHP collaborator: classes, methods, free functions, imports, call sites,
/// dynamic-dispatch patterns
pub struct PhpAnalyzer;

impl Analyzer for PhpAnalyzer {
    fn handles(&self, kind: SourceKind) -> bool {
        kind == SourceKind::Php
    }

    fn parse_file(&self, path: &Path, contents: &str) -> Result<FileAnalysis> {
        static CLASS_RE: OnceLock<Regex> = OnceLock::new();
        static FN_RE: OnceLock<Regex> = OnceLock::new();
        static USE_RE: OnceLock<Regex> = OnceLock::new();
        static THIS_CALL_RE: OnceLock<Regex> = OnceLock::new();
        static STATIC_CALL_RE: OnceLock<Regex> = OnceLock::new();
        static FREE_CALL_RE: OnceLock<Regex> = OnceLock::new();
        static VAR_RE: OnceLock<Regex> = OnceLock::new();

        let class_re = regex(
            &CLASS_RE,
            r"(?m)^\s*(?:abstract\s+|final\s+)?(class|interface|trait)\s+(\w+)(?:\s+extends\s+([\w\\]+))?(?:\s+implements\s+([\w\\,\s]+))?",
        );
        let fn_re = regex(
            &FN_RE,
            r"(?m)^(\s*)(?:(public|protected|private)\s+)?(?:static\s+)?function\s+(\w+)\s*\(([^)]*)\)(?:\s*:\s*\??([\w\\]+))?",
        );
        let use_re = regex(&USE_RE, r"(?m)^use\s+([\w\\]+)(?:\s+as\s+(\w+))?;");
        let this_call_re = regex(&THIS_CALL_RE, r"\$this->(\w+)\s*\(");
        let static_call_re = regex(&STATIC_CALL_RE, r"(\w+)::(\w+)\s*\(");
        let free_call_re = regex(&FREE_CALL_RE, r"(?:^|[^\w$>:])(\w+)\s*\(");
        let var_re = regex(&VAR_RE, r"(?m)^\s{4,}(?:private|protected)\s+\$(\w+)\s*[=;]");

        let mut analysis = FileAnalysis::empty(path.to_path_buf(), SourceKind::Php);
        analysis.byte_len = contents.len();

        // Pass 1: types with their extents, so method owners can be assigned
        let mut type_extents: Vec<(String, usize, usize)> = Vec::new();
        for cap in class_re.captures_iter(contents) {
            let whole = cap.get(0).unwrap();
            let name = cap[2].to_string();
            let parent = cap.get(3).map(|m| short_type_name(m.as_str()));
            let interfaces = cap
                .get(4)
                .map(|m| {
                    m.as_str()
                        .split(',')
                        .map(|s| short_type_name(s.trim()))
                        .collect()
                })
                .unwrap_or_default();

            let body_end = contents[whole.end()..]
                .find('{')
                .and_then(|rel| match_braces(contents, whole.end() + rel))
                .unwrap_or(contents.len());

            type_extents.push((name.clone(), whole.start(), body_end));
            analysis.types.push(TypeDecl {
                name,
                parent,
                interfaces,
                is_interface: &cap[1] == "interface",
            });
        }

        let owner_of = |byte: usize| -> Option<String> {
            type_extents
                .iter()
                .filter(|(_, s, e)| *s <= byte && byte < *e)
                .min_by_key(|(_, s, e)| e - s)
                .map(|(name, _, _)| name.clone())
        };

        // Pass 2: functions and methods with brace-matched bodies
        for cap in fn_re.captures_iter(contents) {
            let whole = cap.get(0).unwrap();
            let name = cap[3].to_string();
            let owner = owner_of(whole.start());
            let visibility = cap
                .get(2)
                .map(|m| Visibility::from_modifier(m.as_str()))
                .unwrap_or_default();

            let body_end = contents[whole.end()..]
                .find(|c| c == '{' || c == ';')
                .map(|rel| whole.end() + rel);
            let end_byte = match body_end {
                Some(pos) if contents.as_bytes()[pos] == b'{' => {
                    match match_braces(contents, pos) {
                        Some(end) => end,
                        // Unbalanced braces: record nothing removable for
                        // this declaration
                        None => continue,
                    }
                }
                Some(pos) => pos + 1, // abstract/interface signature
                None => continue,
            };

            let params: Vec<String> = split_params(&cap[4]);
            let return_type = cap.get(5).map(|m| m.as_str().to_string());
            let body = contents[whole.start()..end_byte].to_string();
            let span = Span::new(
                line_of(contents, whole.start()),
                line_of(contents, end_byte),
                whole.start(),
                end_byte,
            );

            analysis.fragments.push(Fragment {
                file: path.to_path_buf(),
                kind: FragmentKind::MethodBody,
                name: name.clone(),
                content: body.clone(),
                byte_len: body.len(),
                classes: Vec::new(),
                params: params.clone(),
                return_type: return_type.clone(),
                span,
            });

            analysis.symbols.push(SymbolDecl {
                name,
                kind: if owner.is_some() {
                    SymbolKind::Method
                } else {
                    SymbolKind::Function
                },
                owner,
                visibility,
                params,
                return_type,
                span,
                body,
                has_doc: has_doc_before(contents, whole.start()),
            });
        }

        // Class properties as variable symbols. The span runs through the
        // terminating `;` so removal takes any initializer with it.
        for cap in var_re.captures_iter(contents) {
            let whole = cap.get(0).unwrap();
            let end = if contents[..whole.end()].ends_with(';') {
                whole.end()
            } else {
                contents[whole.end()..]
                    .find(';')
                    .map(|rel| whole.end() + rel + 1)
                    .unwrap_or(whole.end())
            };
            let line = line_of(contents, whole.start());
            analysis.symbols.push(SymbolDecl {
                name: cap[1].to_string(),
                owner: owner_of(whole.start()),
                kind: SymbolKind::Variable,
                visibility: Visibility::Private,
                params: Vec::new(),
                return_type: None,
                span: Span::new(line, line_of(contents, end), whole.start(), end),
                body: contents[whole.start()..end].to_string(),
                has_doc: false,
            });
        }

        for cap in use_re.captures_iter(contents) {
            let whole = cap.get(0).unwrap();
            let name = cap[1].to_string();
            let short_name = cap
                .get(2)
                .map(|m| m.as_str().to_string())
                .unwrap_or_else(|| short_type_name(&name));
            let line = line_of(contents, whole.start());
            analysis.imports.push(ImportDecl {
                name,
                short_name,
                span: Span::new(line, line, whole.start(), whole.end()),
            });
        }

        for cap in this_call_re.captures_iter(contents) {
            let start = cap.get(0).unwrap().start();
            analysis.calls.push(CallSite {
                receiver: owner_of(start),
                name: cap[1].to_string(),
                line: line_of(contents, start),
            });
        }
        for cap in static_call_re.captures_iter(contents) {
            let start = cap.get(0).unwrap().start();
            analysis.calls.push(CallSite {
                receiver: Some(cap[1].to_string()),
                name: cap[2].to_string(),
                line: line_of(contents, start),
            });
        }
        for cap in free_call_re.captures_iter(contents) {
            let start = cap.get(1).unwrap().start();
            let name = cap[1].to_string();
            if matches!(name.as_str(), "if" | "while" | "for" | "foreach" | "switch" | "function" | "return" | "echo" | "array" | "match" | "catch") {
                continue;
            }
            // a declaration is not a call site
            if contents[..start].trim_end().ends_with("function") {
                continue;
            }
            analysis.calls.push(CallSite {
                receiver: None,
                name,
                line: line_of(contents, start),
            });
        }

        scan_dynamic_php(contents, &mut analysis);

        Ok(analysis)
    }
}

fn split_params(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect()
}

fn short_type_name(fqn: &str) -> String {
    fqn.rsplit('\\').next().unwrap_or(fqn).to_string()
}

fn scan_dynamic_php(contents: &str, analysis: &mut FileAnalysis) {
    static COMPUTED_RE: OnceLock<Regex> = OnceLock::new();
    static REFLECT_RE: OnceLock<Regex> = OnceLock::new();
    static EVAL_RE: OnceLock<Regex> = OnceLock::new();
    static VARVAR_RE: OnceLock<Regex> = OnceLock::new();

    let computed = regex(&COMPUTED_RE, r"\$\w+->\$(\w+)\s*\(");
    let reflect = regex(
        &REFLECT_RE,
        r#"(?:call_user_func(?:_array)?|ReflectionMethod|ReflectionClass)\s*\(\s*(?:\[[^,\]]+,\s*)?['"]?(\w+)?"#,
    );
    let eval = regex(&EVAL_RE, r"\beval\s*\(");
    let varvar = regex(&VARVAR_RE, r"\$\$(\w+)");

    for cap in computed.captures_iter(contents) {
        analysis.dynamic_calls.push(DynamicCall {
            pattern: DynamicPattern::ComputedMember,
            name_hint: None,
            line: line_of(contents, cap.get(0).unwrap().start()),
        });
    }
    for cap in reflect.captures_iter(contents) {
        analysis.dynamic_calls.push(DynamicCall {
            pattern: DynamicPattern::ReflectiveInvocation,
            name_hint: cap.get(1).map(|m| m.as_str().to_string()),
            line: line_of(contents, cap.get(0).unwrap().start()),
        });
    }
    for m in eval.find_iter(contents) {
        analysis.dynamic_calls.push(DynamicCall {
            pattern: DynamicPattern::Eval,
            name_hint: None,
            line: line_of(contents, m.start()),
        });
    }
    for cap in varvar.captures_iter(contents) {
        analysis.dynamic_calls.push(DynamicCall {
            pattern: DynamicPattern::ComputedProperty,
            name_hint: Some(cap[1].to_string()),
            line: line_of(contents, cap.get(0).unwrap().start()),
        });
    }
}

/// JavaScript collaborator: functions, class methods, imports, call sites,
/// dynamic patterns
pub struct ScriptAnalyzer;

impl Analyzer for ScriptAnalyzer {
    fn handles(&self, kind: SourceKind) -> bool {
        kind == SourceKind::JavaScript
    }

    fn parse_file(&self, path: &Path, contents: &str) -> Result<FileAnalysis> {
        static FN_RE: OnceLock<Regex> = OnceLock::new();
        static CLASS_RE: OnceLock<Regex> = OnceLock::new();
        static IMPORT_RE: OnceLock<Regex> = OnceLock::new();
        static CALL_RE: OnceLock<Regex> = OnceLock::new();
        static COMPUTED_RE: OnceLock<Regex> = OnceLock::new();
        static EVAL_RE: OnceLock<Regex> = OnceLock::new();

        let fn_re = regex(&FN_RE, r"(?m)^\s*(?:export\s+)?function\s+(\w+)\s*\(([^)]*)\)");
        let class_re = regex(&CLASS_RE, r"(?m)^\s*(?:export\s+)?class\s+(\w+)(?:\s+extends\s+(\w+))?");
        let import_re = regex(
            &IMPORT_RE,
            r#"(?m)^import\s+(?:\{([^}]+)\}|(\w+))\s+from\s+['"]([^'"]+)['"]"#,
        );
        let call_re = regex(&CALL_RE, r"(?m)(?:^|[^\w.])(\w+)\s*\(");
        let computed_re = regex(&COMPUTED_RE, r"\w+\[[^\]]+\]\s*\(");
        let eval_re = regex(&EVAL_RE, r"\b(?:eval|Function)\s*\(");

        let mut analysis = FileAnalysis::empty(path.to_path_buf(), SourceKind::JavaScript);
        analysis.byte_len = contents.len();

        for cap in class_re.captures_iter(contents) {
            analysis.types.push(TypeDecl {
                name: cap[1].to_string(),
                parent: cap.get(2).map(|m| m.as_str().to_string()),
                interfaces: Vec::new(),
                is_interface: false,
            });
        }

        for cap in fn_re.captures_iter(contents) {
            let whole = cap.get(0).unwrap();
            let Some(open) = contents[whole.end()..].find('{') else {
                continue;
            };
            let Some(end_byte) = match_braces(contents, whole.end() + open) else {
                continue;
            };
            let body = contents[whole.start()..end_byte].to_string();
            let span = Span::new(
                line_of(contents, whole.start()),
                line_of(contents, end_byte),
                whole.start(),
                end_byte,
            );
            let params = split_params(&cap[2]);
            let exported = whole.as_str().contains("export");

            analysis.fragments.push(Fragment {
                file: path.to_path_buf(),
                kind: FragmentKind::MethodBody,
                name: cap[1].to_string(),
                content: body.clone(),
                byte_len: body.len(),
                classes: Vec::new(),
                params: params.clone(),
                return_type: None,
                span,
            });

            analysis.symbols.push(SymbolDecl {
                name: cap[1].to_string(),
                owner: None,
                kind: SymbolKind::Function,
                visibility: if exported {
                    Visibility::Public
                } else {
                    Visibility::Private
                },
                params,
                return_type: None,
                span,
                body,
                has_doc: has_doc_before(contents, whole.start()),
            });
        }

        for cap in import_re.captures_iter(contents) {
            let whole = cap.get(0).unwrap();
            let line = line_of(contents, whole.start());
            let source = cap[3].to_string();
            let names: Vec<String> = match (cap.get(1), cap.get(2)) {
                (Some(list), _) => list
                    .as_str()
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .collect(),
                (None, Some(default)) => vec![default.as_str().to_string()],
                _ => Vec::new(),
            };
            for short_name in names {
                analysis.imports.push(ImportDecl {
                    name: source.clone(),
                    short_name,
                    span: Span::new(line, line, whole.start(), whole.end()),
                });
            }
        }

        for cap in call_re.captures_iter(contents) {
            let start = cap.get(1).unwrap().start();
            let name = cap[1].to_string();
            if matches!(name.as_str(), "if" | "while" | "for" | "switch" | "function" | "return" | "catch") {
                continue;
            }
            // a declaration is not a call site
            if contents[..start].trim_end().ends_with("function") {
                continue;
            }
            analysis.calls.push(CallSite {
                receiver: None,
                name,
                line: line_of(contents, start),
            });
        }

        for m in computed_re.find_iter(contents) {
            analysis.dynamic_calls.push(DynamicCall {
                pattern: DynamicPattern::ComputedMember,
                name_hint: None,
                line: line_of(contents, m.start()),
            });
        }
        for m in eval_re.find_iter(contents) {
            analysis.dynamic_calls.push(DynamicCall {
                pattern: DynamicPattern::Eval,
                name_hint: None,
                line: line_of(contents, m.start()),
            });
        }

        Ok(analysis)
    }
}

/// Stylesheet collaborator: one fragment per rule block
pub struct StylesheetAnalyzer;

impl Analyzer for StylesheetAnalyzer {
    fn handles(&self, kind: SourceKind) -> bool {
        kind == SourceKind::Stylesheet
    }

    fn parse_file(&self, path: &Path, contents: &str) -> Result<FileAnalysis> {
        static CLASS_RE: OnceLock<Regex> = OnceLock::new();
        let class_re = regex(&CLASS_RE, r"\.([\w-]+)");

        let mut analysis = FileAnalysis::empty(path.to_path_buf(), SourceKind::Stylesheet);
        analysis.byte_len = contents.len();

        let mut pos = 0usize;
        while let Some(rel) = contents[pos..].find('{') {
            let open = pos + rel;
            // Leading '}' remnants come from closed @media wrappers
            let selector = contents[pos..open]
                .trim()
                .trim_start_matches('}')
                .trim()
                .to_string();
            let Some(end) = match_braces(contents, open) else {
                break;
            };
            // Skip at-rule wrappers, descend into their body instead
            if selector.starts_with('@') && !selector.starts_with("@media") {
                pos = end;
                continue;
            }
            if selector.starts_with("@media") {
                pos = open + 1;
                continue;
            }

            let body = contents[open + 1..end - 1].trim().to_string();
            let classes: Vec<String> = class_re
                .captures_iter(&selector)
                .map(|c| c[1].to_string())
                .collect();
            let rule = format!("{} {{ {} }}", selector, body);
            let span = Span::new(
                line_of(contents, pos),
                line_of(contents, end),
                pos,
                end,
            );
            analysis.fragments.push(Fragment {
                file: path.to_path_buf(),
                kind: FragmentKind::StyleRule,
                name: selector,
                byte_len: rule.len(),
                content: rule,
                classes,
                params: Vec::new(),
                return_type: None,
                span,
            });
            pos = end;
        }

        Ok(analysis)
    }
}

/// Template collaborator: contiguous markup chunks become fragments
pub struct TemplateAnalyzer;

impl Analyzer for TemplateAnalyzer {
    fn handles(&self, kind: SourceKind) -> bool {
        kind == SourceKind::Template
    }

    fn parse_file(&self, path: &Path, contents: &str) -> Result<FileAnalysis> {
        static CLASS_ATTR_RE: OnceLock<Regex> = OnceLock::new();
        let class_attr_re = regex(&CLASS_ATTR_RE, r#"class\s*=\s*["']([^"']+)["']"#);

        let mut analysis = FileAnalysis::empty(path.to_path_buf(), SourceKind::Template);
        analysis.byte_len = contents.len();

        // Chunk on blank lines; each chunk of markup is one comparable block
        let mut start_line = 1usize;
        let mut byte = 0usize;
        for chunk in contents.split("\n\n") {
            let trimmed = chunk.trim();
            let lines = chunk.lines().count().max(1);
            if trimmed.len() >= 40 && trimmed.contains('<') {
                let classes: Vec<String> = class_attr_re
                    .captures_iter(trimmed)
                    .flat_map(|c| {
                        c[1].split_whitespace()
                            .map(|s| s.to_string())
                            .collect::<Vec<_>>()
                    })
                    .collect();
                let name = trimmed
                    .lines()
                    .next()
                    .unwrap_or("")
                    .chars()
                    .take(48)
                    .collect::<String>();
                analysis.fragments.push(Fragment {
                    file: path.to_path_buf(),
                    kind: FragmentKind::TemplateBlock,
                    name,
                    content: trimmed.to_string(),
                    byte_len: trimmed.len(),
                    classes,
                    params: Vec::new(),
                    return_type: None,
                    span: Span::new(
                        start_line,
                        start_line + lines - 1,
                        byte,
                        byte + chunk.len(),
                    ),
                });
            }
            start_line += lines + 1;
            byte += chunk.len() + 2;
        }

        Ok(analysis)
    }
}
