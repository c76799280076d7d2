//! Integration tests for the refactoring execution engine

use codesweep::analysis::{Span, SymbolDecl, SymbolKind, Visibility};
use codesweep::config::CleanupConfig;
use codesweep::execute::RefactorExecutor;
use codesweep::plan::{CleanupPlan, DeletionItem, RemovalItem};
use codesweep::usage::{DynamicExposure, UnusedSymbol};
use std::fs;
use std::path::{Path, PathBuf};

fn removal(file: &Path, name: &str, kind: SymbolKind, span: Span) -> RemovalItem {
    RemovalItem {
        unused: UnusedSymbol {
            file: file.to_path_buf(),
            decl: SymbolDecl {
                name: name.into(),
                owner: None,
                kind,
                visibility: Visibility::Private,
                params: Vec::new(),
                return_type: None,
                span,
                body: String::new(),
                has_doc: false,
            },
            exposure: DynamicExposure::None,
        },
    }
}

#[test]
fn test_fifteen_file_deletion_with_backups() {
    let dir = tempfile::tempdir().unwrap();
    let mut plan = CleanupPlan::default();
    let mut paths = Vec::new();

    for i in 0..15 {
        let path = dir.path().join(format!("legacy_{:02}.php", i));
        let contents = format!("<?php // legacy module {}\n", i);
        fs::write(&path, &contents).unwrap();
        plan.file_deletions.push(DeletionItem {
            path: path.clone(),
            byte_len: contents.len() as u64,
        });
        paths.push((path, contents));
    }

    let config = CleanupConfig::default();
    let mut executor = RefactorExecutor::new(&config, dir.path());
    let result = executor.execute(&plan);

    assert_eq!(result.files_deleted, 15);
    assert!(result.failures.is_empty());
    for (path, _) in &paths {
        assert!(!path.exists());
    }

    // one backup per deletion, each restorable to its original contents
    let backups = executor.backups().expect("backups enabled");
    assert_eq!(backups.records().len(), 15);
    assert_eq!(backups.restore_all().unwrap(), 15);
    for (path, contents) in &paths {
        assert_eq!(&fs::read_to_string(path).unwrap(), contents);
    }
}

#[test]
fn test_deletions_run_strictly_last() {
    let dir = tempfile::tempdir().unwrap();

    let method_source = "<?php\nfunction dead() { x(); }\n";
    let method_file = dir.path().join("a.php");
    fs::write(&method_file, method_source).unwrap();
    let start = method_source.find("function dead").unwrap();

    let doomed = dir.path().join("doomed.php");
    fs::write(&doomed, "<?php\n").unwrap();

    let mut config = CleanupConfig::default();
    config.create_backup = false;
    let mut plan = CleanupPlan::default();
    plan.unused_methods.push(removal(
        &method_file,
        "dead",
        SymbolKind::Method,
        Span::new(2, 2, start, start + 10),
    ));
    plan.file_deletions.push(DeletionItem {
        path: doomed.clone(),
        byte_len: 6,
    });

    let mut executor = RefactorExecutor::new(&config, dir.path());
    let result = executor.execute(&plan);

    let trace = &result.order_trace;
    assert_eq!(trace.last().map(String::as_str), Some("deletions"));
    let methods_pos = trace.iter().position(|s| s == "methods").unwrap();
    let deletions_pos = trace.iter().position(|s| s == "deletions").unwrap();
    assert!(methods_pos < deletions_pos);
    assert_eq!(result.files_deleted, 1);
    assert_eq!(result.methods_removed, 1);
}

#[test]
fn test_import_removal_edits_lines() {
    let dir = tempfile::tempdir().unwrap();
    let source = "<?php\nuse App\\Support\\Tax;\n\nclass Invoice {}\n";
    let file = dir.path().join("Invoice.php");
    fs::write(&file, source).unwrap();

    let mut config = CleanupConfig::default();
    config.create_backup = false;
    let mut plan = CleanupPlan::default();
    plan.unused_imports.push(codesweep::usage::UnusedImport {
        file: file.clone(),
        import: codesweep::analysis::ImportDecl {
            name: "App\\Support\\Tax".into(),
            short_name: "Tax".into(),
            span: Span::new(2, 2, 6, 27),
        },
    });

    let mut executor = RefactorExecutor::new(&config, dir.path());
    let result = executor.execute(&plan);

    assert_eq!(result.imports_removed, 1);
    let after = fs::read_to_string(&file).unwrap();
    assert!(!after.contains("use App"));
    assert!(after.contains("class Invoice"));
}

#[test]
fn test_protected_path_never_deleted() {
    let dir = tempfile::tempdir().unwrap();
    let config_dir = dir.path().join("config");
    fs::create_dir_all(&config_dir).unwrap();
    let file = config_dir.join("app.php");
    fs::write(&file, "<?php\n").unwrap();

    let mut config = CleanupConfig::default();
    config.create_backup = false;
    let mut plan = CleanupPlan::default();
    plan.file_deletions.push(DeletionItem {
        path: file.clone(),
        byte_len: 6,
    });

    let mut executor = RefactorExecutor::new(&config, dir.path());
    let result = executor.execute(&plan);

    assert_eq!(result.files_deleted, 0);
    assert_eq!(result.failures.len(), 1);
    assert!(file.exists());
}

#[test]
fn test_duplicate_group_rewritten_to_delegate() {
    use codesweep::analysis::{Fragment, FragmentKind};
    use codesweep::dupes::{DuplicateMatch, Effort, RefactorKind};

    let dir = tempfile::tempdir().unwrap();
    let short_src = "<?php\nclass A {\n    public function calc($x) { return $x * 2; }\n}\n";
    let long_src = "<?php\nclass B {\n    public function calc($x) { try { return $x * 2; } catch (\\Throwable $e) { throw $e; } }\n}\n";
    let short_file = dir.path().join("A.php");
    let long_file = dir.path().join("B.php");
    fs::write(&short_file, short_src).unwrap();
    fs::write(&long_file, long_src).unwrap();

    let fragment = |file: &PathBuf, src: &str| {
        let start = src.find("public function").unwrap();
        let end = src.rfind('}').unwrap() - 2;
        Fragment {
            file: file.clone(),
            kind: FragmentKind::MethodBody,
            name: "calc".into(),
            content: src[start..end].to_string(),
            byte_len: end - start,
            classes: Vec::new(),
            params: vec!["x".into()],
            return_type: None,
            span: Span::new(3, 3, start, end),
        }
    };

    let mut config = CleanupConfig::default();
    config.create_backup = false;
    let mut plan = CleanupPlan::default();
    plan.duplicate_methods.push(DuplicateMatch {
        members: vec![fragment(&short_file, short_src), fragment(&long_file, long_src)],
        kind: FragmentKind::MethodBody,
        similarity: 1.0,
        complexity: 2.0,
        priority: 2.0,
        effort: Effort::Low,
        suggestion: RefactorKind::ExtractMethod,
    });

    let mut executor = RefactorExecutor::new(&config, dir.path());
    let result = executor.execute(&plan);

    assert_eq!(result.duplicates_refactored, 1);
    // the documented variant is canonical; the other now delegates
    let rewritten = fs::read_to_string(&short_file).unwrap();
    assert!(rewritten.contains("return $this->calc($x);"));
    let canonical = fs::read_to_string(&long_file).unwrap();
    assert_eq!(canonical, long_src);
}
