use super::{engine, open_all, settle, src};
use pretty_assertions::assert_eq;
use sable_engine::{DiagnosticKind, FilePhase, SymbolKind};

#[test]
fn find_type_then_rename_method() {
    let engine = engine();
    let paths = open_all(&engine, &[("A.java", "class Foo { void bar() {} }")]);

    let foo = engine.find_symbol("Foo");
    assert_eq!(foo.len(), 1);
    assert_eq!(foo[0].kind, SymbolKind::Type);
    assert_eq!(engine.find_symbol("bar").len(), 1);

    engine
        .edit(&paths[0], "class Foo { void baz() {} }")
        .expect("edit");
    settle(&engine);

    assert!(engine.find_symbol("bar").is_empty());
    let baz = engine.find_symbol("baz");
    assert_eq!(baz.len(), 1);
    assert_eq!(baz[0].kind, SymbolKind::Method);
    assert_eq!(engine.file_phase(&paths[0]), Some(FilePhase::Fresh));
}

#[test]
fn missing_dependency_still_indexes_the_file() {
    let engine = engine();
    let paths = open_all(&engine, &[("A.java", "class A { Missing m; }")]);

    assert_eq!(engine.find_symbol("A").len(), 1);
    let diagnostics = engine.diagnostics_for(&paths[0]);
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].kind, DiagnosticKind::UnresolvedSymbol);
}

#[test]
fn syntax_errors_are_reported_with_partial_symbols() {
    let engine = engine();
    let text = "class Broken {\n  void bar() { int x = ; }\n  void baz() {}\n}\n";
    let paths = open_all(&engine, &[("Broken.java", text)]);

    assert_eq!(engine.find_symbol("Broken").len(), 1);
    assert_eq!(engine.find_symbol("baz").len(), 1);
    assert!(engine
        .diagnostics_for(&paths[0])
        .iter()
        .any(|diagnostic| diagnostic.kind == DiagnosticKind::SyntaxError));
}

#[test]
fn queries_before_analysis_see_nothing() {
    let engine = engine();
    assert!(engine.find_symbol("Foo").is_empty());
    assert!(engine.diagnostics_for(src("Nope.java")).is_empty());
    assert_eq!(engine.file_phase(src("Nope.java")), None);
    assert!(!engine.is_indexing());
}

#[test]
fn only_java_sources_can_be_opened() {
    let engine = engine();
    assert!(engine.open(src("notes.txt"), "hello").is_err());
    assert!(engine.edit(src("Unknown.java"), "class X {}").is_err());
    assert!(!engine.remove(src("Unknown.java")));
}
