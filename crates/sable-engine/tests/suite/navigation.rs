use super::{engine, offset_of, open_all};
use pretty_assertions::assert_eq;
use sable_engine::{SymbolKind, TextSize};

const A: &str = "package p;
class A extends Base {
    B field;
    void run() {
        helper();
        inherited();
        new C().ping();
    }
    void helper() {}
}
";

fn fqns(symbols: &[sable_engine::Symbol]) -> Vec<String> {
    symbols.iter().map(|symbol| symbol.fqn.to_string()).collect()
}

fn project() -> (sable_engine::Engine, std::path::PathBuf) {
    let engine = engine();
    let paths = open_all(
        &engine,
        &[
            ("A.java", A),
            ("B.java", "package p;\nclass B {}\n"),
            ("Base.java", "package p;\nclass Base { void inherited() {} }\n"),
            ("C.java", "package p;\nclass C { void ping() {} }\n"),
        ],
    );
    let a = paths[0].clone();
    (engine, a)
}

#[test]
fn declarations_resolve_to_themselves() {
    let (engine, a) = project();
    let found = engine.go_to_declaration(&a, offset_of(A, "run"));
    assert_eq!(fqns(&found), vec!["p.A.run"]);
    assert_eq!(found[0].kind, SymbolKind::Method);
}

#[test]
fn type_references_resolve_to_the_type() {
    let (engine, a) = project();
    let found = engine.go_to_declaration(&a, offset_of(A, "B field"));
    assert_eq!(fqns(&found), vec!["p.B"]);
    assert!(found[0].path.ends_with("B.java"));
}

#[test]
fn calls_resolve_through_the_enclosing_hierarchy() {
    let (engine, a) = project();

    let local = engine.go_to_declaration(&a, offset_of(A, "helper();"));
    assert_eq!(fqns(&local), vec!["p.A.helper"]);

    let inherited = engine.go_to_declaration(&a, offset_of(A, "inherited();"));
    assert_eq!(fqns(&inherited), vec!["p.Base.inherited"]);

    // No `ping` on A or Base: fall back to any method of that name.
    let elsewhere = engine.go_to_declaration(&a, offset_of(A, "ping"));
    assert_eq!(fqns(&elsewhere), vec!["p.C.ping"]);
}

#[test]
fn keywords_resolve_to_nothing() {
    let (engine, a) = project();
    assert!(engine.go_to_declaration(&a, TextSize::from(0)).is_empty());
}

#[test]
fn search_usages_and_hierarchy() {
    let (engine, a) = project();

    let results = engine.search_symbols("base", 10);
    assert_eq!(results[0].symbol.fqn, "p.Base");

    let usages = engine.usages("p.B");
    assert_eq!(usages.len(), 1);
    assert_eq!(usages[0].path, a);

    assert_eq!(engine.subtypes("p.Base"), vec!["p.A"]);

    // The search index follows edits.
    engine
        .edit(&a, "package p;\nclass Renamed {}\n")
        .expect("edit");
    super::settle(&engine);
    assert!(engine
        .search_symbols("renamed", 10)
        .iter()
        .any(|result| result.symbol.fqn == "p.Renamed"));
    assert!(engine.subtypes("p.Base").is_empty());
}
