use super::{analyze, index_file, path};
use pretty_assertions::assert_eq;
use sable_core::Fingerprint;
use sable_index::SymbolIndex;

#[test]
fn upsert_replaces_every_symbol_of_a_file() {
    let index = SymbolIndex::new();
    let file = index_file(&index, "A.java", "class A { void one() {} }");
    assert_eq!(index.snapshot().query("one").len(), 1);

    let text = "class A { void two() {} }";
    let outcome = index.upsert(&file, Fingerprint::from_bytes(text), analyze(&index, &file, text));

    let snapshot = index.snapshot();
    assert!(snapshot.query("one").is_empty());
    assert_eq!(snapshot.query("two").len(), 1);
    assert_eq!(snapshot.symbol_count(), 2);
    assert!(outcome.api_changed);
    assert!(outcome.previous.is_some());
    assert!(outcome.added_type_names.is_empty());
}

#[test]
fn identical_upsert_publishes_nothing() {
    let index = SymbolIndex::new();
    let text = "package p; class A {}";
    let file = index_file(&index, "A.java", text);
    let before = index.generation();

    let outcome = index.upsert(&file, Fingerprint::from_bytes(text), analyze(&index, &file, text));
    assert!(outcome.unchanged);
    assert!(!outcome.api_changed);
    assert_eq!(outcome.generation, before);
    assert_eq!(index.generation(), before);
}

#[test]
fn body_edits_keep_the_api_stable() {
    let index = SymbolIndex::new();
    let file = index_file(&index, "A.java", "class A { int f() { return 1; } }");

    let text = "class A { int f() { return 2; } }";
    let outcome = index.upsert(&file, Fingerprint::from_bytes(text), analyze(&index, &file, text));
    assert!(!outcome.unchanged);
    assert!(!outcome.api_changed);
}

#[test]
fn first_upsert_reports_new_types_and_packages() {
    let index = SymbolIndex::new();
    let file = path("Foo.java");
    let text = "package com.acme; public class Foo { static class Inner {} }";
    let outcome = index.upsert(&file, Fingerprint::from_bytes(text), analyze(&index, &file, text));

    assert!(outcome.api_changed);
    assert_eq!(outcome.previous, None);
    let names: Vec<_> = outcome.added_type_names.iter().map(|n| n.as_str()).collect();
    assert_eq!(names, vec!["Foo", "Inner"]);
    let packages: Vec<_> = outcome.added_packages.iter().map(|n| n.as_str()).collect();
    assert_eq!(packages, vec!["com.acme"]);

    let other = index_file(&index, "Bar.java", "package com.acme; class Bar {}");
    let snapshot = index.snapshot();
    assert_eq!(snapshot.types_in_package("com.acme").len(), 2);
    assert!(snapshot.file(&other).is_some());
}

#[test]
fn remove_drops_symbols_and_relations() {
    let index = SymbolIndex::new();
    let base = index_file(&index, "Base.java", "public class Base {}");
    index_file(&index, "Sub.java", "class Sub extends Base {}");
    assert_eq!(index.snapshot().subtypes("Base"), vec!["Sub"]);

    assert!(index.remove(&base));
    assert!(!index.remove(&base));

    let snapshot = index.snapshot();
    assert!(snapshot.query("Base").is_empty());
    assert!(!snapshot.type_exists("Base"));
    // The edge belongs to Sub.java and survives until Sub is reanalyzed.
    assert_eq!(snapshot.subtypes("Base"), vec!["Sub"]);
    assert_eq!(snapshot.file_count(), 1);
}

#[test]
fn generations_only_grow() {
    let index = SymbolIndex::new();
    let mut last = index.generation();
    for i in 0..5 {
        index_file(&index, &format!("T{i}.java"), &format!("class T{i} {{}}"));
        let now = index.generation();
        assert!(now > last);
        last = now;
    }
    index.clear();
    assert!(index.generation() > last);
    assert_eq!(index.snapshot().file_count(), 0);
}

#[test]
fn held_snapshots_do_not_change() {
    let index = SymbolIndex::new();
    index_file(&index, "A.java", "class A {}");
    let held = index.snapshot();
    index_file(&index, "B.java", "class B {}");

    assert_eq!(held.file_count(), 1);
    assert!(held.query("B").is_empty());
    assert_eq!(index.snapshot().file_count(), 2);
}

#[test]
fn published_snapshots_survive_later_upserts() {
    let index = SymbolIndex::new();
    index_file(&index, "Base.java", "package p; public class Base {}");
    let early = index.snapshot();

    for i in 0..200 {
        let text = format!("package p; class T{i} extends Base {{ Base field{i}; }}");
        index_file(&index, &format!("T{i}.java"), &text);
    }
    index.remove(&path("T0.java"));

    assert_eq!(early.file_count(), 1);
    assert!(early.subtypes("p.Base").is_empty());
    assert!(early.usages("p.Base").is_empty());

    let late = index.snapshot();
    assert_eq!(late.file_count(), 200);
    assert_eq!(late.subtypes("p.Base").len(), 199);
    assert_eq!(late.usages("p.Base").len(), 2 * 199);
    assert_eq!(late.types_in_package("p").len(), 200);
    assert_eq!(late.generation(), early.generation() + 201);
}
