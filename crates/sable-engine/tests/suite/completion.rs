use super::{engine, offset_of, open_all};
use pretty_assertions::assert_eq;
use sable_engine::{CompletionItem, CompletionKind};

const FOO: &str = "package p;
/*top*/
public class Foo {
    int count;
    /*member*/
    void test() {
        /*body*/
        int x = cou;
    }
}
";

fn labels(items: &[CompletionItem]) -> Vec<&str> {
    items.iter().map(|item| item.label.as_str()).collect()
}

fn has(items: &[CompletionItem], label: &str, kind: CompletionKind) -> bool {
    items
        .iter()
        .any(|item| item.label == label && item.kind == kind)
}

#[test]
fn keywords_follow_the_cursor_context() {
    let engine = engine();
    let paths = open_all(&engine, &[("Foo.java", FOO)]);
    let foo = &paths[0];

    let body = engine.completions_at(foo, offset_of(FOO, "/*body*/"), "ret");
    assert!(has(&body, "return", CompletionKind::Keyword), "{:?}", labels(&body));
    assert!(!has(&body, "import", CompletionKind::Keyword));

    let member = engine.completions_at(foo, offset_of(FOO, "/*member*/"), "pub");
    assert!(has(&member, "public", CompletionKind::Keyword));
    assert!(!has(&member, "return", CompletionKind::Keyword));

    let top = engine.completions_at(foo, offset_of(FOO, "/*top*/"), "imp");
    assert!(has(&top, "import", CompletionKind::Keyword));
    assert!(!has(&top, "return", CompletionKind::Keyword));

    // The file already declares a package.
    let top = engine.completions_at(foo, offset_of(FOO, "/*top*/"), "pack");
    assert!(!has(&top, "package", CompletionKind::Keyword));
}

#[test]
fn members_and_types_are_offered() {
    let engine = engine();
    let paths = open_all(&engine, &[("Foo.java", FOO)]);
    let foo = &paths[0];
    let body = offset_of(FOO, "/*body*/");

    let items = engine.completions_at(foo, body, "count");
    assert_eq!(items[0].label, "count");
    assert_eq!(items[0].kind, CompletionKind::Field);

    let items = engine.completions_at(foo, body, "Fo");
    let foo_type = items
        .iter()
        .find(|item| item.kind == CompletionKind::Type && item.label == "Foo")
        .expect("project type");
    assert_eq!(foo_type.detail.as_deref(), Some("p.Foo"));

    let items = engine.completions_at(foo, body, "String");
    assert_eq!(items[0].label, "String");
    assert_eq!(items[0].detail.as_deref(), Some("java.lang.String"));
}

#[test]
fn inherited_members_are_visible() {
    let engine = engine();
    let child = "package p; class Child extends Parent { void run() { /*here*/ } }";
    let paths = open_all(
        &engine,
        &[
            ("Parent.java", "package p; class Parent { void inheritedHelper() {} }"),
            ("Child.java", child),
        ],
    );

    let items = engine.completions_at(&paths[1], offset_of(child, "/*here*/"), "inh");
    assert!(has(&items, "inheritedHelper", CompletionKind::Method));
}

#[test]
fn empty_prefix_comes_from_the_text() {
    let engine = engine();
    let paths = open_all(&engine, &[("Foo.java", FOO)]);
    let end_of_cou = offset_of(FOO, "cou;") + sable_engine::TextSize::from(3);

    let items = engine.completions_at(&paths[0], end_of_cou, "");
    assert_eq!(items[0].label, "count");
}

#[test]
fn exact_prefix_beats_a_better_fuzzy_score() {
    let engine = engine();
    let text = "class Weigh { int value; int valueOf; int aValue; void m() { /*here*/ } }";
    let paths = open_all(&engine, &[("Weigh.java", text)]);

    let items = engine.completions_at(&paths[0], offset_of(text, "/*here*/"), "value");
    let fields: Vec<&str> = items
        .iter()
        .filter(|item| item.kind == CompletionKind::Field)
        .map(|item| item.label.as_str())
        .collect();
    assert_eq!(fields, vec!["value", "valueOf", "aValue"]);
}

const BOX: &str = "package shop;
public class Box {
    int size;
    void open() {}
    static Box make() { return null; }
}
";

const CRATE: &str = "package shop;
class Crate extends Box {
    Box inner;
}
";

const USER: &str = "package shop;
class User {
    Crate crate;
    void run() {
        Box local = null;
        crate.inner.open();
        local.size = 2;
        Box.make();
        this.run();
    }
}
";

fn after(text: &str, needle: &str) -> sable_engine::TextSize {
    offset_of(text, needle) + sable_engine::TextSize::from(needle.len() as u32)
}

#[test]
fn member_select_offers_the_receiver_type_members() {
    let engine = engine();
    let paths = open_all(
        &engine,
        &[("Box.java", BOX), ("Crate.java", CRATE), ("User.java", USER)],
    );
    let user = &paths[2];

    let on_field = engine.completions_at(user, after(USER, "crate."), "");
    assert!(has(&on_field, "inner", CompletionKind::Field), "{:?}", labels(&on_field));
    assert!(has(&on_field, "size", CompletionKind::Field));
    assert!(has(&on_field, "open", CompletionKind::Method));
    assert!(!has(&on_field, "run", CompletionKind::Method));
    assert!(!has(&on_field, "return", CompletionKind::Keyword));
    assert!(!has(&on_field, "User", CompletionKind::Type));

    let chained = engine.completions_at(user, after(USER, "crate.inner."), "");
    assert!(has(&chained, "open", CompletionKind::Method));
    assert!(!has(&chained, "inner", CompletionKind::Field));

    let on_local = engine.completions_at(user, after(USER, "local."), "si");
    assert_eq!(on_local[0].label, "size");
    assert_eq!(on_local[0].detail.as_deref(), Some("size: int"));

    let on_type = engine.completions_at(user, after(USER, "Box."), "");
    assert!(has(&on_type, "make", CompletionKind::Method));

    let on_this = engine.completions_at(user, after(USER, "this."), "");
    assert!(has(&on_this, "run", CompletionKind::Method));
    assert!(has(&on_this, "crate", CompletionKind::Field));
}

#[test]
fn imports_complete_package_segments_then_types() {
    let engine = engine();
    let app = "package app;\nimport com.acme.util.Strings;\nimport java.util.List;\nclass App {}\n";
    let paths = open_all(
        &engine,
        &[
            ("Strings.java", "package com.acme.util; public class Strings {}"),
            ("Engine.java", "package com.acme.core; public class Engine {}"),
            ("App.java", app),
        ],
    );
    let app_path = &paths[2];

    let root = engine.completions_at(app_path, after(app, "import com."), "");
    assert_eq!(labels(&root), vec!["acme"]);
    assert_eq!(root[0].kind, CompletionKind::Package);
    assert_eq!(root[0].detail.as_deref(), Some("com.acme"));

    let mut nested = labels(&engine.completions_at(app_path, after(app, "import com.acme."), ""))
        .into_iter()
        .map(str::to_string)
        .collect::<Vec<_>>();
    nested.sort();
    assert_eq!(nested, vec!["core", "util"]);

    let types = engine.completions_at(app_path, after(app, "import com.acme.util."), "St");
    assert_eq!(types[0].label, "Strings");
    assert_eq!(types[0].kind, CompletionKind::Type);
    assert_eq!(types[0].detail.as_deref(), Some("com.acme.util.Strings"));

    let library = engine.completions_at(app_path, after(app, "import java.util."), "List");
    assert_eq!(library[0].label, "List");
    assert_eq!(library[0].detail.as_deref(), Some("java.util.List"));

    let package = engine.completions_at(app_path, after(app, "package "), "");
    assert!(has(&package, "com", CompletionKind::Package), "{:?}", labels(&package));
    assert!(has(&package, "app", CompletionKind::Package));
    assert!(!package.iter().any(|item| item.kind == CompletionKind::Type));
}
