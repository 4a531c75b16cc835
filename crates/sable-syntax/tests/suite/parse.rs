use super::{offset_of, parse_java};
use pretty_assertions::assert_eq;
use sable_core::{DiagnosticKind, SmolStr, TextSize};
use sable_syntax::{MemberKind, ScopeKind, TypeKind};

const FOO: &str = r#"package com.acme;

import java.util.List;
import static java.util.Collections.*;

public class Foo<T> extends Base implements Runnable, Comparable<Foo<T>> {
    private int count = 0;
    int a, b;

    public Foo(int count) { this.count = count; }

    public void bar() {}

    static int add(int x, String... rest) { return x; }

    static class Inner {}

    enum Color { RED, GREEN; void paint() {} }
}

interface Shape { double area(); }
"#;

#[test]
fn lowers_package_imports_and_declarations() {
    let unit = parse_java(FOO);
    assert!(unit.diagnostics.is_empty(), "{:?}", unit.diagnostics);
    assert_eq!(unit.package.as_deref(), Some("com.acme"));

    let imports: Vec<_> = unit
        .imports
        .iter()
        .map(|i| (i.path.as_str(), i.is_static, i.on_demand))
        .collect();
    assert_eq!(
        imports,
        vec![
            ("java.util.List", false, false),
            ("java.util.Collections", true, true),
        ]
    );

    let fqns: Vec<_> = unit.types.iter().map(|t| t.fqn.as_str()).collect();
    assert_eq!(
        fqns,
        vec![
            "com.acme.Foo",
            "com.acme.Foo.Inner",
            "com.acme.Foo.Color",
            "com.acme.Shape"
        ]
    );
    assert_eq!(unit.types[1].parent, Some(0));
    assert_eq!(unit.types[2].kind, TypeKind::Enum);
    assert_eq!(unit.types[3].kind, TypeKind::Interface);
}

#[test]
fn members_carry_kinds_and_signatures() {
    let unit = parse_java(FOO);
    let foo = &unit.types[0];
    assert_eq!(foo.modifiers, vec!["public"]);
    assert_eq!(foo.type_params, vec!["T"]);

    let members: Vec<_> = foo
        .members
        .iter()
        .map(|m| (m.name.as_str(), m.kind, m.signature.as_str()))
        .collect();
    assert_eq!(
        members,
        vec![
            ("count", MemberKind::Field, "count: int"),
            ("a", MemberKind::Field, "a: int"),
            ("b", MemberKind::Field, "b: int"),
            ("Foo", MemberKind::Constructor, "Foo(int)"),
            ("bar", MemberKind::Method, "bar(): void"),
            ("add", MemberKind::Method, "add(int, String...): int"),
        ]
    );
    let add = &foo.members[5];
    assert_eq!(add.modifiers, vec!["static"]);
    assert_eq!(&FOO[add.name_range], "add");

    let color: Vec<_> = unit.types[2]
        .members
        .iter()
        .map(|m| (m.name.as_str(), m.kind))
        .collect();
    assert_eq!(
        color,
        vec![
            ("RED", MemberKind::EnumConstant),
            ("GREEN", MemberKind::EnumConstant),
            ("paint", MemberKind::Method),
        ]
    );

    let shape = &unit.types[3];
    assert_eq!(shape.members[0].signature, "area(): double");
}

#[test]
fn supertypes_point_at_the_outer_reference() {
    let unit = parse_java(FOO);
    let supers: Vec<_> = unit.types[0]
        .supertypes
        .iter()
        .map(|&idx| unit.type_refs[idx].name.as_str())
        .collect();
    assert_eq!(supers, vec!["Base", "Runnable", "Comparable"]);
}

#[test]
fn qualified_and_generic_type_references() {
    let text = "class A { java.util.Map.Entry<String, Integer> e; }";
    let unit = parse_java(text);
    let refs: Vec<_> = unit.type_refs.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(refs, vec!["java.util.Map.Entry", "String", "Integer"]);
    assert!(unit.type_refs[0].is_qualified());
    assert_eq!(unit.type_refs[0].simple_name(), "Entry");
    assert_eq!(unit.type_refs[0].enclosing, Some(0));
}

#[test]
fn type_parameters_are_declarations_not_references() {
    let text = "class Box<T> { T value; <U> U map(U u) { class Local {} return u; } }";
    let unit = parse_java(text);

    let params: Vec<_> = unit.type_params.iter().map(|(_, n)| n.as_str()).collect();
    assert_eq!(params, vec!["T", "U"]);
    // Declaring occurrences are not references.
    let t_refs = unit.type_refs.iter().filter(|r| r.name == "T").count();
    let u_refs = unit.type_refs.iter().filter(|r| r.name == "U").count();
    assert_eq!((t_refs, u_refs), (1, 2));

    assert_eq!(unit.types.len(), 2);
    assert!(unit.types[1].is_local);
    assert_eq!(unit.child_types(None).count(), 1);

    let box_members: Vec<_> = unit.types[0].members.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(box_members, vec!["value", "map"]);
}

#[test]
fn records_expose_components_as_fields() {
    let unit = parse_java("record Point(int x, int y) {}");
    let point = &unit.types[0];
    assert_eq!(point.kind, TypeKind::Record);
    let members: Vec<_> = point
        .members
        .iter()
        .map(|m| (m.name.as_str(), m.kind, m.signature.as_str()))
        .collect();
    assert_eq!(
        members,
        vec![
            ("x", MemberKind::Field, "x: int"),
            ("y", MemberKind::Field, "y: int"),
        ]
    );
}

#[test]
fn call_sites_record_receiver_and_enclosing_type() {
    let text = "class A { void m() { list.add(1); run(); } }";
    let unit = parse_java(text);
    let calls: Vec<_> = unit
        .calls
        .iter()
        .map(|c| (c.name.as_str(), c.receiver.as_deref(), c.enclosing))
        .collect();
    assert_eq!(
        calls,
        vec![("add", Some("list"), Some(0)), ("run", None, Some(0))]
    );
}

#[test]
fn scope_outline_distinguishes_bodies_and_blocks() {
    let text = "class A {\n  int f;\n  void m() {\n    int x;\n  }\n}\n";
    let unit = parse_java(text);

    let kind_at = |needle: &str| unit.scope_at(offset_of(text, needle)).map(|s| s.kind);
    assert_eq!(kind_at("int f"), Some(ScopeKind::TypeBody));
    assert_eq!(kind_at("int x"), Some(ScopeKind::Block));
    assert_eq!(unit.scope_at(TextSize::from(0)), None);
}

#[test]
fn syntax_errors_do_not_abort_lowering() {
    let text = "class Foo {\n  void bar() { int x = ; }\n  void baz() {}\n}\n";
    let unit = parse_java(text);

    assert!(unit.has_errors());
    assert!(unit
        .diagnostics
        .iter()
        .all(|d| d.kind == DiagnosticKind::SyntaxError));
    let foo = unit.type_by_fqn("Foo").expect("Foo is still declared");
    assert!(foo.members.iter().any(|m| m.name == "baz"));
}

#[test]
fn garbage_input_still_yields_a_unit() {
    let unit = parse_java("}}}} class");
    assert!(unit.has_errors());
    for diag in &unit.diagnostics {
        assert!(!diag.message.is_empty());
    }
}

#[test]
fn empty_file_is_an_empty_unit() {
    let unit = parse_java("");
    assert!(unit.types.is_empty());
    assert!(unit.diagnostics.is_empty());
    assert_eq!(unit.package, None);
}

#[test]
fn annotation_elements_keep_their_modifiers() {
    let text = "@interface Marker { public String value() default \"\"; abstract int rank(); }";
    let unit = parse_java(text);
    let members: Vec<_> = unit.types[0]
        .members
        .iter()
        .map(|m| (m.name.as_str(), m.signature.as_str(), m.modifiers.clone()))
        .collect();
    assert_eq!(
        members,
        vec![
            ("value", "value(): String", vec![SmolStr::new("public")]),
            ("rank", "rank(): int", vec![SmolStr::new("abstract")]),
        ]
    );
}
