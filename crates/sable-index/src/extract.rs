use crate::symbol::{CallReference, FileSymbols, Reference, SupertypeEdge, Symbol, SymbolKind};
use sable_core::SmolStr;
use sable_syntax::{AttributedUnit, MemberKind, SyntaxUnit, TypeDecl};

/// Extraction input: attributed when classpath context was available,
/// otherwise the bare parse.
#[derive(Clone, Copy, Debug)]
pub enum ExtractInput<'a> {
    Attributed(&'a AttributedUnit),
    Syntax(&'a SyntaxUnit),
}

impl<'a> From<&'a AttributedUnit> for ExtractInput<'a> {
    fn from(unit: &'a AttributedUnit) -> Self {
        ExtractInput::Attributed(unit)
    }
}

impl<'a> From<&'a SyntaxUnit> for ExtractInput<'a> {
    fn from(unit: &'a SyntaxUnit) -> Self {
        ExtractInput::Syntax(unit)
    }
}

/// Collects the indexable facts of one unit.
///
/// Symbols come out in source order with `ordinal` set accordingly. Local
/// classes are not indexed.
pub fn extract<'a>(input: impl Into<ExtractInput<'a>>) -> FileSymbols {
    match input.into() {
        ExtractInput::Attributed(unit) => extract_attributed(unit),
        ExtractInput::Syntax(unit) => extract_syntax(unit),
    }
}

fn extract_attributed(attributed: &AttributedUnit) -> FileSymbols {
    let unit = &*attributed.syntax;

    let references = attributed
        .resolved_refs()
        .map(|(type_ref, target)| Reference {
            target: target.clone(),
            range: type_ref.range,
        })
        .collect();

    let supertypes = visible_types(unit)
        .flat_map(|decl| {
            decl.supertypes.iter().map(move |&idx| {
                match attributed.resolution(idx).fqn() {
                    Some(fqn) => SupertypeEdge {
                        subtype: decl.fqn.clone(),
                        supertype: fqn.clone(),
                        resolved: true,
                    },
                    None => written_supertype(unit, decl, idx),
                }
            })
        })
        .collect();

    FileSymbols {
        package: unit.package.clone(),
        symbols: declarations(unit),
        references,
        calls: calls(unit),
        unresolved: attributed.unresolved_names.iter().cloned().collect(),
        supertypes,
        scopes: unit.scopes.clone(),
        diagnostics: attributed.all_diagnostics(),
        attributed: true,
    }
}

fn extract_syntax(unit: &SyntaxUnit) -> FileSymbols {
    let supertypes = visible_types(unit)
        .flat_map(|decl| {
            decl.supertypes
                .iter()
                .map(move |&idx| written_supertype(unit, decl, idx))
        })
        .collect();

    FileSymbols {
        package: unit.package.clone(),
        symbols: declarations(unit),
        references: Vec::new(),
        calls: calls(unit),
        unresolved: Vec::new(),
        supertypes,
        scopes: unit.scopes.clone(),
        diagnostics: unit.diagnostics.clone(),
        attributed: false,
    }
}

fn visible_types(unit: &SyntaxUnit) -> impl Iterator<Item = &TypeDecl> {
    unit.types.iter().filter(|decl| !decl.is_local)
}

fn written_supertype(unit: &SyntaxUnit, decl: &TypeDecl, idx: usize) -> SupertypeEdge {
    SupertypeEdge {
        subtype: decl.fqn.clone(),
        supertype: unit
            .type_refs
            .get(idx)
            .map(|type_ref| type_ref.name.clone())
            .unwrap_or_default(),
        resolved: false,
    }
}

fn type_signature(decl: &TypeDecl) -> SmolStr {
    let mut signature = format!("{} {}", decl.kind.keyword(), decl.name);
    if !decl.type_params.is_empty() {
        signature.push('<');
        signature.push_str(&decl.type_params.join(", "));
        signature.push('>');
    }
    signature.into()
}

fn member_kind(kind: MemberKind) -> SymbolKind {
    match kind {
        MemberKind::Method => SymbolKind::Method,
        MemberKind::Constructor => SymbolKind::Constructor,
        MemberKind::Field => SymbolKind::Field,
        MemberKind::EnumConstant => SymbolKind::EnumConstant,
    }
}

fn declarations(unit: &SyntaxUnit) -> Vec<Symbol> {
    let mut symbols = Vec::new();
    for decl in visible_types(unit) {
        symbols.push(Symbol {
            fqn: decl.fqn.clone(),
            name: decl.name.clone(),
            kind: SymbolKind::Type,
            type_kind: Some(decl.kind),
            path: unit.path.clone(),
            range: decl.range,
            name_range: decl.name_range,
            signature: type_signature(decl),
            container: decl.parent.map(|parent| unit.types[parent].fqn.clone()),
            ordinal: 0,
        });
        for member in &decl.members {
            symbols.push(Symbol {
                fqn: format!("{}.{}", decl.fqn, member.name).into(),
                name: member.name.clone(),
                kind: member_kind(member.kind),
                type_kind: None,
                path: unit.path.clone(),
                range: member.range,
                name_range: member.name_range,
                signature: member.signature.as_str().into(),
                container: Some(decl.fqn.clone()),
                ordinal: 0,
            });
        }
    }

    // Nested types interleave with their outer type's members in the source.
    symbols.sort_by_key(|symbol| symbol.name_range.start());
    for (ordinal, symbol) in symbols.iter_mut().enumerate() {
        symbol.ordinal = u32::try_from(ordinal).unwrap_or(u32::MAX);
    }
    symbols
}

/// FQN of the innermost non-local type at or above `idx`.
fn visible_enclosing(unit: &SyntaxUnit, mut idx: Option<usize>) -> Option<SmolStr> {
    while let Some(current) = idx {
        let decl = &unit.types[current];
        if !decl.is_local {
            return Some(decl.fqn.clone());
        }
        idx = decl.parent;
    }
    None
}

fn calls(unit: &SyntaxUnit) -> Vec<CallReference> {
    unit.calls
        .iter()
        .map(|call| CallReference {
            name: call.name.clone(),
            range: call.name_range,
            enclosing: visible_enclosing(unit, call.enclosing),
        })
        .collect()
}
