use crate::completion::enclosing_type;
use sable_core::{SmolStr, TextSize};
use sable_index::{IndexSnapshot, Symbol, SymbolKind};
use std::collections::BTreeSet;
use std::path::Path;

/// Declarations for the name at `offset`.
///
/// A declaration name resolves to itself, a resolved type reference to the
/// declaring type, and a method call to the methods of that name on the
/// enclosing type or its supertypes, falling back to every project method of
/// that name. Classpath types have no source and yield nothing.
pub(crate) fn go_to_declaration(
    snapshot: &IndexSnapshot,
    path: &Path,
    offset: TextSize,
) -> Vec<Symbol> {
    if let Some(symbol) = snapshot.declaration_at(path, offset) {
        return vec![symbol.clone()];
    }

    if let Some(reference) = snapshot.reference_at(path, offset) {
        return snapshot
            .by_fqn(&reference.target)
            .into_iter()
            .filter(Symbol::is_type)
            .collect();
    }

    if let Some(call) = snapshot.call_at(path, offset) {
        let enclosing = call
            .enclosing
            .clone()
            .or_else(|| enclosing_type(snapshot, path, offset).map(|symbol| symbol.fqn.clone()));
        let scoped = enclosing
            .map(|owner| methods_in_hierarchy(snapshot, owner, &call.name))
            .unwrap_or_default();
        if !scoped.is_empty() {
            return scoped;
        }
        return snapshot
            .query(&call.name)
            .into_iter()
            .filter(|symbol| symbol.kind == SymbolKind::Method)
            .collect();
    }

    Vec::new()
}

/// Methods named `name` declared on `owner`, or failing that on the nearest
/// supertype that declares any.
fn methods_in_hierarchy(snapshot: &IndexSnapshot, owner: SmolStr, name: &str) -> Vec<Symbol> {
    let mut visited = BTreeSet::new();
    let mut level = vec![owner];
    while !level.is_empty() {
        let found: Vec<Symbol> = level
            .iter()
            .flat_map(|owner| snapshot.members_of(owner))
            .filter(|member| member.kind == SymbolKind::Method && member.name == name)
            .collect();
        if !found.is_empty() {
            return found;
        }

        visited.extend(level.iter().cloned());
        let mut next = Vec::new();
        for owner in &level {
            for supertype in snapshot.supertypes(owner) {
                if !visited.contains(&supertype) && !next.contains(&supertype) {
                    next.push(supertype);
                }
            }
        }
        level = next;
    }
    Vec::new()
}
