//! Name resolution over a [`SyntaxUnit`].

use crate::classpath::{ClasspathContext, TypeLookup};
use crate::unit::{Import, SyntaxUnit, TypeRef};
use sable_core::{Diagnostic, SmolStr, TextSize};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

/// What a type reference was bound to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Resolution {
    /// A project or classpath type, by source FQN.
    Type(SmolStr),
    /// A local class of this file (index into [`SyntaxUnit::types`]).
    Local(usize),
    TypeParameter,
    /// `var`: the type is inferred and nothing is referenced.
    Inferred,
    Unresolved,
}

impl Resolution {
    pub fn fqn(&self) -> Option<&SmolStr> {
        match self {
            Resolution::Type(fqn) => Some(fqn),
            _ => None,
        }
    }
}

/// A [`SyntaxUnit`] with a [`Resolution`] for each of its type references.
///
/// Attribution is best-effort: unbound references are recorded as
/// [`Resolution::Unresolved`] plus one diagnostic each, and everything else
/// is still resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributedUnit {
    pub syntax: Arc<SyntaxUnit>,
    /// Parallel to `syntax.type_refs`.
    pub resolutions: Vec<Resolution>,
    /// Whether each import named something that exists; parallel to
    /// `syntax.imports`.
    pub import_resolved: Vec<bool>,
    /// Simple names (and on-demand import packages) that could not be bound.
    pub unresolved_names: BTreeSet<SmolStr>,
    /// `UnresolvedSymbol` diagnostics only.
    pub diagnostics: Vec<Diagnostic>,
}

impl AttributedUnit {
    pub fn resolution(&self, type_ref: usize) -> &Resolution {
        static UNRESOLVED: Resolution = Resolution::Unresolved;
        self.resolutions.get(type_ref).unwrap_or(&UNRESOLVED)
    }

    /// References bound to a named type, with their [`TypeRef`].
    pub fn resolved_refs(&self) -> impl Iterator<Item = (&TypeRef, &SmolStr)> {
        self.syntax
            .type_refs
            .iter()
            .zip(&self.resolutions)
            .filter_map(|(type_ref, resolution)| Some((type_ref, resolution.fqn()?)))
    }

    /// Syntax errors followed by resolution errors, ordered by position.
    pub fn all_diagnostics(&self) -> Vec<Diagnostic> {
        let mut out = self.syntax.diagnostics.clone();
        out.extend(self.diagnostics.iter().cloned());
        out.sort_by_key(|diag| (diag.range.start(), diag.range.end()));
        out
    }

    pub fn is_fully_resolved(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// Binds every type reference and import of `unit` against `ctx`.
pub fn attribute(unit: Arc<SyntaxUnit>, ctx: &ClasspathContext<'_>) -> AttributedUnit {
    let mut unresolved_names = BTreeSet::new();
    let mut diagnostics = Vec::new();
    let resolver = Resolver::new(&unit, ctx);

    let import_resolved: Vec<bool> = unit
        .imports
        .iter()
        .map(|import| {
            let ok = resolver.import_exists(import);
            if !ok {
                let name = if import.on_demand {
                    import.path.clone()
                } else {
                    last_segment(&import.path).into()
                };
                unresolved_names.insert(name);
                diagnostics.push(Diagnostic::unresolved_symbol(import.range, &import.path));
            }
            ok
        })
        .collect();

    let resolutions: Vec<Resolution> = unit
        .type_refs
        .iter()
        .map(|type_ref| {
            let resolution = resolver.resolve(type_ref);
            if resolution == Resolution::Unresolved {
                unresolved_names.insert(SmolStr::new(type_ref.simple_name()));
                diagnostics.push(Diagnostic::unresolved_symbol(type_ref.range, &type_ref.name));
            }
            resolution
        })
        .collect();
    drop(resolver);

    diagnostics.sort_by_key(|diag| (diag.range.start(), diag.range.end()));
    tracing::trace!(
        target: "sable.syntax",
        path = %unit.path.display(),
        refs = resolutions.len(),
        unresolved = diagnostics.len(),
        "attributed unit"
    );

    AttributedUnit {
        syntax: unit,
        resolutions,
        import_resolved,
        unresolved_names,
        diagnostics,
    }
}

fn last_segment(path: &str) -> &str {
    path.rsplit('.').next().unwrap_or(path)
}

fn owner_of(path: &str) -> Option<&str> {
    path.rsplit_once('.').map(|(owner, _)| owner)
}

struct Resolver<'a> {
    unit: &'a SyntaxUnit,
    ctx: &'a ClasspathContext<'a>,
    /// Simple name -> FQN for valid single-type (and static nested type) imports.
    single: HashMap<&'a str, &'a str>,
    /// Packages and types whose members are imported on demand.
    on_demand: Vec<&'a str>,
}

impl<'a> Resolver<'a> {
    fn new(unit: &'a SyntaxUnit, ctx: &'a ClasspathContext<'a>) -> Self {
        let mut resolver = Self {
            unit,
            ctx,
            single: HashMap::new(),
            on_demand: Vec::new(),
        };
        for import in &unit.imports {
            if import.on_demand {
                resolver.on_demand.push(&import.path);
            } else if resolver.known(&import.path) {
                resolver
                    .single
                    .entry(last_segment(&import.path))
                    .or_insert(&import.path);
            }
        }
        resolver
    }

    fn known(&self, fqn: &str) -> bool {
        self.unit.type_by_fqn(fqn).is_some() || self.ctx.contains_type(fqn)
    }

    fn import_exists(&self, import: &Import) -> bool {
        let path = import.path.as_str();
        match (import.is_static, import.on_demand) {
            (false, false) => self.known(path),
            (_, true) => self.known(path) || self.ctx.contains_package(path),
            // `import static a.B.member;` only the owner type can be checked.
            (true, false) => {
                self.known(path) || owner_of(path).is_some_and(|owner| self.known(owner))
            }
        }
    }

    fn resolve(&self, type_ref: &TypeRef) -> Resolution {
        if type_ref.name == "var" {
            return Resolution::Inferred;
        }
        let offset = type_ref.range.start();
        if !type_ref.is_qualified() {
            return self
                .resolve_simple(&type_ref.name, offset, type_ref.enclosing)
                .unwrap_or(Resolution::Unresolved);
        }

        if self.known(&type_ref.name) {
            return Resolution::Type(type_ref.name.clone());
        }
        let Some((head, rest)) = type_ref.name.split_once('.') else {
            return Resolution::Unresolved;
        };
        match self.resolve_simple(head, offset, type_ref.enclosing) {
            Some(Resolution::Type(outer)) => {
                let candidate = format!("{outer}.{rest}");
                if self.known(&candidate) {
                    Resolution::Type(candidate.into())
                } else {
                    Resolution::Unresolved
                }
            }
            _ => Resolution::Unresolved,
        }
    }

    fn resolve_simple(
        &self,
        name: &str,
        offset: TextSize,
        enclosing: Option<usize>,
    ) -> Option<Resolution> {
        let unit = self.unit;

        let is_type_param = unit
            .type_params
            .iter()
            .any(|(scope, param)| param == name && scope.contains(offset));
        if is_type_param {
            return Some(Resolution::TypeParameter);
        }

        // Enclosing types, their member types and local classes, innermost first.
        let mut current = enclosing;
        while let Some(idx) = current {
            let decl = &unit.types[idx];
            if decl.name == name {
                return Some(self.declared(idx));
            }
            let member = unit
                .types
                .iter()
                .position(|child| child.parent == Some(idx) && child.name == name);
            if let Some(member) = member {
                return Some(self.declared(member));
            }
            if !decl.is_local {
                let inherited = format!("{}.{name}", decl.fqn);
                if self.ctx.contains_type(&inherited) {
                    return Some(Resolution::Type(inherited.into()));
                }
            }
            current = decl.parent;
        }

        if let Some(top) = unit.child_types(None).find(|decl| decl.name == name) {
            return Some(Resolution::Type(top.fqn.clone()));
        }

        if let Some(fqn) = self.single.get(name) {
            return Some(Resolution::Type(SmolStr::new(fqn)));
        }

        let same_package = unit.qualify(name);
        if self.known(&same_package) {
            return Some(Resolution::Type(same_package.into()));
        }

        for package in &self.on_demand {
            let candidate = format!("{package}.{name}");
            if self.known(&candidate) {
                return Some(Resolution::Type(candidate.into()));
            }
        }

        let lang = format!("java.lang.{name}");
        if self.ctx.contains_type(&lang) {
            return Some(Resolution::Type(lang.into()));
        }

        None
    }

    fn declared(&self, idx: usize) -> Resolution {
        let decl = &self.unit.types[idx];
        if decl.is_local {
            Resolution::Local(idx)
        } else {
            Resolution::Type(decl.fqn.clone())
        }
    }
}
