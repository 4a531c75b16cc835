use sable_core::{Diagnostic, Fingerprint, LanguageLevel, SmolStr, TextRange, TextSize};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeKind {
    Class,
    Interface,
    Enum,
    Record,
    Annotation,
}

impl TypeKind {
    pub fn keyword(self) -> &'static str {
        match self {
            TypeKind::Class => "class",
            TypeKind::Interface => "interface",
            TypeKind::Enum => "enum",
            TypeKind::Record => "record",
            TypeKind::Annotation => "@interface",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MemberKind {
    Method,
    Constructor,
    Field,
    EnumConstant,
}

/// A member declared directly in a type body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberDecl {
    pub name: SmolStr,
    pub kind: MemberKind,
    pub range: TextRange,
    pub name_range: TextRange,
    /// `name(params): ret` for methods, `Name(params)` for constructors,
    /// `name: Type` for fields, the bare name for enum constants.
    pub signature: String,
    pub modifiers: Vec<SmolStr>,
}

/// A type declaration. Nested types are separate entries linked by `parent`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDecl {
    pub name: SmolStr,
    /// Package-qualified source name, nested types joined with `.`.
    pub fqn: SmolStr,
    pub kind: TypeKind,
    pub range: TextRange,
    pub name_range: TextRange,
    pub parent: Option<usize>,
    /// Declared inside a method or initializer body; not visible outside it.
    pub is_local: bool,
    pub modifiers: Vec<SmolStr>,
    pub type_params: Vec<SmolStr>,
    /// Indices into [`SyntaxUnit::type_refs`] for `extends`/`implements`.
    pub supertypes: Vec<usize>,
    pub members: Vec<MemberDecl>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    /// Dotted path without the trailing `.*`.
    pub path: SmolStr,
    pub is_static: bool,
    pub on_demand: bool,
    pub range: TextRange,
}

/// A type name written in source, e.g. `List` or `java.util.Map.Entry`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeRef {
    pub name: SmolStr,
    pub range: TextRange,
    /// Innermost type whose body contains the reference.
    pub enclosing: Option<usize>,
}

impl TypeRef {
    pub fn is_qualified(&self) -> bool {
        self.name.contains('.')
    }

    pub fn simple_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }
}

/// A method invocation `receiver.name(...)` or `name(...)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSite {
    pub name: SmolStr,
    pub name_range: TextRange,
    pub receiver: Option<SmolStr>,
    pub enclosing: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScopeKind {
    /// Between the braces of a class, interface, enum or annotation body.
    TypeBody,
    /// Between the braces of a method, constructor, initializer or nested block.
    Block,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Scope {
    pub kind: ScopeKind,
    pub range: TextRange,
}

/// Parse result for one file at one fingerprint.
///
/// Always produced, even for malformed input: syntax problems are recorded in
/// `diagnostics` and the rest of the unit holds whatever could be recovered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxUnit {
    pub path: PathBuf,
    pub fingerprint: Fingerprint,
    pub language_level: LanguageLevel,
    pub package: Option<SmolStr>,
    pub imports: Vec<Import>,
    pub types: Vec<TypeDecl>,
    pub type_refs: Vec<TypeRef>,
    pub calls: Vec<CallSite>,
    pub scopes: Vec<Scope>,
    /// `(declaring range, name)` of every type parameter.
    pub type_params: Vec<(TextRange, SmolStr)>,
    pub diagnostics: Vec<Diagnostic>,
}

impl SyntaxUnit {
    pub(crate) fn empty(path: PathBuf, fingerprint: Fingerprint, level: LanguageLevel) -> Self {
        Self {
            path,
            fingerprint,
            language_level: level,
            package: None,
            imports: Vec::new(),
            types: Vec::new(),
            type_refs: Vec::new(),
            calls: Vec::new(),
            scopes: Vec::new(),
            type_params: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.diagnostics.is_empty()
    }

    /// Qualifies `name` with this file's package.
    pub fn qualify(&self, name: &str) -> String {
        match &self.package {
            Some(package) => format!("{package}.{name}"),
            None => name.to_string(),
        }
    }

    pub fn type_by_fqn(&self, fqn: &str) -> Option<&TypeDecl> {
        self.types.iter().find(|decl| !decl.is_local && decl.fqn == fqn)
    }

    /// Visible (non-local) types whose `parent` is `parent`.
    pub fn child_types(&self, parent: Option<usize>) -> impl Iterator<Item = &TypeDecl> {
        self.types
            .iter()
            .filter(move |decl| !decl.is_local && decl.parent == parent)
    }

    /// Innermost scope strictly containing `offset`.
    pub fn scope_at(&self, offset: TextSize) -> Option<Scope> {
        innermost_scope(&self.scopes, offset)
    }
}

/// Innermost scope whose braces strictly enclose `offset`.
pub fn innermost_scope(scopes: &[Scope], offset: TextSize) -> Option<Scope> {
    scopes
        .iter()
        .filter(|scope| scope.range.start() < offset && offset < scope.range.end())
        .min_by_key(|scope| scope.range.len())
        .copied()
}
