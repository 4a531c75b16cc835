use sable_core::{Diagnostic, SmolStr, TextRange, TextSize};
use sable_syntax::{Scope, TypeKind};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Bumped whenever [`FileSymbols`] changes shape. Stores written with another
/// version are discarded wholesale.
pub const SYMBOL_CACHE_SCHEMA_VERSION: u32 = 3;

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Type,
    Method,
    Constructor,
    Field,
    EnumConstant,
}

/// A named declaration.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Symbol {
    /// Members use `<type fqn>.<name>`; overloads share it.
    pub fqn: SmolStr,
    pub name: SmolStr,
    pub kind: SymbolKind,
    /// Only set for [`SymbolKind::Type`].
    pub type_kind: Option<TypeKind>,
    pub path: PathBuf,
    pub range: TextRange,
    pub name_range: TextRange,
    pub signature: SmolStr,
    /// FQN of the declaring type; `None` for top-level types.
    pub container: Option<SmolStr>,
    /// Position in declaration order within the file.
    pub ordinal: u32,
}

impl Symbol {
    pub fn is_type(&self) -> bool {
        self.kind == SymbolKind::Type
    }
}

/// A type reference bound to `target`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reference {
    pub target: SmolStr,
    pub range: TextRange,
}

/// A method invocation, kept for navigation.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallReference {
    pub name: SmolStr,
    pub range: TextRange,
    /// FQN of the innermost visible type around the call.
    pub enclosing: Option<SmolStr>,
}

/// `subtype extends/implements supertype`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SupertypeEdge {
    pub subtype: SmolStr,
    /// Resolved FQN, or the name as written when it could not be resolved.
    pub supertype: SmolStr,
    pub resolved: bool,
}

/// Everything the index keeps about one file. This is also the cache payload.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSymbols {
    pub package: Option<SmolStr>,
    /// Declaration order.
    pub symbols: Vec<Symbol>,
    pub references: Vec<Reference>,
    pub calls: Vec<CallReference>,
    /// Names attribution could not bind; a file is retried when one appears.
    pub unresolved: Vec<SmolStr>,
    pub supertypes: Vec<SupertypeEdge>,
    pub scopes: Vec<Scope>,
    pub diagnostics: Vec<Diagnostic>,
    /// Whether references were resolved. `false` for syntax-only extraction.
    pub attributed: bool,
}

impl FileSymbols {
    pub fn types(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.iter().filter(|symbol| symbol.is_type())
    }

    pub fn reference_at(&self, offset: TextSize) -> Option<&Reference> {
        self.references
            .iter()
            .find(|reference| reference.range.contains_inclusive(offset))
    }

    pub fn call_at(&self, offset: TextSize) -> Option<&CallReference> {
        self.calls
            .iter()
            .find(|call| call.range.contains_inclusive(offset))
    }

    pub fn declaration_at(&self, offset: TextSize) -> Option<&Symbol> {
        self.symbols
            .iter()
            .find(|symbol| symbol.name_range.contains_inclusive(offset))
    }

    /// The exported surface: what other files can observe.
    pub(crate) fn api(&self) -> Vec<(&str, SymbolKind, &str)> {
        let mut api: Vec<_> = self
            .symbols
            .iter()
            .map(|s| (s.fqn.as_str(), s.kind, s.signature.as_str()))
            .chain(
                self.supertypes
                    .iter()
                    .map(|e| (e.subtype.as_str(), SymbolKind::Type, e.supertype.as_str())),
            )
            .collect();
        api.sort_unstable();
        api.dedup();
        api
    }
}
