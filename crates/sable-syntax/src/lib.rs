//! Java front end for Sable.
//!
//! Text goes in, [`SyntaxUnit`]s and [`AttributedUnit`]s come out. The parser
//! is `tree-sitter-java`; every tree-sitter type stays inside this crate so
//! the rest of the engine only sees the lowered model.

mod attribute;
mod builtins;
mod classpath;
mod errors;
mod front_end;
mod lower;
mod tree;
mod unit;

pub use attribute::{attribute, AttributedUnit, Resolution};
pub use builtins::BOOT_TYPES;
pub use classpath::{
    ClasspathContext, ClasspathEntry, ClasspathError, ClasspathIndex, NoProjectTypes, TypeLookup,
};
pub use front_end::{parse, FrontEnd};
pub use unit::{
    innermost_scope, CallSite, Import, MemberDecl, MemberKind, Scope, ScopeKind, SyntaxUnit,
    TypeDecl, TypeKind, TypeRef,
};
