//! Core shared types for Sable.
//!
//! Everything here is a plain value type shared by the registry, the front
//! end, the index and the engine. The crate stays small and has no runtime.

mod diagnostic;
mod fingerprint;
mod path;
mod project;
mod text;

pub use diagnostic::{Diagnostic, DiagnosticKind, Severity};
pub use fingerprint::Fingerprint;
pub use path::normalize_path;
pub use project::{LanguageLevel, ProjectDescription};
pub use smol_str::SmolStr;
pub use text::{is_java_identifier_part, is_java_identifier_start, partial_identifier};
pub use text_size::{TextRange, TextSize};
