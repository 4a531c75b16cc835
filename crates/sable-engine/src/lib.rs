//! Sable's engine: the recompute pipeline and the query API.
//!
//! [`Engine`] ties the source registry, the Java front end, the symbol index
//! and the persistent cache together. Edits are applied to the registry and
//! analyzed in the background; queries answer from the last published index
//! snapshot without waiting.

#![forbid(unsafe_code)]

mod completion;
mod engine;
mod navigation;
mod pipeline;
mod progress;

pub use completion::{CompletionContext, CompletionItem, CompletionKind};
pub use engine::Engine;
pub use pipeline::FilePhase;
pub use progress::IndexingProgress;

pub use sable_config::EngineConfig;
pub use sable_core::{Diagnostic, DiagnosticKind, ProjectDescription, TextSize};
pub use sable_index::{SearchResult, Symbol, SymbolKind, Usage};
pub use sable_scheduler::{ProgressEvent, ProgressReceiver};
