//! Project symbol index.
//!
//! [`extract`] turns an analyzed unit into [`FileSymbols`]; [`SymbolIndex`]
//! keeps one entry per file and publishes immutable [`IndexSnapshot`]s that
//! answer name, prefix, usage, dependency and hierarchy queries.
//! [`SymbolSearchIndex`] layers fuzzy search on top of a snapshot.

#![forbid(unsafe_code)]

mod extract;
mod index;
mod prefix;
mod search;
mod snapshot;
mod symbol;

pub use extract::{extract, ExtractInput};
pub use index::{SymbolIndex, UpsertOutcome};
pub use prefix::PrefixIter;
pub use search::{CandidateStrategy, SearchResult, SearchStats, SymbolSearchIndex};
pub use snapshot::{FileEntry, IndexSnapshot, Usage};
pub use symbol::{
    CallReference, FileSymbols, Reference, SupertypeEdge, Symbol, SymbolKind,
    SYMBOL_CACHE_SCHEMA_VERSION,
};
