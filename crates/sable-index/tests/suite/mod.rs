mod upsert;

use sable_core::{Fingerprint, LanguageLevel, TextSize};
use sable_index::{extract, FileSymbols, SymbolIndex};
use sable_syntax::{attribute, ClasspathContext, ClasspathIndex};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub(crate) fn path(name: &str) -> PathBuf {
    PathBuf::from(format!("/project/src/{name}"))
}

/// Parses and attributes `text` against the current index contents.
pub(crate) fn analyze(index: &SymbolIndex, file: &Path, text: &str) -> FileSymbols {
    let unit = sable_syntax::parse(
        file,
        text,
        Fingerprint::from_bytes(text),
        LanguageLevel::default(),
    );
    let snapshot = index.snapshot();
    let classpath = ClasspathIndex::with_builtins();
    let ctx = ClasspathContext::new(&*snapshot, &classpath);
    extract(&attribute(Arc::new(unit), &ctx))
}

/// Analyzes and upserts one file, returning its path.
pub(crate) fn index_file(index: &SymbolIndex, name: &str, text: &str) -> PathBuf {
    let file = path(name);
    let symbols = analyze(index, &file, text);
    index.upsert(&file, Fingerprint::from_bytes(text), symbols);
    file
}

pub(crate) fn offset_of(text: &str, needle: &str) -> TextSize {
    let idx = text.find(needle).expect("needle present");
    TextSize::from(idx as u32)
}
