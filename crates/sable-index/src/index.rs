use crate::snapshot::{FileEntry, IndexSnapshot};
use crate::symbol::FileSymbols;
use lasso::ThreadedRodeo;
use parking_lot::{Mutex, RwLock};
use sable_core::{Fingerprint, SmolStr};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

/// What a single [`SymbolIndex::upsert`] changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpsertOutcome {
    /// Generation of the snapshot that made the change visible.
    pub generation: u64,
    /// The file's exported declarations differ from the previous version.
    pub api_changed: bool,
    /// Simple names of types that were not declared by this file before.
    pub added_type_names: BTreeSet<SmolStr>,
    /// Packages that had no file before this one.
    pub added_packages: BTreeSet<SmolStr>,
    pub previous: Option<Fingerprint>,
    /// Fingerprint and symbols were identical; nothing was published.
    pub unchanged: bool,
}

/// Project-wide symbol table with snapshot reads.
///
/// Writers are serialized and publish a fresh [`IndexSnapshot`] per change.
/// Readers clone the current `Arc` and never observe a half-applied file:
/// a file's symbols are replaced as a unit, and generations only grow.
#[derive(Debug)]
pub struct SymbolIndex {
    interner: Arc<ThreadedRodeo>,
    current: RwLock<Arc<IndexSnapshot>>,
    writer: Mutex<()>,
}

impl Default for SymbolIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolIndex {
    pub fn new() -> Self {
        let interner = Arc::new(ThreadedRodeo::default());
        Self {
            current: RwLock::new(Arc::new(IndexSnapshot::empty(Arc::clone(&interner)))),
            interner,
            writer: Mutex::new(()),
        }
    }

    /// The latest published snapshot.
    pub fn snapshot(&self) -> Arc<IndexSnapshot> {
        Arc::clone(&self.current.read())
    }

    pub fn generation(&self) -> u64 {
        self.current.read().generation()
    }

    /// Replaces everything indexed for `path` with `symbols`.
    pub fn upsert(
        &self,
        path: &Path,
        fingerprint: Fingerprint,
        symbols: FileSymbols,
    ) -> UpsertOutcome {
        let _writer = self.writer.lock();
        let current = self.snapshot();

        if let Some(existing) = current.file(path) {
            if existing.fingerprint == fingerprint && existing.symbols == symbols {
                return UpsertOutcome {
                    generation: current.generation(),
                    previous: Some(fingerprint),
                    unchanged: true,
                    ..UpsertOutcome::default()
                };
            }
        }

        let key: Arc<Path> = Arc::from(path);
        // Shares every map node with `current`; only touched paths are copied.
        let mut state = IndexSnapshot::clone(&current);
        drop(current);
        let old = state.remove_file(path);

        let old_types: BTreeSet<&str> = old
            .as_ref()
            .map(|entry| entry.symbols.types().map(|s| s.name.as_str()).collect())
            .unwrap_or_default();
        let added_type_names = symbols
            .types()
            .filter(|symbol| !old_types.contains(symbol.name.as_str()))
            .map(|symbol| symbol.name.clone())
            .collect();
        let added_packages = symbols
            .package
            .iter()
            .filter(|package| !state.packages.contains_key(package.as_str()))
            .cloned()
            .collect();
        let api_changed = old
            .as_ref()
            .map_or(true, |entry| entry.symbols.api() != symbols.api());
        let previous = old.as_ref().map(|entry| entry.fingerprint.clone());

        state.insert_file(Arc::new(FileEntry {
            path: key,
            fingerprint,
            symbols,
        }));
        state.generation += 1;
        let generation = state.generation;

        *self.current.write() = Arc::new(state);
        tracing::debug!(
            target: "sable.index",
            path = %path.display(),
            generation,
            api_changed,
            "indexed file"
        );

        UpsertOutcome {
            generation,
            api_changed,
            added_type_names,
            added_packages,
            previous,
            unchanged: false,
        }
    }

    /// Drops every symbol of `path`. Returns whether the file was indexed.
    pub fn remove(&self, path: &Path) -> bool {
        let _writer = self.writer.lock();
        let current = self.snapshot();
        if current.file(path).is_none() {
            return false;
        }

        let mut state = IndexSnapshot::clone(&current);
        drop(current);
        state.remove_file(path);
        state.generation += 1;
        let generation = state.generation;

        *self.current.write() = Arc::new(state);
        tracing::debug!(
            target: "sable.index",
            path = %path.display(),
            generation,
            "removed file from index"
        );
        true
    }

    /// Empties the index. The generation keeps counting.
    pub fn clear(&self) {
        let _writer = self.writer.lock();
        let mut fresh = IndexSnapshot::empty(Arc::clone(&self.interner));
        fresh.generation = self.generation() + 1;
        *self.current.write() = Arc::new(fresh);
    }
}
