use crate::prefix::PrefixIter;
use crate::symbol::{CallReference, FileSymbols, Reference, Symbol, SymbolKind};
use im::{HashMap, OrdMap, OrdSet};
use lasso::{Spur, ThreadedRodeo};
use sable_core::{Diagnostic, Fingerprint, SmolStr, TextSize};
use sable_syntax::{Scope, TypeLookup};
use std::collections::{BTreeSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Everything indexed for one file at one fingerprint.
#[derive(Debug, PartialEq, Eq)]
pub struct FileEntry {
    pub path: Arc<Path>,
    pub fingerprint: Fingerprint,
    pub symbols: FileSymbols,
}

/// Position of a symbol inside the snapshot. Orders by path, then
/// declaration order, which is the tie-break for symbols sharing a name.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct SymbolRef {
    pub(crate) path: Arc<Path>,
    pub(crate) ordinal: u32,
}

/// A place where a symbol is used.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Usage {
    pub path: PathBuf,
    pub range: sable_core::TextRange,
}

/// Immutable view of the whole index.
///
/// Produced by [`crate::SymbolIndex`]; a snapshot never changes after it has
/// been published, so holders can query it without further locking. The maps
/// are persistent: cloning a snapshot shares every node, and replacing one
/// file copies only the paths it touches.
#[derive(Debug, Clone)]
pub struct IndexSnapshot {
    pub(crate) generation: u64,
    pub(crate) interner: Arc<ThreadedRodeo>,
    pub(crate) files: OrdMap<Arc<Path>, Arc<FileEntry>>,
    pub(crate) by_fqn: HashMap<Spur, OrdSet<SymbolRef>>,
    pub(crate) by_name: HashMap<Spur, OrdSet<SymbolRef>>,
    /// FQN-ordered keys for range scans.
    pub(crate) fqn_order: OrdMap<SmolStr, Spur>,
    pub(crate) packages: HashMap<SmolStr, OrdSet<Arc<Path>>>,
    /// Target FQN -> files with a resolved reference to it.
    pub(crate) referencing: HashMap<SmolStr, OrdSet<Arc<Path>>>,
    /// Unresolved simple name (or package) -> files that failed on it.
    pub(crate) unresolved: HashMap<SmolStr, OrdSet<Arc<Path>>>,
    /// Supertype -> (subtype, declaring file).
    pub(crate) subtypes: HashMap<SmolStr, OrdSet<(SmolStr, Arc<Path>)>>,
    /// Subtype -> (supertype, declaring file).
    pub(crate) supertypes: HashMap<SmolStr, OrdSet<(SmolStr, Arc<Path>)>>,
}

impl IndexSnapshot {
    pub(crate) fn empty(interner: Arc<ThreadedRodeo>) -> Self {
        Self {
            generation: 0,
            interner,
            files: OrdMap::new(),
            by_fqn: HashMap::new(),
            by_name: HashMap::new(),
            fqn_order: OrdMap::new(),
            packages: HashMap::new(),
            referencing: HashMap::new(),
            unresolved: HashMap::new(),
            subtypes: HashMap::new(),
            supertypes: HashMap::new(),
        }
    }

    /// Incremented by every published change.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn symbol_count(&self) -> usize {
        self.files
            .values()
            .map(|entry| entry.symbols.symbols.len())
            .sum()
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.files.keys().map(|path| &**path)
    }

    pub fn file(&self, path: &Path) -> Option<&Arc<FileEntry>> {
        self.files.get(path)
    }

    pub fn fingerprint(&self, path: &Path) -> Option<&Fingerprint> {
        self.files.get(path).map(|entry| &entry.fingerprint)
    }

    pub(crate) fn resolve(&self, symbol: &SymbolRef) -> Option<&Symbol> {
        self.files
            .get(&symbol.path)?
            .symbols
            .symbols
            .get(symbol.ordinal as usize)
    }

    fn collect(&self, refs: Option<&OrdSet<SymbolRef>>) -> Vec<Symbol> {
        refs.into_iter()
            .flatten()
            .filter_map(|symbol| self.resolve(symbol).cloned())
            .collect()
    }

    /// Symbols whose FQN or simple name is `name`.
    ///
    /// Ordered by FQN, then declaring path, then declaration order.
    pub fn query(&self, name: &str) -> Vec<Symbol> {
        let Some(id) = self.interner.get(name) else {
            return Vec::new();
        };
        let mut refs: Vec<&SymbolRef> = self
            .by_fqn
            .get(&id)
            .into_iter()
            .chain(self.by_name.get(&id))
            .flatten()
            .collect();
        refs.sort();
        refs.dedup();

        let mut out: Vec<Symbol> = refs
            .into_iter()
            .filter_map(|symbol| self.resolve(symbol).cloned())
            .collect();
        out.sort_by(|a, b| {
            a.fqn
                .cmp(&b.fqn)
                .then_with(|| a.path.cmp(&b.path))
                .then_with(|| a.ordinal.cmp(&b.ordinal))
        });
        out
    }

    /// Symbols with exactly this FQN, in tie-break order.
    pub fn by_fqn(&self, fqn: &str) -> Vec<Symbol> {
        let Some(id) = self.interner.get(fqn) else {
            return Vec::new();
        };
        self.collect(self.by_fqn.get(&id))
    }

    /// Lazy FQN-ordered scan over symbols whose FQN starts with `prefix`.
    pub fn query_prefix(self: &Arc<Self>, prefix: &str) -> PrefixIter {
        PrefixIter::new(Arc::clone(self), prefix)
    }

    pub fn type_exists(&self, fqn: &str) -> bool {
        let Some(id) = self.interner.get(fqn) else {
            return false;
        };
        self.by_fqn.get(&id).is_some_and(|refs| {
            refs.iter()
                .filter_map(|symbol| self.resolve(symbol))
                .any(Symbol::is_type)
        })
    }

    /// Short-class-name index: every type whose simple name is `name`.
    pub fn types_by_simple_name(&self, name: &str) -> Vec<Symbol> {
        let Some(id) = self.interner.get(name) else {
            return Vec::new();
        };
        let mut out: Vec<Symbol> = self
            .collect(self.by_name.get(&id))
            .into_iter()
            .filter(Symbol::is_type)
            .collect();
        out.sort_by(|a, b| a.fqn.cmp(&b.fqn).then_with(|| a.path.cmp(&b.path)));
        out
    }

    /// Top-level types declared in `package`.
    pub fn types_in_package(&self, package: &str) -> Vec<Symbol> {
        let mut out: Vec<Symbol> = self
            .packages
            .get(package)
            .into_iter()
            .flatten()
            .filter_map(|path| self.files.get(path))
            .flat_map(|entry| entry.symbols.types())
            .filter(|symbol| symbol.container.is_none())
            .cloned()
            .collect();
        out.sort_by(|a, b| a.fqn.cmp(&b.fqn).then_with(|| a.path.cmp(&b.path)));
        out
    }

    pub fn packages(&self) -> impl Iterator<Item = &str> {
        self.packages.keys().map(SmolStr::as_str)
    }

    /// Every indexed type, in FQN order.
    pub fn all_types(&self) -> impl Iterator<Item = &Symbol> {
        self.fqn_order
            .values()
            .filter_map(|id| self.by_fqn.get(id))
            .flatten()
            .filter_map(|symbol| self.resolve(symbol))
            .filter(|symbol| symbol.is_type())
    }

    /// Every indexed symbol, file by file in declaration order.
    pub fn all_symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.files
            .values()
            .flat_map(|entry| entry.symbols.symbols.iter())
    }

    /// Usages of `fqn`, derived from the references of every file.
    pub fn usages(&self, fqn: &str) -> Vec<Usage> {
        let mut out: Vec<Usage> = self
            .referencing
            .get(fqn)
            .into_iter()
            .flatten()
            .filter_map(|path| self.files.get(path))
            .flat_map(|entry| {
                entry
                    .symbols
                    .references
                    .iter()
                    .filter(|reference| reference.target == fqn)
                    .map(|reference| Usage {
                        path: entry.path.to_path_buf(),
                        range: reference.range,
                    })
            })
            .collect();
        out.sort_by(|a, b| {
            a.path
                .cmp(&b.path)
                .then_with(|| a.range.start().cmp(&b.range.start()))
        });
        out
    }

    /// Files with a resolved reference to a type declared in `path`.
    pub fn direct_dependents(&self, path: &Path) -> BTreeSet<PathBuf> {
        let Some(entry) = self.files.get(path) else {
            return BTreeSet::new();
        };
        entry
            .symbols
            .types()
            .filter_map(|symbol| self.referencing.get(&symbol.fqn))
            .flatten()
            .filter(|dependent| ***dependent != *path)
            .map(|dependent| dependent.to_path_buf())
            .collect()
    }

    /// Transitive closure of [`IndexSnapshot::direct_dependents`], excluding
    /// `path` itself.
    pub fn dependents(&self, path: &Path) -> BTreeSet<PathBuf> {
        let mut seen = BTreeSet::new();
        let mut queue: VecDeque<PathBuf> = self.direct_dependents(path).into_iter().collect();
        while let Some(next) = queue.pop_front() {
            if next == path || !seen.insert(next.clone()) {
                continue;
            }
            queue.extend(self.direct_dependents(&next));
        }
        seen
    }

    /// Files whose attribution failed on any of `names`.
    pub fn files_with_unresolved<'a>(
        &self,
        names: impl IntoIterator<Item = &'a str>,
    ) -> BTreeSet<PathBuf> {
        names
            .into_iter()
            .filter_map(|name| self.unresolved.get(name))
            .flatten()
            .map(|path| path.to_path_buf())
            .collect()
    }

    /// Direct subtypes of `fqn`, sorted.
    pub fn subtypes(&self, fqn: &str) -> Vec<SmolStr> {
        let mut out: Vec<SmolStr> = self
            .subtypes
            .get(fqn)
            .into_iter()
            .flatten()
            .map(|(subtype, _)| subtype.clone())
            .collect();
        out.dedup();
        out
    }

    /// Every transitive subtype of `fqn`, breadth first.
    pub fn all_subtypes(&self, fqn: &str) -> Vec<SmolStr> {
        let mut out = Vec::new();
        let mut seen = BTreeSet::new();
        let mut queue: VecDeque<SmolStr> = self.subtypes(fqn).into();
        while let Some(next) = queue.pop_front() {
            if !seen.insert(next.clone()) {
                continue;
            }
            out.push(next.clone());
            queue.extend(self.subtypes(&next));
        }
        out
    }

    pub fn supertypes(&self, fqn: &str) -> Vec<SmolStr> {
        let mut out: Vec<SmolStr> = self
            .supertypes
            .get(fqn)
            .into_iter()
            .flatten()
            .map(|(supertype, _)| supertype.clone())
            .collect();
        out.sort();
        out.dedup();
        out
    }

    pub fn symbols_in_file(&self, path: &Path) -> &[Symbol] {
        self.files
            .get(path)
            .map(|entry| entry.symbols.symbols.as_slice())
            .unwrap_or_default()
    }

    pub fn file_diagnostics(&self, path: &Path) -> Option<&[Diagnostic]> {
        self.files
            .get(path)
            .map(|entry| entry.symbols.diagnostics.as_slice())
    }

    pub fn scopes(&self, path: &Path) -> &[Scope] {
        self.files
            .get(path)
            .map(|entry| entry.symbols.scopes.as_slice())
            .unwrap_or_default()
    }

    pub fn reference_at(&self, path: &Path, offset: TextSize) -> Option<&Reference> {
        self.files.get(path)?.symbols.reference_at(offset)
    }

    pub fn call_at(&self, path: &Path, offset: TextSize) -> Option<&CallReference> {
        self.files.get(path)?.symbols.call_at(offset)
    }

    pub fn declaration_at(&self, path: &Path, offset: TextSize) -> Option<&Symbol> {
        self.files.get(path)?.symbols.declaration_at(offset)
    }

    /// Members (not nested types) declared directly in `type_fqn`.
    pub fn members_of(&self, type_fqn: &str) -> Vec<Symbol> {
        let mut out: Vec<Symbol> = self
            .by_fqn(type_fqn)
            .iter()
            .filter(|symbol| symbol.is_type())
            .filter_map(|symbol| self.files.get(symbol.path.as_path()))
            .flat_map(|entry| entry.symbols.symbols.iter())
            .filter(|symbol| {
                symbol.kind != SymbolKind::Type && symbol.container.as_deref() == Some(type_fqn)
            })
            .cloned()
            .collect();
        out.sort_by(|a, b| a.path.cmp(&b.path).then_with(|| a.ordinal.cmp(&b.ordinal)));
        out.dedup();
        out
    }

    pub(crate) fn remove_file(&mut self, path: &Path) -> Option<Arc<FileEntry>> {
        let entry = self.files.remove(path)?;
        let key = &entry.path;

        for symbol in &entry.symbols.symbols {
            let symbol_ref = SymbolRef {
                path: Arc::clone(key),
                ordinal: symbol.ordinal,
            };
            if let Some(id) = self.interner.get(symbol.fqn.as_str()) {
                if remove_ref(&mut self.by_fqn, id, &symbol_ref) {
                    self.fqn_order.remove(&symbol.fqn);
                }
            }
            if let Some(id) = self.interner.get(symbol.name.as_str()) {
                remove_ref(&mut self.by_name, id, &symbol_ref);
            }
        }

        if let Some(package) = &entry.symbols.package {
            remove_path(&mut self.packages, package, key);
        }
        for reference in &entry.symbols.references {
            remove_path(&mut self.referencing, &reference.target, key);
        }
        for name in &entry.symbols.unresolved {
            remove_path(&mut self.unresolved, name, key);
        }
        for edge in &entry.symbols.supertypes {
            remove_edge(&mut self.subtypes, &edge.supertype, &edge.subtype, key);
            remove_edge(&mut self.supertypes, &edge.subtype, &edge.supertype, key);
        }
        Some(entry)
    }

    pub(crate) fn insert_file(&mut self, entry: Arc<FileEntry>) {
        let key = Arc::clone(&entry.path);

        for symbol in &entry.symbols.symbols {
            let symbol_ref = SymbolRef {
                path: Arc::clone(&key),
                ordinal: symbol.ordinal,
            };
            let fqn_id = self.interner.get_or_intern(symbol.fqn.as_str());
            let name_id = self.interner.get_or_intern(symbol.name.as_str());
            insert_ref(&mut self.by_fqn, fqn_id, symbol_ref.clone());
            insert_ref(&mut self.by_name, name_id, symbol_ref);
            self.fqn_order.insert(symbol.fqn.clone(), fqn_id);
        }

        if let Some(package) = &entry.symbols.package {
            insert_path(&mut self.packages, package, &key);
        }
        for reference in &entry.symbols.references {
            insert_path(&mut self.referencing, &reference.target, &key);
        }
        for name in &entry.symbols.unresolved {
            insert_path(&mut self.unresolved, name, &key);
        }
        for edge in &entry.symbols.supertypes {
            insert_edge(&mut self.subtypes, &edge.supertype, &edge.subtype, &key);
            insert_edge(&mut self.supertypes, &edge.subtype, &edge.supertype, &key);
        }

        self.files.insert(key, entry);
    }
}

impl TypeLookup for IndexSnapshot {
    fn contains_type(&self, fqn: &str) -> bool {
        self.type_exists(fqn)
    }

    fn contains_package(&self, package: &str) -> bool {
        self.packages.contains_key(package)
    }
}

fn insert_ref(map: &mut HashMap<Spur, OrdSet<SymbolRef>>, id: Spur, symbol: SymbolRef) {
    map.entry(id).or_insert_with(OrdSet::new).insert(symbol);
}

/// Returns whether the key is now gone.
fn remove_ref(map: &mut HashMap<Spur, OrdSet<SymbolRef>>, id: Spur, symbol: &SymbolRef) -> bool {
    let Some(refs) = map.get_mut(&id) else {
        return true;
    };
    refs.remove(symbol);
    if refs.is_empty() {
        map.remove(&id);
        true
    } else {
        false
    }
}

fn insert_path(map: &mut HashMap<SmolStr, OrdSet<Arc<Path>>>, key: &SmolStr, path: &Arc<Path>) {
    map.entry(key.clone())
        .or_insert_with(OrdSet::new)
        .insert(Arc::clone(path));
}

fn remove_path(map: &mut HashMap<SmolStr, OrdSet<Arc<Path>>>, key: &str, path: &Arc<Path>) {
    if let Some(paths) = map.get_mut(key) {
        paths.remove(path);
        if paths.is_empty() {
            map.remove(key);
        }
    }
}

fn insert_edge(
    map: &mut HashMap<SmolStr, OrdSet<(SmolStr, Arc<Path>)>>,
    key: &SmolStr,
    other: &SmolStr,
    path: &Arc<Path>,
) {
    map.entry(key.clone())
        .or_insert_with(OrdSet::new)
        .insert((other.clone(), Arc::clone(path)));
}

fn remove_edge(
    map: &mut HashMap<SmolStr, OrdSet<(SmolStr, Arc<Path>)>>,
    key: &str,
    other: &SmolStr,
    path: &Arc<Path>,
) {
    if let Some(edges) = map.get_mut(key) {
        edges.remove(&(other.clone(), Arc::clone(path)));
        if edges.is_empty() {
            map.remove(key);
        }
    }
}
