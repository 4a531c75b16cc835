//! Invalidation and recompute.
//!
//! Every registry change marks a file [`FilePhase::Stale`] and queues it.
//! Queued files are analyzed on the compute pool in submission order, at
//! most one task per path. A file that changes while it is being analyzed is
//! flagged for a rerun instead; the running task is never cancelled.

use crate::progress::IndexingProgress;
use parking_lot::{Condvar, Mutex, RwLock};
use sable_cache::{CacheLookup, CacheStore};
use sable_config::IndexingConfig;
use sable_core::SmolStr;
use sable_index::{extract, FileSymbols, IndexSnapshot, SymbolIndex, UpsertOutcome};
use sable_scheduler::{Progress, Scheduler};
use sable_syntax::{attribute, ClasspathContext, ClasspathIndex, FrontEnd, TypeLookup};
use sable_vfs::{FileSnapshot, SourceRegistry};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilePhase {
    Unanalyzed,
    Analyzing,
    Fresh,
    Stale,
}

/// Why a file needs another analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) enum Trigger {
    /// New or edited text. A cache record for the same content is reused.
    Content,
    /// Something the file resolves against changed; attribution must rerun.
    Dependency,
}

type SmartCallback = Box<dyn FnOnce() + Send + 'static>;

#[derive(Default)]
struct QueueState {
    phases: HashMap<PathBuf, FilePhase>,
    /// Strongest pending trigger per queued or rerun-flagged path.
    triggers: HashMap<PathBuf, Trigger>,
    queue: VecDeque<PathBuf>,
    queued: HashSet<PathBuf>,
    rerun: HashSet<PathBuf>,
    running: usize,
    completed: u64,
    cache_hits: u64,
    current_path: Option<PathBuf>,
    waiting: Vec<SmartCallback>,
    progress: Option<Progress>,
    session_done: u64,
    /// Types a queued file will declare, taken from a cache record that
    /// matches its current text.
    promises: HashMap<PathBuf, Vec<SmolStr>>,
    promised: HashMap<SmolStr, usize>,
}

impl QueueState {
    fn is_idle(&self) -> bool {
        self.queue.is_empty() && self.running == 0
    }

    fn raise_trigger(&mut self, path: &Path, trigger: Trigger) {
        let slot = self
            .triggers
            .entry(path.to_path_buf())
            .or_insert(trigger);
        *slot = (*slot).max(trigger);
    }

    fn enqueue(&mut self, path: PathBuf) {
        if self.queued.insert(path.clone()) {
            self.queue.push_back(path);
        }
    }

    fn promise(&mut self, path: PathBuf, types: Vec<SmolStr>) {
        self.release(&path);
        for fqn in &types {
            *self.promised.entry(fqn.clone()).or_default() += 1;
        }
        self.promises.insert(path, types);
    }

    fn release(&mut self, path: &Path) -> Vec<SmolStr> {
        let types = self.promises.remove(path).unwrap_or_default();
        for fqn in &types {
            if let Some(count) = self.promised.get_mut(fqn) {
                *count -= 1;
                if *count == 0 {
                    self.promised.remove(fqn);
                }
            }
        }
        types
    }
}

/// Result of one completed analysis.
#[derive(Debug, Default)]
struct Analysis {
    removed: bool,
    from_cache: bool,
    /// Other files that must be analyzed again.
    stale: BTreeSet<PathBuf>,
    /// The index moved under the analysis; attribute the file again.
    requeue: bool,
}

pub(crate) struct PipelineParts {
    pub registry: Arc<SourceRegistry>,
    pub front_end: Arc<FrontEnd>,
    pub index: Arc<SymbolIndex>,
    pub scheduler: Scheduler,
    pub settings: IndexingConfig,
}

struct Shared {
    registry: Arc<SourceRegistry>,
    front_end: Arc<FrontEnd>,
    index: Arc<SymbolIndex>,
    scheduler: Scheduler,
    settings: IndexingConfig,
    classpath: RwLock<Arc<ClasspathIndex>>,
    cache: RwLock<Option<CacheStore>>,
    state: Mutex<QueueState>,
    idle: Condvar,
}

/// Handle to the recompute pipeline. Cheap to clone.
#[derive(Clone)]
pub(crate) struct Pipeline {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("progress", &self.progress())
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    pub(crate) fn new(parts: PipelineParts) -> Self {
        Self {
            shared: Arc::new(Shared {
                registry: parts.registry,
                front_end: parts.front_end,
                index: parts.index,
                scheduler: parts.scheduler,
                settings: parts.settings,
                classpath: RwLock::new(Arc::new(ClasspathIndex::with_builtins())),
                cache: RwLock::new(None),
                state: Mutex::new(QueueState::default()),
                idle: Condvar::new(),
            }),
        }
    }

    pub(crate) fn classpath(&self) -> Arc<ClasspathIndex> {
        self.shared.classpath()
    }

    pub(crate) fn set_classpath(&self, classpath: Arc<ClasspathIndex>) {
        *self.shared.classpath.write() = classpath;
    }

    pub(crate) fn set_cache(&self, cache: Option<CacheStore>) {
        *self.shared.cache.write() = cache;
    }

    /// Marks `paths` stale and queues them in dependency order.
    ///
    /// Cached records from an earlier run serve as hints: a file is queued
    /// after the files declaring the types it referenced last time. Files
    /// without a record, ties and cycles fall back to path order.
    pub(crate) fn schedule_batch(&self, paths: Vec<PathBuf>, trigger: Trigger) {
        let (ordered, promises) = self.shared.dependency_order(paths);
        tracing::debug!(
            target: "sable.pipeline",
            files = ordered.len(),
            promised = promises.len(),
            ?trigger,
            "scheduling batch"
        );
        let ready = {
            let mut state = self.shared.state.lock();
            for (path, types) in promises {
                state.promise(path, types);
            }
            for path in ordered {
                self.shared.invalidate_locked(&mut state, path, trigger);
            }
            self.shared.take_ready(&mut state)
        };
        self.shared.dispatch(ready);
    }

    pub(crate) fn phase(&self, path: &Path) -> Option<FilePhase> {
        let state = self.shared.state.lock();
        state.phases.get(path).copied().or_else(|| {
            self.shared
                .registry
                .contains(path)
                .then_some(FilePhase::Unanalyzed)
        })
    }

    pub(crate) fn progress(&self) -> IndexingProgress {
        let state = self.shared.state.lock();
        IndexingProgress {
            queued: state.queue.len(),
            running: state.running,
            completed: state.completed,
            cache_hits: state.cache_hits,
            current_path: state.current_path.clone(),
        }
    }

    pub(crate) fn is_indexing(&self) -> bool {
        !self.shared.state.lock().is_idle()
    }

    /// Blocks until the queue drains or `timeout` passes. Returns whether the
    /// pipeline is idle.
    ///
    /// Must not be called from a compute worker.
    pub(crate) fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.shared.state.lock();
        while !state.is_idle() {
            if self
                .shared
                .idle
                .wait_until(&mut state, deadline)
                .timed_out()
            {
                return state.is_idle();
            }
        }
        true
    }

    /// Runs `callback` now if nothing is queued, otherwise once the queue
    /// drains.
    pub(crate) fn run_when_smart(&self, callback: impl FnOnce() + Send + 'static) {
        let mut state = self.shared.state.lock();
        if state.is_idle() {
            drop(state);
            callback();
        } else {
            state.waiting.push(Box::new(callback));
        }
    }
}

impl Shared {
    fn classpath(&self) -> Arc<ClasspathIndex> {
        Arc::clone(&self.classpath.read())
    }

    fn cache(&self) -> Option<CacheStore> {
        self.cache.read().clone()
    }

    fn invalidate_locked(&self, state: &mut QueueState, path: PathBuf, trigger: Trigger) {
        state.raise_trigger(&path, trigger);
        if state.phases.get(&path) == Some(&FilePhase::Analyzing) {
            tracing::trace!(
                target: "sable.pipeline",
                path = %path.display(),
                "changed during analysis; rerun requested"
            );
            state.rerun.insert(path);
        } else {
            state.phases.insert(path.clone(), FilePhase::Stale);
            state.enqueue(path);
        }
    }

    /// Pops as many queued files as there are free workers.
    fn take_ready(&self, state: &mut QueueState) -> Vec<(PathBuf, Trigger)> {
        let limit = self.scheduler.compute_threads().max(1);
        let mut ready = Vec::new();
        while state.running < limit {
            let Some(path) = state.queue.pop_front() else {
                break;
            };
            state.queued.remove(&path);
            let trigger = state.triggers.remove(&path).unwrap_or(Trigger::Content);
            state.phases.insert(path.clone(), FilePhase::Analyzing);
            state.running += 1;
            state.current_path = Some(path.clone());
            if state.progress.is_none() {
                state.progress = Some(self.scheduler.progress().start("Indexing", None));
                state.session_done = 0;
            }
            ready.push((path, trigger));
        }
        ready
    }

    /// Submits analyses. Called without the state lock held, since an inline
    /// pool runs the job before `spawn_compute` returns.
    fn dispatch(self: &Arc<Self>, ready: Vec<(PathBuf, Trigger)>) {
        for (path, trigger) in ready {
            let shared = Arc::clone(self);
            self.scheduler.spawn_compute(move || {
                let mut in_flight = InFlight::new(Arc::clone(&shared), path);
                in_flight.outcome = Some(shared.analyze(&in_flight.path, trigger));
            });
        }
    }

    fn finish(self: &Arc<Self>, path: PathBuf, outcome: Option<Analysis>) {
        let (ready, callbacks) = {
            let mut state = self.state.lock();
            state.running = state.running.saturating_sub(1);
            state.completed += 1;
            state.session_done += 1;
            let rerun = state.rerun.remove(&path);

            match &outcome {
                Some(analysis) => {
                    if analysis.from_cache {
                        state.cache_hits += 1;
                    }
                    if rerun {
                        state.phases.insert(path.clone(), FilePhase::Stale);
                        state.enqueue(path.clone());
                    } else if analysis.removed {
                        state.phases.remove(&path);
                    } else {
                        state.phases.insert(path.clone(), FilePhase::Fresh);
                    }
                    if analysis.requeue {
                        self.invalidate_locked(&mut state, path.clone(), Trigger::Dependency);
                    }
                    for dependent in &analysis.stale {
                        self.invalidate_locked(&mut state, dependent.clone(), Trigger::Dependency);
                    }
                }
                None => {
                    tracing::warn!(
                        target: "sable.pipeline",
                        path = %path.display(),
                        "analysis did not complete; file left stale"
                    );
                    state.phases.insert(path.clone(), FilePhase::Stale);
                    state.release(&path);
                    if rerun {
                        state.enqueue(path.clone());
                    }
                }
            }

            if let Some(progress) = &state.progress {
                progress.report(path.display().to_string(), state.session_done);
            }

            let ready = self.take_ready(&mut state);
            let mut callbacks = Vec::new();
            if state.is_idle() {
                state.current_path = None;
                if let Some(progress) = state.progress.take() {
                    progress.finish(format!("{} files analyzed", state.session_done));
                }
                callbacks = std::mem::take(&mut state.waiting);
                self.idle.notify_all();
            }
            (ready, callbacks)
        };

        self.dispatch(ready);
        for callback in callbacks {
            self.scheduler.spawn_background(callback);
        }
    }

    fn analyze(&self, path: &Path, trigger: Trigger) -> Analysis {
        let mut analysis = self.analyze_file(path, trigger);
        analysis.stale.extend(self.keep_promise(path));
        analysis.stale.remove(path);
        analysis
    }

    fn analyze_file(&self, path: &Path, trigger: Trigger) -> Analysis {
        let before = self.index.snapshot();
        let Some(file) = self.registry.file(path) else {
            return self.forget(path, &before);
        };

        if trigger == Trigger::Content
            && self.settings.skip_unchanged_files
            && file.is_analyzed()
            && before.fingerprint(path) == Some(&file.fingerprint)
        {
            tracing::trace!(
                target: "sable.pipeline",
                path = %path.display(),
                "content unchanged since last analysis; skipping"
            );
            return Analysis::default();
        }

        let cached = match trigger {
            Trigger::Content => self.cached_symbols(path, &file, &before),
            Trigger::Dependency => None,
        };
        let from_cache = cached.is_some();
        let symbols = match cached {
            Some(symbols) => symbols,
            None => self.compute(path, &file, &before),
        };

        let outcome = self.index.upsert(path, file.fingerprint.clone(), symbols);
        self.registry
            .set_last_analyzed(path, file.fingerprint.clone(), file.version);

        let after = self.index.snapshot();
        let stale = stale_after(path, &outcome, &before, &after);
        let requeue = !outcome.unchanged && self.bindings_moved(path, &outcome, &before, &after);
        tracing::debug!(
            target: "sable.pipeline",
            path = %path.display(),
            version = file.version,
            from_cache,
            api_changed = outcome.api_changed,
            stale = stale.len(),
            requeue,
            "analyzed file"
        );

        Analysis {
            removed: false,
            from_cache,
            stale,
            requeue,
        }
    }

    /// Whether what `path` was attributed against changed before its symbols
    /// were published: a name it failed on became resolvable, or a type it
    /// bound to went away.
    fn bindings_moved(
        &self,
        path: &Path,
        outcome: &UpsertOutcome,
        before: &IndexSnapshot,
        after: &IndexSnapshot,
    ) -> bool {
        let Some(entry) = after.file(path) else {
            return false;
        };
        let symbols = &entry.symbols;

        // Another file published between `before` and this upsert.
        if outcome.generation > before.generation() + 1 {
            let appeared = symbols
                .unresolved
                .iter()
                .find(|name| !resolvable_name(before, name) && resolvable_name(after, name));
            if let Some(name) = appeared {
                tracing::trace!(
                    target: "sable.pipeline",
                    path = %path.display(),
                    name = %name,
                    "name appeared during analysis"
                );
                return true;
            }
        }

        match self.unbound_target(symbols, after) {
            Some(target) => {
                tracing::trace!(
                    target: "sable.pipeline",
                    path = %path.display(),
                    missing = %target,
                    "bound type disappeared during analysis"
                );
                true
            }
            None => false,
        }
    }

    /// First resolved reference or supertype of `symbols` that neither
    /// `snapshot`, the classpath, the file itself nor a pending promise
    /// declares.
    fn unbound_target(&self, symbols: &FileSymbols, snapshot: &IndexSnapshot) -> Option<SmolStr> {
        let own: HashSet<&str> = symbols.types().map(|symbol| symbol.fqn.as_str()).collect();
        let classpath = self.classpath();
        let ctx = ClasspathContext::new(snapshot, &classpath);
        let missing: Vec<&SmolStr> = bound_targets(symbols)
            .filter(|target| !own.contains(target.as_str()) && !ctx.contains_type(target))
            .collect();
        if missing.is_empty() {
            return None;
        }
        let state = self.state.lock();
        missing
            .into_iter()
            .find(|target| !state.promised.contains_key(target.as_str()))
            .cloned()
    }

    /// Drops the promise made for `path` now that its symbols are published.
    /// Returns the files bound to a promised type it did not declare.
    fn keep_promise(&self, path: &Path) -> BTreeSet<PathBuf> {
        let promised = self.state.lock().release(path);
        if promised.is_empty() {
            return BTreeSet::new();
        }
        let snapshot = self.index.snapshot();
        let broken: Vec<&SmolStr> = promised
            .iter()
            .filter(|fqn| {
                snapshot
                    .file(path)
                    .map_or(true, |entry| !entry.symbols.types().any(|t| t.fqn == **fqn))
            })
            .collect();
        if !broken.is_empty() {
            tracing::debug!(
                target: "sable.pipeline",
                path = %path.display(),
                broken = broken.len(),
                "file no longer declares promised types"
            );
        }
        broken
            .into_iter()
            .flat_map(|fqn| snapshot.usages(fqn))
            .map(|usage| usage.path)
            .collect()
    }

    /// The file left the registry: drop everything derived from it.
    fn forget(&self, path: &Path, before: &IndexSnapshot) -> Analysis {
        let dependents = before.dependents(path);
        let removed = self.index.remove(path);
        if let Some(cache) = self.cache() {
            cache.remove(path);
        }
        self.front_end.evict(path);
        self.registry.release_tombstone(path);
        tracing::debug!(
            target: "sable.pipeline",
            path = %path.display(),
            dependents = dependents.len(),
            "file removed"
        );

        Analysis {
            removed: true,
            from_cache: false,
            stale: if removed { dependents } else { BTreeSet::new() },
            requeue: false,
        }
    }

    /// A cache record for exactly this content, unless the index has moved
    /// away from it: one of its unresolved names has appeared, or a type it
    /// bound to is no longer declared anywhere.
    fn cached_symbols(
        &self,
        path: &Path,
        file: &FileSnapshot,
        snapshot: &IndexSnapshot,
    ) -> Option<FileSymbols> {
        let cache = self.cache()?;
        match cache.load_matching::<FileSymbols>(path, &file.fingerprint) {
            CacheLookup::Hit(record) => {
                let symbols = record.payload;
                let resolvable = symbols
                    .unresolved
                    .iter()
                    .find(|name| resolvable_name(snapshot, name));
                if let Some(name) = resolvable {
                    tracing::trace!(
                        target: "sable.pipeline",
                        path = %path.display(),
                        name = %name,
                        "cached record has a now-resolvable name; reanalyzing"
                    );
                    return None;
                }
                if let Some(target) = self.unbound_target(&symbols, snapshot) {
                    tracing::trace!(
                        target: "sable.pipeline",
                        path = %path.display(),
                        missing = %target,
                        "cached record binds to a missing type; reanalyzing"
                    );
                    return None;
                }
                Some(symbols)
            }
            CacheLookup::Miss(reason) => {
                tracing::trace!(
                    target: "sable.pipeline",
                    path = %path.display(),
                    ?reason,
                    "symbol cache miss"
                );
                None
            }
        }
    }

    fn compute(&self, path: &Path, file: &FileSnapshot, snapshot: &IndexSnapshot) -> FileSymbols {
        let unit = self
            .front_end
            .parse_cached(path, &file.text, &file.fingerprint);

        let symbols = if file.text.len() as u64 > self.settings.max_file_bytes {
            tracing::debug!(
                target: "sable.pipeline",
                path = %path.display(),
                bytes = file.text.len(),
                limit = self.settings.max_file_bytes,
                "file too large for attribution; indexing declarations only"
            );
            extract(&*unit)
        } else {
            let classpath = self.classpath();
            let ctx = ClasspathContext::new(snapshot, &classpath);
            let attributed = attribute(unit, &ctx);
            extract(&attributed)
        };

        if let Some(cache) = self.cache() {
            if let Err(err) = cache.store(path, &file.fingerprint, &symbols) {
                tracing::warn!(
                    target: "sable.pipeline",
                    path = %path.display(),
                    error = %err,
                    "failed to persist symbols"
                );
            }
        }
        symbols
    }

    /// Orders `paths` by their cached hints. Also returns, for every file
    /// whose record still matches its text, the types it will declare.
    fn dependency_order(
        &self,
        mut paths: Vec<PathBuf>,
    ) -> (Vec<PathBuf>, Vec<(PathBuf, Vec<SmolStr>)>) {
        paths.sort();
        paths.dedup();
        let Some(cache) = self.cache() else {
            return (paths, Vec::new());
        };

        let mut promises = Vec::new();
        let hints: BTreeMap<PathBuf, FileSymbols> = paths
            .iter()
            .filter_map(|path| {
                let record = cache.load::<FileSymbols>(path).hit()?;
                let current = self.registry.file(path);
                if current.is_some_and(|file| file.fingerprint == record.fingerprint) {
                    let types = record.payload.types().map(|t| t.fqn.clone()).collect();
                    promises.push((path.clone(), types));
                }
                Some((path.clone(), record.payload))
            })
            .collect();
        if hints.is_empty() {
            return (paths, promises);
        }
        (order_by_hints(&paths, &hints), promises)
    }
}

/// Files to reanalyze after `path` was upserted.
fn stale_after(
    path: &Path,
    outcome: &UpsertOutcome,
    before: &IndexSnapshot,
    after: &IndexSnapshot,
) -> BTreeSet<PathBuf> {
    let mut stale = BTreeSet::new();
    if outcome.unchanged {
        return stale;
    }
    // References to a brand-new file were either unresolved, handled below,
    // or already bound from a cache record.
    if outcome.api_changed && outcome.previous.is_some() {
        stale.extend(before.dependents(path));
        stale.extend(after.dependents(path));
    }
    let added = outcome
        .added_type_names
        .iter()
        .chain(&outcome.added_packages)
        .map(SmolStr::as_str);
    stale.extend(after.files_with_unresolved(added));
    stale.remove(path);
    stale
}

fn resolvable_name(snapshot: &IndexSnapshot, name: &str) -> bool {
    !snapshot.types_by_simple_name(name).is_empty() || snapshot.contains_package(name)
}

/// Types `symbols` bound to: reference targets and resolved supertypes.
fn bound_targets(symbols: &FileSymbols) -> impl Iterator<Item = &SmolStr> {
    symbols
        .references
        .iter()
        .map(|reference| &reference.target)
        .chain(
            symbols
                .supertypes
                .iter()
                .filter(|edge| edge.resolved)
                .map(|edge| &edge.supertype),
        )
}

/// Kahn's algorithm over the references recorded in `hints`. `paths` must
/// be sorted; ready files and cycle breakers are taken in path order.
fn order_by_hints(paths: &[PathBuf], hints: &BTreeMap<PathBuf, FileSymbols>) -> Vec<PathBuf> {
    let mut declared: HashMap<&str, usize> = HashMap::new();
    for (idx, path) in paths.iter().enumerate() {
        if let Some(symbols) = hints.get(path) {
            for symbol in symbols.types() {
                declared.entry(symbol.fqn.as_str()).or_insert(idx);
            }
        }
    }

    let mut indegree = vec![0usize; paths.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); paths.len()];
    for (idx, path) in paths.iter().enumerate() {
        let Some(symbols) = hints.get(path) else {
            continue;
        };
        let deps: BTreeSet<usize> = bound_targets(symbols)
            .filter_map(|target| declared.get(target.as_str()).copied())
            .filter(|&dep| dep != idx)
            .collect();
        indegree[idx] = deps.len();
        for dep in deps {
            dependents[dep].push(idx);
        }
    }

    let mut ready: BTreeSet<usize> = (0..paths.len()).filter(|&idx| indegree[idx] == 0).collect();
    let mut emitted = vec![false; paths.len()];
    let mut order = Vec::with_capacity(paths.len());
    while order.len() < paths.len() {
        let next = match ready.pop_first() {
            Some(idx) => idx,
            // Only cycles remain; break at the first path still waiting.
            None => match emitted.iter().position(|done| !done) {
                Some(idx) => idx,
                None => break,
            },
        };
        if emitted[next] {
            continue;
        }
        emitted[next] = true;
        order.push(paths[next].clone());
        for &dependent in &dependents[next] {
            indegree[dependent] = indegree[dependent].saturating_sub(1);
            if indegree[dependent] == 0 && !emitted[dependent] {
                ready.insert(dependent);
            }
        }
    }
    order
}

/// Reports the analysis of one path when dropped, including when the
/// analysis unwinds.
struct InFlight {
    shared: Arc<Shared>,
    path: PathBuf,
    outcome: Option<Analysis>,
}

impl InFlight {
    fn new(shared: Arc<Shared>, path: PathBuf) -> Self {
        Self {
            shared,
            path,
            outcome: None,
        }
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        let path = std::mem::take(&mut self.path);
        self.shared.finish(path, self.outcome.take());
    }
}
