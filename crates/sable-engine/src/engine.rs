use crate::completion::{complete, CompletionItem, CompletionRequest};
use crate::navigation;
use crate::pipeline::{FilePhase, Pipeline, PipelineParts, Trigger};
use crate::progress::IndexingProgress;
use anyhow::{Context, Result};
use crossbeam_channel::Receiver;
use parking_lot::{Mutex, RwLock};
use sable_cache::{CacheDir, CacheStore, StoreStatus};
use sable_config::EngineConfig;
use sable_core::{normalize_path, partial_identifier, Diagnostic, ProjectDescription, SmolStr, TextSize};
use sable_index::{
    IndexSnapshot, SearchResult, Symbol, SymbolIndex, SymbolSearchIndex, Usage,
    SYMBOL_CACHE_SCHEMA_VERSION,
};
use sable_scheduler::{ProgressReceiver, Scheduler, SchedulerConfig};
use sable_syntax::{ClasspathIndex, FrontEnd};
use sable_vfs::{ChangeEvent, SourceRegistry, SOURCE_EXTENSION};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// The source-intelligence engine for one project.
///
/// Mutations go to the registry and return as soon as the affected files are
/// queued. Queries never wait: they answer from the last published index
/// snapshot, which may lag behind pending changes while
/// [`Engine::is_indexing`] is true.
pub struct Engine {
    config: EngineConfig,
    registry: Arc<SourceRegistry>,
    changes: Receiver<ChangeEvent>,
    index: Arc<SymbolIndex>,
    front_end: Arc<FrontEnd>,
    scheduler: Scheduler,
    pipeline: Pipeline,
    project: RwLock<ProjectDescription>,
    search: Mutex<Option<Arc<SymbolSearchIndex>>>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("files", &self.registry.len())
            .field("generation", &self.index.generation())
            .field("pipeline", &self.pipeline)
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// An engine with no project loaded and no persistent cache.
    ///
    /// Installs the configured tracing subscriber unless one is already set.
    pub fn new(config: EngineConfig) -> Self {
        sable_config::init_tracing(&config.logging);

        let registry = Arc::new(SourceRegistry::new());
        let changes = registry.subscribe();
        let index = Arc::new(SymbolIndex::new());
        let front_end = Arc::new(FrontEnd::default());
        let scheduler = Scheduler::new(
            SchedulerConfig::default().with_compute_threads(config.indexing.compute_threads),
        );
        let pipeline = Pipeline::new(PipelineParts {
            registry: Arc::clone(&registry),
            front_end: Arc::clone(&front_end),
            index: Arc::clone(&index),
            scheduler: scheduler.clone(),
            settings: config.indexing.clone(),
        });

        tracing::info!(
            target: "sable.engine",
            compute_threads = scheduler.compute_threads(),
            cache = config.cache.enabled,
            "engine started"
        );

        Self {
            config,
            registry,
            changes,
            index,
            front_end,
            scheduler,
            pipeline,
            project: RwLock::new(ProjectDescription::default()),
            search: Mutex::new(None),
        }
    }

    /// An engine with `project` loaded; indexing starts in the background.
    pub fn load(config: EngineConfig, project: ProjectDescription) -> Result<Self> {
        let engine = Self::new(config);
        engine.reload_project(project)?;
        Ok(engine)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn project(&self) -> ProjectDescription {
        self.project.read().clone()
    }

    /// Applies a new project description.
    ///
    /// The classpath and language level are replaced, files already known are
    /// re-attributed against them, and every source root is scanned. Roots
    /// are additive: files under a root that is no longer listed stay
    /// registered until removed.
    pub fn reload_project(&self, project: ProjectDescription) -> Result<()> {
        self.front_end.set_language_level(project.language_level);
        self.pipeline
            .set_classpath(Arc::new(ClasspathIndex::build_lenient(&project.classpath)));
        self.pipeline.set_cache(self.open_cache(&project));

        let known = self.registry.paths();
        if !known.is_empty() {
            self.pipeline.schedule_batch(known, Trigger::Dependency);
        }

        for root in &project.source_roots {
            self.registry
                .register_root(root)
                .with_context(|| format!("failed to register source root {}", root.display()))?;
        }
        let scheduled = self.drain_changes();

        tracing::info!(
            target: "sable.engine",
            roots = project.source_roots.len(),
            classpath = project.classpath.len(),
            scheduled,
            "project loaded"
        );
        *self.project.write() = project;
        Ok(())
    }

    fn open_cache(&self, project: &ProjectDescription) -> Option<CacheStore> {
        if !self.config.cache.enabled {
            return None;
        }
        let root = project.source_roots.first()?;
        let opened = CacheDir::new(root, self.config.cache.dir.clone())
            .and_then(|dir| CacheStore::open(dir.symbols_dir(), SYMBOL_CACHE_SCHEMA_VERSION));
        match opened {
            Ok(store) => {
                if let StoreStatus::Rebuilt { found } = store.status() {
                    tracing::info!(
                        target: "sable.engine",
                        found = ?found,
                        expected = SYMBOL_CACHE_SCHEMA_VERSION,
                        "symbol cache rebuilt for a new schema"
                    );
                }
                Some(store)
            }
            Err(err) => {
                tracing::warn!(
                    target: "sable.engine",
                    root = %root.display(),
                    error = %err,
                    "symbol cache unavailable; continuing without it"
                );
                None
            }
        }
    }

    /// Queues every file the registry reported since the last call.
    fn drain_changes(&self) -> usize {
        let paths: Vec<PathBuf> = self.changes.try_iter().map(|event| event.path).collect();
        let count = paths.len();
        if count > 0 {
            self.pipeline.schedule_batch(paths, Trigger::Content);
        }
        count
    }

    /// Registers a source root and queues every file below it. Returns how
    /// many files were added or changed.
    pub fn register_root(&self, root: impl AsRef<Path>) -> Result<usize> {
        let root = root.as_ref();
        self.registry
            .register_root(root)
            .with_context(|| format!("failed to register source root {}", root.display()))?;
        Ok(self.drain_changes())
    }

    /// Sets the text of a file, creating it if needed. Returns its version.
    pub fn open(&self, path: impl AsRef<Path>, text: impl Into<Arc<str>>) -> Result<u64> {
        let path = path.as_ref();
        anyhow::ensure!(
            path.extension().is_some_and(|ext| ext == SOURCE_EXTENSION),
            "not a .{SOURCE_EXTENSION} source file: {}",
            path.display()
        );
        let version = self.registry.open(path, text);
        self.drain_changes();
        Ok(version)
    }

    /// Replaces the text of an open file. Returns its new version.
    pub fn edit(&self, path: impl AsRef<Path>, text: impl Into<Arc<str>>) -> Result<u64> {
        let path = path.as_ref();
        let version = self
            .registry
            .edit(path, text)
            .with_context(|| format!("failed to edit {}", path.display()))?;
        self.drain_changes();
        Ok(version)
    }

    /// Forgets a file. Returns whether it was registered.
    pub fn remove(&self, path: impl AsRef<Path>) -> bool {
        let removed = self.registry.remove(path);
        self.drain_changes();
        removed
    }

    pub fn snapshot(&self) -> Arc<IndexSnapshot> {
        self.index.snapshot()
    }

    /// Symbols whose simple name or FQN is exactly `name`.
    pub fn find_symbol(&self, name: &str) -> Vec<Symbol> {
        self.index.snapshot().query(name)
    }

    /// Completions at `offset` in `path`.
    ///
    /// An empty `prefix` is taken from the identifier that ends at `offset`
    /// in the file's current text.
    pub fn completions_at(
        &self,
        path: impl AsRef<Path>,
        offset: TextSize,
        prefix: &str,
    ) -> Vec<CompletionItem> {
        let path = normalize_path(path);
        let text = self.registry.file(&path).map(|file| file.text);
        let prefix = match (&text, prefix.is_empty()) {
            (Some(text), true) => partial_identifier(text, usize::from(offset)),
            _ => prefix,
        };

        let snapshot = self.index.snapshot();
        let classpath = self.pipeline.classpath();
        complete(&CompletionRequest {
            snapshot: &snapshot,
            classpath: &classpath,
            path: &path,
            offset,
            prefix,
            text: text.as_deref(),
        })
    }

    /// Diagnostics of the last completed analysis of `path`.
    pub fn diagnostics_for(&self, path: impl AsRef<Path>) -> Vec<Diagnostic> {
        let path = normalize_path(path);
        self.index
            .snapshot()
            .file_diagnostics(&path)
            .map(<[Diagnostic]>::to_vec)
            .unwrap_or_default()
    }

    pub fn go_to_declaration(&self, path: impl AsRef<Path>, offset: TextSize) -> Vec<Symbol> {
        let path = normalize_path(path);
        navigation::go_to_declaration(&self.index.snapshot(), &path, offset)
    }

    /// Fuzzy workspace-symbol search. The search index is rebuilt lazily
    /// whenever the snapshot generation moved.
    pub fn search_symbols(&self, query: &str, limit: usize) -> Vec<SearchResult> {
        let snapshot = self.index.snapshot();
        let search = {
            let mut cached = self.search.lock();
            match cached.as_ref() {
                Some(search) if search.generation() == snapshot.generation() => Arc::clone(search),
                _ => {
                    let built = Arc::new(SymbolSearchIndex::build(&snapshot));
                    *cached = Some(Arc::clone(&built));
                    built
                }
            }
        };
        search.search(query, limit)
    }

    pub fn usages(&self, fqn: &str) -> Vec<Usage> {
        self.index.snapshot().usages(fqn)
    }

    /// Direct subtypes of `fqn` declared in the project.
    pub fn subtypes(&self, fqn: &str) -> Vec<SmolStr> {
        self.index.snapshot().subtypes(fqn)
    }

    pub fn file_phase(&self, path: impl AsRef<Path>) -> Option<FilePhase> {
        self.pipeline.phase(&normalize_path(path))
    }

    pub fn progress(&self) -> IndexingProgress {
        self.pipeline.progress()
    }

    pub fn is_indexing(&self) -> bool {
        self.pipeline.is_indexing()
    }

    /// Work-done events for indexing sessions.
    pub fn subscribe_progress(&self) -> ProgressReceiver {
        self.scheduler.subscribe_progress()
    }

    /// Blocks until every queued analysis finished or `timeout` passed.
    /// Returns whether the engine is idle.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        self.pipeline.wait_idle(timeout)
    }

    /// Runs `callback` once no analysis is pending: immediately when idle,
    /// otherwise on a background worker after the queue drains.
    pub fn run_when_smart(&self, callback: impl FnOnce() + Send + 'static) {
        self.pipeline.run_when_smart(callback);
    }
}
