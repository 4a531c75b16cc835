use crate::change::{ChangeEvent, FileChangeKind};
use crate::error::{RegistryError, Result};
use crate::snapshot::{RegistrySnapshot, SnapshotEntry};
use crate::source_file::{FileSnapshot, SourceFile};
use crate::SOURCE_EXTENSION;
use crossbeam_channel::{Receiver, Sender};
use sable_core::{normalize_path, Fingerprint};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Default)]
struct Inner {
    roots: Vec<PathBuf>,
    files: BTreeMap<PathBuf, SourceFile>,
    /// Last version of removed files, so a re-created file keeps counting up.
    tombstones: HashMap<PathBuf, u64>,
}

/// Set of source roots and source files with their current text.
///
/// All operations run on the caller's thread and only hold the internal lock
/// for the duration of a map update. Every mutation bumps the file version
/// and is broadcast as a [`ChangeEvent`] to subscribers; nothing here waits
/// for analysis.
#[derive(Debug, Default)]
pub struct SourceRegistry {
    inner: RwLock<Inner>,
    subscribers: Mutex<Vec<Sender<ChangeEvent>>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    #[track_caller]
    fn read_inner(&self) -> RwLockReadGuard<'_, Inner> {
        match self.inner.read() {
            Ok(guard) => guard,
            Err(err) => {
                let loc = std::panic::Location::caller();
                tracing::error!(
                    target: "sable.vfs",
                    file = loc.file(),
                    line = loc.line(),
                    column = loc.column(),
                    error = %err,
                    "rwlock poisoned; continuing with recovered guard"
                );
                err.into_inner()
            }
        }
    }

    #[track_caller]
    fn write_inner(&self) -> RwLockWriteGuard<'_, Inner> {
        match self.inner.write() {
            Ok(guard) => guard,
            Err(err) => {
                let loc = std::panic::Location::caller();
                tracing::error!(
                    target: "sable.vfs",
                    file = loc.file(),
                    line = loc.line(),
                    column = loc.column(),
                    error = %err,
                    "rwlock poisoned; continuing with recovered guard"
                );
                err.into_inner()
            }
        }
    }

    fn lock_subscribers(&self) -> MutexGuard<'_, Vec<Sender<ChangeEvent>>> {
        self.subscribers
            .lock()
            .unwrap_or_else(|err| err.into_inner())
    }

    /// Returns a receiver for every subsequent mutation.
    pub fn subscribe(&self) -> Receiver<ChangeEvent> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.lock_subscribers().push(tx);
        rx
    }

    fn emit(&self, events: Vec<ChangeEvent>) {
        if events.is_empty() {
            return;
        }
        let mut subscribers = self.lock_subscribers();
        subscribers.retain(|tx| events.iter().all(|event| tx.send(event.clone()).is_ok()));
    }

    /// Registers `root` and loads every source file below it from disk.
    ///
    /// Returns the paths that were added or whose text changed.
    pub fn register_root(&self, root: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
        let root = normalize_path(root);
        if !root.is_dir() {
            return Err(RegistryError::NotADirectory(root));
        }

        let mut loaded = Vec::new();
        for entry in walkdir::WalkDir::new(&root).sort_by_file_name() {
            let entry = entry.map_err(|source| RegistryError::Walk {
                root: root.clone(),
                source,
            })?;
            let path = entry.path();
            if !entry.file_type().is_file()
                || path.extension().is_none_or(|ext| ext != SOURCE_EXTENSION)
            {
                continue;
            }
            let bytes = std::fs::read(path).map_err(|source| RegistryError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            let text: Arc<str> = String::from_utf8_lossy(&bytes).into();
            loaded.push((normalize_path(path), text));
        }

        let mut events = Vec::new();
        let mut changed = Vec::new();
        {
            let mut inner = self.write_inner();
            if !inner.roots.contains(&root) {
                inner.roots.push(root.clone());
            }
            for (path, text) in loaded {
                if let Some(existing) = inner.files.get(&path) {
                    if existing.text == text {
                        continue;
                    }
                }
                let event = insert_text(&mut inner, path.clone(), text);
                changed.push(path);
                events.push(event);
            }
        }

        tracing::debug!(
            target: "sable.vfs",
            root = %root.display(),
            files = changed.len(),
            "registered source root"
        );
        self.emit(events);
        Ok(changed)
    }

    /// Inserts or replaces the text of `path`. Returns the new version.
    pub fn open(&self, path: impl AsRef<Path>, text: impl Into<Arc<str>>) -> u64 {
        let path = normalize_path(path);
        let event = {
            let mut inner = self.write_inner();
            insert_text(&mut inner, path, text.into())
        };
        let version = event.version;
        self.emit(vec![event]);
        version
    }

    /// Replaces the text of an already registered file. Returns the new version.
    pub fn edit(&self, path: impl AsRef<Path>, text: impl Into<Arc<str>>) -> Result<u64> {
        let path = normalize_path(path);
        let event = {
            let mut inner = self.write_inner();
            if !inner.files.contains_key(&path) {
                return Err(RegistryError::UnknownFile(path));
            }
            insert_text(&mut inner, path, text.into())
        };
        let version = event.version;
        self.emit(vec![event]);
        Ok(version)
    }

    /// Drops `path`. Returns whether it was registered.
    pub fn remove(&self, path: impl AsRef<Path>) -> bool {
        let path = normalize_path(path);
        let removed = {
            let mut inner = self.write_inner();
            let removed = inner.files.remove(&path);
            if let Some(file) = &removed {
                inner.tombstones.insert(path.clone(), file.version);
            }
            removed
        };
        match removed {
            Some(file) => {
                self.emit(vec![ChangeEvent {
                    path,
                    kind: FileChangeKind::Deleted,
                    version: file.version,
                }]);
                true
            }
            None => false,
        }
    }

    /// Forgets the last version of a removed `path` once nothing can still
    /// hold an analysis of it. A later re-creation starts again at version 1.
    pub fn release_tombstone(&self, path: &Path) {
        let mut inner = self.write_inner();
        if !inner.files.contains_key(path) {
            inner.tombstones.remove(path);
        }
    }

    /// Consistent view of every file's fingerprint and version.
    ///
    /// Fingerprints not yet computed are hashed here and memoized until the
    /// next mutation of that file.
    pub fn snapshot(&self) -> RegistrySnapshot {
        let inner = self.read_inner();
        RegistrySnapshot::new(
            inner
                .files
                .iter()
                .map(|(path, file)| {
                    (
                        path.clone(),
                        SnapshotEntry {
                            fingerprint: file.fingerprint().clone(),
                            version: file.version,
                        },
                    )
                })
                .collect(),
        )
    }

    pub fn file(&self, path: &Path) -> Option<FileSnapshot> {
        let inner = self.read_inner();
        let file = inner.files.get(path)?;
        Some(FileSnapshot {
            path: path.to_path_buf(),
            text: Arc::clone(&file.text),
            version: file.version,
            fingerprint: file.fingerprint().clone(),
            last_analyzed: file.last_analyzed.clone(),
        })
    }

    /// Records that analysis of `version` (with `fingerprint`) completed.
    ///
    /// Ignored if the file is gone or the record would move backwards.
    pub fn set_last_analyzed(&self, path: &Path, fingerprint: Fingerprint, version: u64) {
        let mut inner = self.write_inner();
        if let Some(file) = inner.files.get_mut(path) {
            let is_newer = file
                .last_analyzed
                .as_ref()
                .is_none_or(|(_, prev_version)| *prev_version <= version);
            if is_newer {
                file.last_analyzed = Some((fingerprint, version));
            }
        }
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.read_inner().files.contains_key(path)
    }

    pub fn roots(&self) -> Vec<PathBuf> {
        self.read_inner().roots.clone()
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.read_inner().files.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.read_inner().files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_inner().files.is_empty()
    }

    /// Number of files whose fingerprint is currently memoized.
    pub fn cached_fingerprint_count(&self) -> usize {
        self.read_inner()
            .files
            .values()
            .filter(|file| file.has_cached_fingerprint())
            .count()
    }
}

fn insert_text(inner: &mut Inner, path: PathBuf, text: Arc<str>) -> ChangeEvent {
    let (file, kind) = match inner.files.get(&path) {
        Some(existing) => (existing.replaced(text), FileChangeKind::Modified),
        None => {
            let version = inner.tombstones.remove(&path).map_or(1, |last| last + 1);
            (SourceFile::new(text, version), FileChangeKind::Created)
        }
    };
    let version = file.version;
    inner.files.insert(path.clone(), file);
    ChangeEvent {
        path,
        kind,
        version,
    }
}
