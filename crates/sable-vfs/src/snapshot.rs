use sable_core::Fingerprint;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotEntry {
    pub fingerprint: Fingerprint,
    pub version: u64,
}

/// Consistent, path-ordered view of every registered file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrySnapshot {
    files: BTreeMap<PathBuf, SnapshotEntry>,
}

/// Paths whose content differs between two snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotDiff {
    pub added: Vec<PathBuf>,
    pub modified: Vec<PathBuf>,
    pub removed: Vec<PathBuf>,
}

impl SnapshotDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.removed.is_empty()
    }

    /// All affected paths, in path order.
    pub fn paths(&self) -> Vec<PathBuf> {
        let mut out: Vec<PathBuf> = self
            .added
            .iter()
            .chain(&self.modified)
            .chain(&self.removed)
            .cloned()
            .collect();
        out.sort();
        out
    }
}

impl RegistrySnapshot {
    pub(crate) fn new(files: BTreeMap<PathBuf, SnapshotEntry>) -> Self {
        Self { files }
    }

    pub fn get(&self, path: &Path) -> Option<&SnapshotEntry> {
        self.files.get(path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Path, &SnapshotEntry)> {
        self.files.iter().map(|(path, entry)| (path.as_path(), entry))
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.files.keys().map(PathBuf::as_path)
    }

    /// Compares content fingerprints against an `earlier` snapshot.
    ///
    /// Version-only changes (identical text resubmitted) are not reported.
    pub fn diff(&self, earlier: &RegistrySnapshot) -> SnapshotDiff {
        let mut diff = SnapshotDiff::default();
        for (path, entry) in &self.files {
            match earlier.files.get(path) {
                None => diff.added.push(path.clone()),
                Some(prev) if prev.fingerprint != entry.fingerprint => {
                    diff.modified.push(path.clone())
                }
                Some(_) => {}
            }
        }
        diff.removed = earlier
            .files
            .keys()
            .filter(|path| !self.files.contains_key(*path))
            .cloned()
            .collect();
        diff
    }
}
