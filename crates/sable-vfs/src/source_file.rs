use sable_core::Fingerprint;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

/// Registry-owned state for one file.
///
/// A mutation replaces the whole value, which also discards the memoized
/// fingerprint.
#[derive(Debug)]
pub(crate) struct SourceFile {
    pub(crate) text: Arc<str>,
    pub(crate) version: u64,
    fingerprint: OnceLock<Fingerprint>,
    pub(crate) last_analyzed: Option<(Fingerprint, u64)>,
}

impl SourceFile {
    pub(crate) fn new(text: Arc<str>, version: u64) -> Self {
        Self {
            text,
            version,
            fingerprint: OnceLock::new(),
            last_analyzed: None,
        }
    }

    pub(crate) fn replaced(&self, text: Arc<str>) -> Self {
        Self {
            text,
            version: self.version + 1,
            fingerprint: OnceLock::new(),
            last_analyzed: self.last_analyzed.clone(),
        }
    }

    pub(crate) fn fingerprint(&self) -> &Fingerprint {
        self.fingerprint
            .get_or_init(|| Fingerprint::from_bytes(self.text.as_bytes()))
    }

    pub(crate) fn has_cached_fingerprint(&self) -> bool {
        self.fingerprint.get().is_some()
    }
}

/// Point-in-time copy of one file handed to readers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSnapshot {
    pub path: PathBuf,
    pub text: Arc<str>,
    pub version: u64,
    pub fingerprint: Fingerprint,
    /// Fingerprint and version of the last completed analysis, if any.
    pub last_analyzed: Option<(Fingerprint, u64)>,
}

impl FileSnapshot {
    /// Whether the last completed analysis saw exactly this content.
    pub fn is_analyzed(&self) -> bool {
        self.last_analyzed
            .as_ref()
            .is_some_and(|(fingerprint, _)| fingerprint == &self.fingerprint)
    }
}
