use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Point-in-time view of the recompute queue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexingProgress {
    /// Files waiting for a worker.
    pub queued: usize,
    /// Files being analyzed right now.
    pub running: usize,
    /// Analyses finished since the engine started, including skipped and
    /// removed files.
    pub completed: u64,
    /// Analyses answered from the persistent cache.
    pub cache_hits: u64,
    /// The file most recently handed to a worker, while indexing.
    pub current_path: Option<PathBuf>,
}

impl IndexingProgress {
    /// Queries answered now may be missing the effects of pending changes.
    pub fn is_indexing(&self) -> bool {
        self.queued > 0 || self.running > 0
    }
}
