//! Project & source registry: the ground truth for which source files exist
//! and what their current text is.

mod change;
mod error;
mod registry;
mod snapshot;
mod source_file;

pub use change::{ChangeEvent, FileChangeKind};
pub use error::{RegistryError, Result};
pub use registry::SourceRegistry;
pub use snapshot::{RegistrySnapshot, SnapshotDiff, SnapshotEntry};
pub use source_file::FileSnapshot;

/// File extension of the sources picked up by [`SourceRegistry::register_root`].
pub const SOURCE_EXTENSION: &str = "java";
