use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Java language level the project targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct LanguageLevel {
    pub major: u16,
    pub preview: bool,
}

impl Default for LanguageLevel {
    fn default() -> Self {
        Self {
            major: 17,
            preview: false,
        }
    }
}

/// Structured description of a project, produced by an external loader.
///
/// The engine consumes this as a fully formed value at open time and on
/// explicit reload; it never reads project configuration files itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectDescription {
    /// Source roots, in priority order.
    pub source_roots: Vec<PathBuf>,
    /// Directories of `.class` files and `.jar` archives.
    pub classpath: Vec<PathBuf>,
    pub language_level: LanguageLevel,
}

impl ProjectDescription {
    pub fn with_source_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.source_roots.push(root.into());
        self
    }

    pub fn with_classpath_entry(mut self, entry: impl Into<PathBuf>) -> Self {
        self.classpath.push(entry.into());
        self
    }
}
