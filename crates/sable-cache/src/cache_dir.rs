use crate::error::{CacheError, Result};
use sable_core::Fingerprint;
use std::path::{Path, PathBuf};

/// Environment variable that overrides the global cache directory.
pub const CACHE_DIR_ENV: &str = "SABLE_CACHE_DIR";

/// Per-project cache directory: `<base>/<fingerprint of canonical project root>`.
#[derive(Clone, Debug)]
pub struct CacheDir {
    project_root: PathBuf,
    project_hash: Fingerprint,
    root: PathBuf,
}

impl CacheDir {
    /// Resolves the directory for `project_root`.
    ///
    /// `base_override` wins over `SABLE_CACHE_DIR`, which wins over
    /// `~/.sable/cache`.
    pub fn new(project_root: impl AsRef<Path>, base_override: Option<PathBuf>) -> Result<Self> {
        let project_root = sable_core::normalize_path(project_root);
        let project_hash = Fingerprint::from_bytes(project_root.to_string_lossy().as_bytes());

        let base = match base_override {
            Some(base) => base,
            None => match std::env::var_os(CACHE_DIR_ENV) {
                Some(dir) if !dir.is_empty() => PathBuf::from(dir),
                _ => default_cache_root()?,
            },
        };

        let root = base.join(project_hash.as_str());
        std::fs::create_dir_all(&root)?;

        Ok(Self {
            project_root,
            project_hash,
            root,
        })
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn project_hash(&self) -> &Fingerprint {
        &self.project_hash
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn symbols_dir(&self) -> PathBuf {
        self.root.join("symbols")
    }
}

fn default_cache_root() -> Result<PathBuf> {
    let home = std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
        .ok_or(CacheError::MissingHomeDir)?;

    Ok(home.join(".sable").join("cache"))
}
