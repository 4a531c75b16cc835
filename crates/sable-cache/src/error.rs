pub type Result<T> = std::result::Result<T, CacheError>;

/// Errors produced while managing the on-disk store.
///
/// Record-level problems (missing, stale or corrupt records) are not errors;
/// they surface as [`crate::CacheLookup::Miss`].
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("failed to determine home directory for default cache path")]
    MissingHomeDir,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("bincode error: {0}")]
    Bincode(#[from] bincode::Error),
}
