use std::path::{Component, Path, PathBuf};

/// Canonical identity for a source path.
///
/// Paths that exist on disk are canonicalized (without `\\?\` prefixes on
/// Windows). Paths that do not exist, such as unsaved in-memory documents,
/// are made absolute against the current directory and lexically
/// normalized so `a/./b/../c` and `a/c` name the same file.
pub fn normalize_path(path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();
    if let Ok(canonical) = dunce::canonicalize(path) {
        return canonical;
    }

    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let mut out = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
