use crate::builtins::BOOT_TYPES;
use sable_core::SmolStr;
use std::collections::{BTreeSet, HashSet};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClasspathError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("failed to walk {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
    #[error("unsupported classpath entry {0}")]
    Unsupported(PathBuf),
}

/// Answers "does this type or package exist?" for attribution.
pub trait TypeLookup {
    /// `fqn` uses source names: `java.util.Map.Entry`.
    fn contains_type(&self, fqn: &str) -> bool;
    fn contains_package(&self, package: &str) -> bool;
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ClasspathEntry {
    ClassDir(PathBuf),
    Jar(PathBuf),
}

impl ClasspathEntry {
    /// Classifies `path` by what is on disk: a directory or a `.jar`/`.zip` archive.
    pub fn from_path(path: impl Into<PathBuf>) -> Result<Self, ClasspathError> {
        let path = path.into();
        if path.is_dir() {
            return Ok(ClasspathEntry::ClassDir(path));
        }
        match path.extension().and_then(OsStr::to_str) {
            Some("jar" | "zip") => Ok(ClasspathEntry::Jar(path)),
            _ => Err(ClasspathError::Unsupported(path)),
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            ClasspathEntry::ClassDir(p) | ClasspathEntry::Jar(p) => p,
        }
    }
}

/// Names of the external types available to a project.
///
/// Only names are read: archives are listed, class files are never opened.
#[derive(Clone, Debug, Default)]
pub struct ClasspathIndex {
    types: BTreeSet<SmolStr>,
    packages: HashSet<SmolStr>,
}

impl ClasspathIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index containing only [`BOOT_TYPES`].
    pub fn with_builtins() -> Self {
        let mut index = Self::new();
        for fqn in BOOT_TYPES {
            index.insert(fqn);
        }
        index
    }

    pub fn build(entries: &[ClasspathEntry]) -> Result<Self, ClasspathError> {
        let mut index = Self::with_builtins();
        for entry in entries {
            index.add_entry(entry)?;
        }
        Ok(index)
    }

    /// Like [`ClasspathIndex::build`], but skips entries that cannot be read.
    pub fn build_lenient(paths: &[PathBuf]) -> Self {
        let mut index = Self::with_builtins();
        for path in paths {
            let added = ClasspathEntry::from_path(path.clone())
                .and_then(|entry| index.add_entry(&entry));
            match added {
                Ok(count) => tracing::debug!(
                    target: "sable.syntax",
                    entry = %path.display(),
                    types = count,
                    "indexed classpath entry"
                ),
                Err(err) => tracing::warn!(
                    target: "sable.syntax",
                    entry = %path.display(),
                    error = %err,
                    "skipping unreadable classpath entry"
                ),
            }
        }
        index
    }

    /// Adds every type of `entry`. Returns how many names were read.
    pub fn add_entry(&mut self, entry: &ClasspathEntry) -> Result<usize, ClasspathError> {
        let names = match entry {
            ClasspathEntry::ClassDir(dir) => class_dir_names(dir)?,
            ClasspathEntry::Jar(path) => jar_names(path)?,
        };
        let count = names.len();
        for name in names {
            self.insert(&name);
        }
        Ok(count)
    }

    pub fn insert(&mut self, fqn: &str) {
        if let Some((package, _)) = split_package(fqn) {
            self.packages.insert(SmolStr::new(package));
        }
        self.types.insert(SmolStr::new(fqn));
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// All type names in lexicographic order.
    pub fn types(&self) -> impl Iterator<Item = &str> {
        self.types.iter().map(SmolStr::as_str)
    }
}

impl TypeLookup for ClasspathIndex {
    fn contains_type(&self, fqn: &str) -> bool {
        self.types.contains(fqn)
    }

    fn contains_package(&self, package: &str) -> bool {
        self.packages.contains(package)
    }
}

/// Project types layered over the classpath.
#[derive(Clone, Copy)]
pub struct ClasspathContext<'a> {
    project: &'a dyn TypeLookup,
    classpath: &'a ClasspathIndex,
}

impl<'a> ClasspathContext<'a> {
    pub fn new(project: &'a dyn TypeLookup, classpath: &'a ClasspathIndex) -> Self {
        Self { project, classpath }
    }
}

impl TypeLookup for ClasspathContext<'_> {
    fn contains_type(&self, fqn: &str) -> bool {
        self.project.contains_type(fqn) || self.classpath.contains_type(fqn)
    }

    fn contains_package(&self, package: &str) -> bool {
        self.project.contains_package(package) || self.classpath.contains_package(package)
    }
}

/// No project types at all.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoProjectTypes;

impl TypeLookup for NoProjectTypes {
    fn contains_type(&self, _fqn: &str) -> bool {
        false
    }

    fn contains_package(&self, _package: &str) -> bool {
        false
    }
}

/// Splits the package (lowercase-by-convention leading segments) from a type
/// name. Nested types keep their outer types in the second half.
fn split_package(fqn: &str) -> Option<(&str, &str)> {
    let last_dot = fqn.rfind('.')?;
    let mut end = 0;
    for (idx, segment) in segment_offsets(fqn) {
        if idx > last_dot || segment.starts_with(|c: char| c.is_ascii_uppercase()) {
            break;
        }
        end = idx + segment.len();
    }
    (end > 0).then(|| (&fqn[..end], &fqn[end + 1..]))
}

fn segment_offsets(fqn: &str) -> impl Iterator<Item = (usize, &str)> {
    fqn.split('.').scan(0, |offset, segment| {
        let start = *offset;
        *offset += segment.len() + 1;
        Some((start, segment))
    })
}

/// `java/util/Map$Entry.class` -> `java.util.Map.Entry`.
///
/// Returns `None` for package/module descriptors, metadata, and anonymous or
/// local classes.
fn class_entry_to_fqn(entry: &str) -> Option<String> {
    let internal = entry.strip_suffix(".class")?;
    if internal.starts_with("META-INF/") {
        return None;
    }
    let simple = internal.rsplit('/').next().unwrap_or(internal);
    if simple == "module-info" || simple == "package-info" {
        return None;
    }
    if simple
        .split('$')
        .skip(1)
        .any(|part| part.is_empty() || part.starts_with(|c: char| c.is_ascii_digit()))
    {
        return None;
    }
    Some(internal.replace(['/', '$'], "."))
}

fn class_dir_names(dir: &Path) -> Result<Vec<String>, ClasspathError> {
    let mut out = Vec::new();
    for entry in walkdir::WalkDir::new(dir).follow_links(false).sort_by_file_name() {
        let entry = entry.map_err(|source| ClasspathError::Walk {
            path: dir.to_path_buf(),
            source,
        })?;
        if !entry.file_type().is_file() || entry.path().extension() != Some(OsStr::new("class"))
        {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(dir) else {
            continue;
        };
        let internal = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        out.extend(class_entry_to_fqn(&internal));
    }
    Ok(out)
}

fn jar_names(path: &Path) -> Result<Vec<String>, ClasspathError> {
    let file = std::fs::File::open(path)?;
    let archive = zip::ZipArchive::new(file)?;
    Ok(archive.file_names().filter_map(class_entry_to_fqn).collect())
}
