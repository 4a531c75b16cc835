use crate::errors::collect_syntax_errors;
use crate::lower::lower;
use crate::tree::{offset, parse_java};
use crate::unit::SyntaxUnit;
use parking_lot::{Mutex, RwLock};
use sable_core::{Diagnostic, Fingerprint, LanguageLevel, TextRange};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Parses `text` into a [`SyntaxUnit`]. Never fails: a file the parser
/// cannot handle at all yields an empty unit with one syntax error.
pub fn parse(
    path: impl Into<PathBuf>,
    text: &str,
    fingerprint: Fingerprint,
    level: LanguageLevel,
) -> SyntaxUnit {
    let mut unit = SyntaxUnit::empty(path.into(), fingerprint, level);
    match parse_java(text) {
        Ok(tree) => {
            let root = tree.root_node();
            lower(&mut unit, text, root);
            collect_syntax_errors(text, root, &mut unit.diagnostics);
        }
        Err(err) => {
            tracing::warn!(
                target: "sable.syntax",
                path = %unit.path.display(),
                error = %err,
                "parser produced no tree"
            );
            unit.diagnostics.push(Diagnostic::syntax_error(
                TextRange::up_to(offset(text.len())),
                format!("file could not be parsed: {err}"),
            ));
        }
    }
    unit
}

/// Parse entry point with a per-path cache of the latest unit.
///
/// A cached unit is reused only while its fingerprint equals the requested
/// one; any other fingerprint replaces it.
#[derive(Debug, Default)]
pub struct FrontEnd {
    language_level: RwLock<LanguageLevel>,
    units: Mutex<HashMap<PathBuf, Arc<SyntaxUnit>>>,
}

impl FrontEnd {
    pub fn new(language_level: LanguageLevel) -> Self {
        Self {
            language_level: RwLock::new(language_level),
            units: Mutex::new(HashMap::new()),
        }
    }

    pub fn language_level(&self) -> LanguageLevel {
        *self.language_level.read()
    }

    /// Changes the language level and drops every cached unit.
    pub fn set_language_level(&self, level: LanguageLevel) {
        let mut current = self.language_level.write();
        if *current != level {
            *current = level;
            self.units.lock().clear();
        }
    }

    /// Uncached parse at the current language level.
    pub fn parse(&self, path: &Path, text: &str, fingerprint: Fingerprint) -> Arc<SyntaxUnit> {
        Arc::new(parse(path, text, fingerprint, self.language_level()))
    }

    pub fn parse_cached(
        &self,
        path: &Path,
        text: &str,
        fingerprint: &Fingerprint,
    ) -> Arc<SyntaxUnit> {
        if let Some(unit) = self.units.lock().get(path) {
            if &unit.fingerprint == fingerprint {
                return Arc::clone(unit);
            }
        }

        // Parse outside the lock; a concurrent parse of the same path simply
        // races to insert an equivalent unit.
        let unit = self.parse(path, text, fingerprint.clone());
        self.units
            .lock()
            .insert(path.to_path_buf(), Arc::clone(&unit));
        unit
    }

    pub fn cached(&self, path: &Path) -> Option<Arc<SyntaxUnit>> {
        self.units.lock().get(path).cloned()
    }

    pub fn evict(&self, path: &Path) -> bool {
        self.units.lock().remove(path).is_some()
    }

    pub fn clear(&self) {
        self.units.lock().clear();
    }

    pub fn cached_len(&self) -> usize {
        self.units.lock().len()
    }
}
