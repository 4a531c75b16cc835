mod cache;
mod completion;
mod invalidation;
mod navigation;
mod scenarios;

use sable_engine::{Engine, EngineConfig, TextSize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub(crate) const SETTLE_TIMEOUT: Duration = Duration::from_secs(30);

/// In-memory engine: no persistent cache.
pub(crate) fn engine() -> Engine {
    Engine::new(config())
}

pub(crate) fn config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.cache.enabled = false;
    config.indexing.compute_threads = 2;
    config
}

pub(crate) fn cached_config(cache_dir: &Path) -> EngineConfig {
    let mut config = config();
    config.cache.enabled = true;
    config.cache.dir = Some(cache_dir.to_path_buf());
    config
}

pub(crate) fn src(name: &str) -> PathBuf {
    PathBuf::from(format!("/project/src/{name}"))
}

pub(crate) fn settle(engine: &Engine) {
    assert!(
        engine.wait_idle(SETTLE_TIMEOUT),
        "engine still indexing: {:?}",
        engine.progress()
    );
}

/// Opens every `(name, text)` pair and waits for the analyses.
pub(crate) fn open_all(engine: &Engine, files: &[(&str, &str)]) -> Vec<PathBuf> {
    let paths = files
        .iter()
        .map(|(name, text)| {
            let path = src(name);
            engine.open(&path, *text).expect("open");
            path
        })
        .collect();
    settle(engine);
    paths
}

pub(crate) fn write_files(root: &Path, files: &[(&str, &str)]) {
    for (name, text) in files {
        let path = root.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create dirs");
        }
        std::fs::write(path, text).expect("write source");
    }
}

pub(crate) fn offset_of(text: &str, needle: &str) -> TextSize {
    let idx = text.find(needle).expect("needle present");
    TextSize::from(idx as u32)
}
