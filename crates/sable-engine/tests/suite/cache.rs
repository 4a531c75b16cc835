use super::{cached_config, config, settle, write_files};
use pretty_assertions::assert_eq;
use sable_engine::{DiagnosticKind, Engine, ProjectDescription};
use sable_cache::{CacheDir, CacheLookup, CacheStore, MissReason};
use sable_core::normalize_path;
use sable_index::{FileSymbols, SYMBOL_CACHE_SCHEMA_VERSION};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

const FILES: &[(&str, &str)] = &[
    ("p/Model.java", "package p; public class Model { int id; }"),
    ("p/Service.java", "package p; class Service extends Model { Model load() { return null; } }"),
    ("p/App.java", "package p; import java.util.List; class App { Service s; List<Model> all; }"),
];

fn load(config: sable_engine::EngineConfig, root: &Path) -> Engine {
    let engine = Engine::load(config, ProjectDescription::default().with_source_root(root))
        .expect("load project");
    settle(&engine);
    engine
}

fn indexed(engine: &Engine) -> BTreeMap<PathBuf, FileSymbols> {
    let snapshot = engine.snapshot();
    snapshot
        .paths()
        .map(|path| {
            let entry = snapshot.file(path).expect("indexed path");
            (path.to_path_buf(), entry.symbols.clone())
        })
        .collect()
}

#[test]
fn warm_start_matches_a_cold_analysis() {
    let project = tempfile::tempdir().expect("project dir");
    let cache = tempfile::tempdir().expect("cache dir");
    write_files(project.path(), FILES);

    let cold = load(cached_config(cache.path()), project.path());
    let cold_symbols = indexed(&cold);
    assert_eq!(cold_symbols.len(), 3);
    assert!(cold_symbols.values().all(|symbols| symbols.unresolved.is_empty()));
    drop(cold);

    let warm = load(cached_config(cache.path()), project.path());
    assert_eq!(warm.progress().cache_hits, 3);
    assert_eq!(warm.progress().completed, 3);
    assert_eq!(indexed(&warm), cold_symbols);

    let uncached = load(config(), project.path());
    assert_eq!(uncached.progress().cache_hits, 0);
    assert_eq!(indexed(&uncached), cold_symbols);
}

#[test]
fn warm_start_rebinds_files_whose_dependency_changed_on_disk() {
    let project = tempfile::tempdir().expect("project dir");
    let cache = tempfile::tempdir().expect("cache dir");
    write_files(
        project.path(),
        &[
            ("p/Base.java", "package p; public class Base {}"),
            ("p/User.java", "package p; class User { Base b; }"),
        ],
    );
    drop(load(cached_config(cache.path()), project.path()));

    write_files(project.path(), &[("p/Base.java", "package p; public class Renamed {}")]);
    let warm = load(cached_config(cache.path()), project.path());
    let uncached = load(config(), project.path());
    assert_eq!(indexed(&warm), indexed(&uncached));

    let user = normalize_path(project.path().join("p/User.java"));
    let unresolved: Vec<_> = warm
        .diagnostics_for(&user)
        .into_iter()
        .filter(|diagnostic| diagnostic.kind == DiagnosticKind::UnresolvedSymbol)
        .collect();
    assert_eq!(unresolved.len(), 1);
    assert!(warm.usages("p.Base").is_empty());
}

#[test]
fn edited_content_misses_the_cache() {
    let project = tempfile::tempdir().expect("project dir");
    let cache = tempfile::tempdir().expect("cache dir");
    write_files(project.path(), FILES);
    drop(load(cached_config(cache.path()), project.path()));

    write_files(
        project.path(),
        &[("p/Model.java", "package p; public class Model { long id; String name; }")],
    );
    let engine = load(cached_config(cache.path()), project.path());

    assert!(engine.progress().cache_hits < 3);
    assert_eq!(engine.find_symbol("name").len(), 1);
}

#[test]
fn removed_files_leave_the_cache() {
    let project = tempfile::tempdir().expect("project dir");
    let cache = tempfile::tempdir().expect("cache dir");
    write_files(project.path(), FILES);

    let engine = load(cached_config(cache.path()), project.path());
    let app = normalize_path(project.path().join("p/App.java"));
    let store = CacheDir::new(project.path(), Some(cache.path().to_path_buf()))
        .and_then(|dir| CacheStore::open(dir.symbols_dir(), SYMBOL_CACHE_SCHEMA_VERSION))
        .expect("open store");
    assert!(store.load::<FileSymbols>(&app).is_hit());

    assert!(engine.remove(&app));
    settle(&engine);
    assert!(engine.find_symbol("App").is_empty());
    assert_eq!(
        store.load::<FileSymbols>(&app),
        CacheLookup::Miss(MissReason::Absent)
    );
}
