use super::{config, engine, open_all, settle, src, write_files, SETTLE_TIMEOUT};
use pretty_assertions::assert_eq;
use sable_engine::{DiagnosticKind, Engine, FilePhase, ProgressEvent, ProjectDescription};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

fn unresolved_count(engine: &Engine, path: &std::path::Path) -> usize {
    engine
        .diagnostics_for(path)
        .iter()
        .filter(|diagnostic| diagnostic.kind == DiagnosticKind::UnresolvedSymbol)
        .count()
}

#[test]
fn api_change_reanalyzes_dependents() {
    let engine = engine();
    let paths = open_all(
        &engine,
        &[
            ("Base.java", "package p; public class Base {}"),
            ("User.java", "package p; class User { Base b; }"),
        ],
    );
    let (base, user) = (&paths[0], &paths[1]);
    assert_eq!(unresolved_count(&engine, user), 0);
    assert_eq!(engine.usages("p.Base").len(), 1);

    engine
        .edit(base, "package p; public class Renamed {}")
        .expect("edit");
    settle(&engine);
    assert_eq!(unresolved_count(&engine, user), 1);
    assert!(engine.usages("p.Base").is_empty());

    engine
        .edit(base, "package p; public class Base {}")
        .expect("edit");
    settle(&engine);
    assert_eq!(unresolved_count(&engine, user), 0);
    assert_eq!(engine.file_phase(user), Some(FilePhase::Fresh));
}

#[test]
fn body_edits_do_not_touch_dependents() {
    let engine = engine();
    let paths = open_all(
        &engine,
        &[
            ("Base.java", "package p; public class Base { void run() { int a = 1; } }"),
            ("User.java", "package p; class User { Base b; }"),
        ],
    );
    let completed = engine.progress().completed;

    engine
        .edit(&paths[0], "package p; public class Base { void run() { int a = 2; } }")
        .expect("edit");
    settle(&engine);

    // Only the edited file ran again.
    assert_eq!(engine.progress().completed, completed + 1);
}

#[test]
fn waiting_file_resolves_once_its_type_appears() {
    let engine = engine();
    let paths = open_all(&engine, &[("User.java", "package p; class User { Helper h; }")]);
    let user = &paths[0];
    assert_eq!(unresolved_count(&engine, user), 1);

    open_all(&engine, &[("Helper.java", "package p; class Helper {}")]);
    assert_eq!(unresolved_count(&engine, user), 0);
    let usages = engine.usages("p.Helper");
    assert_eq!(usages.len(), 1);
    assert_eq!(&usages[0].path, user);
}

#[test]
fn removing_a_file_drops_its_symbols_and_breaks_dependents() {
    let engine = engine();
    let paths = open_all(
        &engine,
        &[
            ("Base.java", "package p; public class Base {}"),
            ("User.java", "package p; class User { Base b; }"),
        ],
    );

    assert!(engine.remove(&paths[0]));
    settle(&engine);

    assert!(engine.find_symbol("Base").is_empty());
    assert_eq!(engine.file_phase(&paths[0]), None);
    assert_eq!(unresolved_count(&engine, &paths[1]), 1);

    // The analysis of the removal released the old version history.
    let version = engine
        .open(&paths[0], "package p; public class Base {}")
        .expect("open");
    assert_eq!(version, 1);
    settle(&engine);
    assert_eq!(unresolved_count(&engine, &paths[1]), 0);
}

#[test]
fn reanalysis_of_unchanged_content_is_idempotent() {
    let engine = engine();
    let text = "package p; class Same { int f; void g() {} }";
    let paths = open_all(&engine, &[("Same.java", text)]);
    let before = engine.snapshot();

    engine.edit(&paths[0], text).expect("edit");
    settle(&engine);
    let after = engine.snapshot();

    assert_eq!(before.symbols_in_file(&paths[0]), after.symbols_in_file(&paths[0]));
    assert_eq!(before.generation(), after.generation());

    // Without the skip, the file is recomputed but publishes the same set.
    let mut config = config();
    config.indexing.skip_unchanged_files = false;
    let strict = Engine::new(config);
    let paths = open_all(&strict, &[("Same.java", text)]);
    let first = strict.snapshot();
    strict.edit(&paths[0], text).expect("edit");
    settle(&strict);
    assert_eq!(
        first.symbols_in_file(&paths[0]),
        strict.snapshot().symbols_in_file(&paths[0])
    );
}

#[test]
fn rapid_edits_converge_on_the_last_text() {
    let engine = Arc::new(engine());
    let path = src("Churn.java");
    engine.open(&path, "class Churn {}").expect("open");

    let stop = Arc::new(AtomicBool::new(false));
    let reader = {
        let engine = Arc::clone(&engine);
        let stop = Arc::clone(&stop);
        thread::spawn(move || {
            let mut last = 0;
            while !stop.load(Ordering::Relaxed) {
                let generation = engine.snapshot().generation();
                assert!(generation >= last);
                last = generation;
                assert!(engine.find_symbol("Churn").len() <= 1);
            }
        })
    };

    for round in 0..50 {
        let text = format!("class Churn {{ void m{round}() {{}} }}");
        engine.edit(&path, text).expect("edit");
    }
    settle(&engine);
    stop.store(true, Ordering::Relaxed);
    reader.join().expect("reader panicked");

    assert_eq!(engine.find_symbol("m49").len(), 1);
    assert!(engine.find_symbol("m48").is_empty());
    assert_eq!(engine.file_phase(&path), Some(FilePhase::Fresh));
}

#[test]
fn register_root_indexes_every_source_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_files(
        dir.path(),
        &[
            ("p/A.java", "package p; class A { B b; }"),
            ("p/B.java", "package p; class B { C c; }"),
            ("p/C.java", "package p; class C {}"),
            ("README.md", "not java"),
        ],
    );

    let engine = engine();
    let scheduled = engine.register_root(dir.path()).expect("register");
    assert_eq!(scheduled, 3);
    settle(&engine);

    for name in ["A", "B", "C"] {
        assert_eq!(engine.find_symbol(name).len(), 1, "{name}");
    }
    assert!(engine.progress().completed >= 3);
    assert_eq!(engine.progress().current_path, None);
    assert!(engine.register_root(dir.path().join("missing")).is_err());
}

#[test]
fn parallel_batch_binds_a_slow_file_to_a_fast_dependency() {
    let mut big = String::from("package p;\nclass A_Big {\n");
    for i in 0..400 {
        big.push_str(&format!(
            "    Z_Dep dep{i};\n    int m{i}(int x) {{ int y = x + {i}; return y * 2; }}\n"
        ));
    }
    big.push_str("}\n");

    for _ in 0..5 {
        let dir = tempfile::tempdir().expect("tempdir");
        write_files(
            dir.path(),
            &[
                ("p/A_Big.java", big.as_str()),
                ("p/Z_Dep.java", "package p; public class Z_Dep {}"),
            ],
        );

        let mut config = config();
        config.indexing.compute_threads = 4;
        let engine = Engine::new(config);
        engine.register_root(dir.path()).expect("register");
        settle(&engine);

        let big_path = engine.find_symbol("A_Big")[0].path.clone();
        assert_eq!(unresolved_count(&engine, &big_path), 0);
        assert_eq!(engine.usages("p.Z_Dep").len(), 400);
    }
}

#[test]
fn reload_applies_the_classpath_to_known_files() {
    let dir = tempfile::tempdir().expect("tempdir");
    let classes = dir.path().join("classes");
    write_files(&classes, &[("lib/Widget.class", "")]);

    let engine = engine();
    let paths = open_all(
        &engine,
        &[("App.java", "package app; import lib.Widget; class App { Widget w; }")],
    );
    assert!(unresolved_count(&engine, &paths[0]) > 0);

    engine
        .reload_project(ProjectDescription::default().with_classpath_entry(&classes))
        .expect("reload");
    settle(&engine);
    assert_eq!(unresolved_count(&engine, &paths[0]), 0);
}

#[test]
fn smart_callbacks_wait_for_the_queue_to_drain() {
    let engine = engine();
    let (tx, rx) = crossbeam_channel::bounded(1);
    for idx in 0..8 {
        engine
            .open(src(&format!("F{idx}.java")), format!("class F{idx} {{}}"))
            .expect("open");
    }
    engine.run_when_smart(move || {
        let _ = tx.send(());
    });
    rx.recv_timeout(SETTLE_TIMEOUT).expect("callback ran");
    settle(&engine);
    assert_eq!(engine.snapshot().file_count(), 8);
}

#[test]
fn indexing_sessions_report_progress() {
    let engine = engine();
    let mut events = engine.subscribe_progress();
    open_all(&engine, &[("P.java", "class P {}"), ("Q.java", "class Q {}")]);

    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    assert!(matches!(seen.first(), Some(ProgressEvent::Begin { .. })));
    assert!(seen
        .iter()
        .any(|event| matches!(event, ProgressEvent::Report { done, .. } if *done >= 1)));
    assert!(matches!(seen.last(), Some(ProgressEvent::End { .. })));
}
