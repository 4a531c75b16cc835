use sable_core::normalize_path;
use sable_vfs::{FileChangeKind, SourceRegistry};

#[test]
fn every_mutation_is_broadcast() {
    let tmp = tempfile::tempdir().unwrap();
    let path = normalize_path(tmp.path().join("A.java"));
    let registry = SourceRegistry::new();
    let events = registry.subscribe();

    registry.open(&path, "class A {}");
    registry.edit(&path, "class A { }").unwrap();
    registry.remove(&path);

    let received: Vec<_> = events.try_iter().collect();
    let kinds: Vec<_> = received.iter().map(|e| (e.kind, e.version)).collect();
    assert_eq!(
        kinds,
        vec![
            (FileChangeKind::Created, 1),
            (FileChangeKind::Modified, 2),
            (FileChangeKind::Deleted, 2),
        ]
    );
    assert!(received.iter().all(|e| e.path == path));
}

#[test]
fn dropped_subscribers_do_not_block_mutations() {
    let tmp = tempfile::tempdir().unwrap();
    let path = normalize_path(tmp.path().join("A.java"));
    let registry = SourceRegistry::new();

    drop(registry.subscribe());
    let live = registry.subscribe();

    registry.open(&path, "class A {}");
    registry.open(&path, "class A {} ");
    assert_eq!(live.try_iter().count(), 2);
}
