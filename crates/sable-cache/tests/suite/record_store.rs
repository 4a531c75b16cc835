use pretty_assertions::assert_eq;
use sable_cache::{CacheLookup, CacheStore, MissReason};
use sable_core::Fingerprint;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Payload {
    names: Vec<String>,
    count: u32,
}

fn payload() -> Payload {
    Payload {
        names: vec!["Foo".into(), "Foo.bar".into()],
        count: 2,
    }
}

#[test]
fn store_then_load_round_trips_for_matching_fingerprint() {
    let tmp = tempfile::tempdir().unwrap();
    let store = CacheStore::open(tmp.path(), 1).unwrap();
    let path = Path::new("/project/src/A.java");
    let fp = Fingerprint::from_bytes("class Foo { void bar() {} }");

    store.store(path, &fp, &payload()).unwrap();

    let record = store
        .load_matching::<Payload>(path, &fp)
        .hit()
        .expect("record should load");
    assert_eq!(record.payload, payload());
    assert_eq!(record.fingerprint, fp);
    assert_eq!(record.path, path);
}

#[test]
fn fingerprint_mismatch_is_a_silent_miss() {
    let tmp = tempfile::tempdir().unwrap();
    let store = CacheStore::open(tmp.path(), 1).unwrap();
    let path = Path::new("/project/src/A.java");
    let old = Fingerprint::from_bytes("old");
    let new = Fingerprint::from_bytes("new");

    store.store(path, &old, &payload()).unwrap();

    assert_eq!(
        store.load_matching::<Payload>(path, &new),
        CacheLookup::Miss(MissReason::FingerprintMismatch)
    );
    // The stale record is still available as a hint.
    assert!(store.load::<Payload>(path).is_hit());
}

#[test]
fn missing_record_is_absent() {
    let tmp = tempfile::tempdir().unwrap();
    let store = CacheStore::open(tmp.path(), 1).unwrap();
    assert_eq!(
        store.load::<Payload>(Path::new("/nope/B.java")),
        CacheLookup::Miss(MissReason::Absent)
    );
}

#[test]
fn corrupt_record_is_discarded_and_reported_as_miss() {
    let tmp = tempfile::tempdir().unwrap();
    let store = CacheStore::open(tmp.path(), 1).unwrap();
    let path = Path::new("/project/src/A.java");
    let fp = Fingerprint::from_bytes("text");
    store.store(path, &fp, &payload()).unwrap();

    let records_dir = tmp.path().join("records");
    let record_file = std::fs::read_dir(&records_dir)
        .unwrap()
        .next()
        .unwrap()
        .unwrap()
        .path();
    std::fs::write(&record_file, b"not bincode").unwrap();

    assert_eq!(
        store.load_matching::<Payload>(path, &fp),
        CacheLookup::Miss(MissReason::Corrupt)
    );
    assert!(!record_file.exists(), "corrupt record should be removed");
    assert_eq!(
        store.load_matching::<Payload>(path, &fp),
        CacheLookup::Miss(MissReason::Absent)
    );
}

#[test]
fn payload_type_mismatch_is_corrupt_not_error() {
    let tmp = tempfile::tempdir().unwrap();
    let store = CacheStore::open(tmp.path(), 1).unwrap();
    let path = Path::new("/project/src/A.java");
    let fp = Fingerprint::from_bytes("text");
    store.store(path, &fp, &7u8).unwrap();

    assert_eq!(
        store.load_matching::<Payload>(path, &fp),
        CacheLookup::Miss(MissReason::Corrupt)
    );
}

#[test]
fn remove_and_clear_drop_records() {
    let tmp = tempfile::tempdir().unwrap();
    let store = CacheStore::open(tmp.path(), 1).unwrap();
    let a = Path::new("/p/A.java");
    let b = Path::new("/p/B.java");
    let fp = Fingerprint::from_bytes("x");
    store.store(a, &fp, &payload()).unwrap();
    store.store(b, &fp, &payload()).unwrap();

    assert!(store.remove(a));
    assert!(!store.load::<Payload>(a).is_hit());
    assert!(store.load::<Payload>(b).is_hit());

    store.clear().unwrap();
    assert!(!store.load::<Payload>(b).is_hit());
}

#[test]
fn concurrent_writers_for_distinct_paths_do_not_interfere() {
    let tmp = tempfile::tempdir().unwrap();
    let store = Arc::new(CacheStore::open(tmp.path(), 1).unwrap());

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                let path = format!("/p/File{i}.java");
                let fp = Fingerprint::from_bytes(format!("class File{i} {{}}"));
                let payload = Payload {
                    names: vec![format!("File{i}")],
                    count: i,
                };
                store.store(Path::new(&path), &fp, &payload).unwrap();
                (path, fp, payload)
            })
        })
        .collect();

    for handle in handles {
        let (path, fp, expected) = handle.join().unwrap();
        let record = store
            .load_matching::<Payload>(Path::new(&path), &fp)
            .hit()
            .unwrap();
        assert_eq!(record.payload, expected);
    }
}
