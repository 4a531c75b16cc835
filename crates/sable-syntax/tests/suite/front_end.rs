use sable_core::{Fingerprint, LanguageLevel};
use sable_syntax::FrontEnd;
use std::path::Path;
use std::sync::Arc;

#[test]
fn cached_units_are_reused_only_for_the_same_fingerprint() {
    let front_end = FrontEnd::new(LanguageLevel::default());
    let path = Path::new("/project/src/A.java");

    let v1 = "class A {}";
    let fp1 = Fingerprint::from_bytes(v1);
    let first = front_end.parse_cached(path, v1, &fp1);
    let again = front_end.parse_cached(path, v1, &fp1);
    assert!(Arc::ptr_eq(&first, &again));

    let v2 = "class A { void f() {} }";
    let fp2 = Fingerprint::from_bytes(v2);
    let second = front_end.parse_cached(path, v2, &fp2);
    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(second.types[0].members.len(), 1);
    assert_eq!(front_end.cached_len(), 1);

    assert!(front_end.evict(path));
    assert!(front_end.cached(path).is_none());
    assert!(!front_end.evict(path));
}

#[test]
fn changing_the_language_level_drops_cached_units() {
    let front_end = FrontEnd::new(LanguageLevel::default());
    let path = Path::new("/project/src/A.java");
    let fp = Fingerprint::from_bytes("class A {}");
    let unit = front_end.parse_cached(path, "class A {}", &fp);
    assert_eq!(unit.language_level, LanguageLevel::default());

    let level = LanguageLevel {
        major: 21,
        preview: true,
    };
    front_end.set_language_level(level);
    assert_eq!(front_end.cached_len(), 0);
    let reparsed = front_end.parse_cached(path, "class A {}", &fp);
    assert_eq!(reparsed.language_level, level);
}
