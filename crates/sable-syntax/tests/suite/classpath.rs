use pretty_assertions::assert_eq;
use sable_syntax::{ClasspathEntry, ClasspathError, ClasspathIndex, TypeLookup};
use std::io::Write;
use std::path::Path;

fn touch(path: &Path) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, b"\xCA\xFE\xBA\xBE").unwrap();
}

#[test]
fn class_directories_contribute_source_names() {
    let tmp = tempfile::tempdir().unwrap();
    let classes = tmp.path().join("classes");
    touch(&classes.join("com/acme/Widget.class"));
    touch(&classes.join("com/acme/Widget$Part.class"));
    touch(&classes.join("com/acme/Widget$1.class"));
    touch(&classes.join("com/acme/package-info.class"));
    touch(&classes.join("com/acme/notes.txt"));

    let entry = ClasspathEntry::from_path(&classes).unwrap();
    let index = ClasspathIndex::build(&[entry]).unwrap();

    assert!(index.contains_type("com.acme.Widget"));
    assert!(index.contains_type("com.acme.Widget.Part"));
    assert!(index.contains_package("com.acme"));
    assert!(!index.contains_type("com.acme.package-info"));
    assert_eq!(
        index.types().filter(|t| t.starts_with("com.acme")).count(),
        2
    );
    // Builtins are always present.
    assert!(index.contains_type("java.lang.Object"));
}

#[test]
fn jars_are_listed_without_reading_classes() {
    let tmp = tempfile::tempdir().unwrap();
    let jar = tmp.path().join("lib.jar");
    {
        let file = std::fs::File::create(&jar).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Stored);
        for name in [
            "META-INF/MANIFEST.MF",
            "org/lib/Parser.class",
            "org/lib/Parser$Event.class",
            "module-info.class",
        ] {
            writer.start_file(name, options).unwrap();
            writer.write_all(b"x").unwrap();
        }
        writer.finish().unwrap();
    }

    let mut index = ClasspathIndex::new();
    let added = index
        .add_entry(&ClasspathEntry::from_path(&jar).unwrap())
        .unwrap();
    assert_eq!(added, 2);
    assert!(index.contains_type("org.lib.Parser"));
    assert!(index.contains_type("org.lib.Parser.Event"));
    assert!(index.contains_package("org.lib"));
    assert!(!index.contains_type("java.lang.Object"));
}

#[test]
fn unreadable_entries_fail_strictly_and_are_skipped_leniently() {
    let tmp = tempfile::tempdir().unwrap();
    let bogus = tmp.path().join("broken.jar");
    std::fs::write(&bogus, b"not a zip").unwrap();

    let entry = ClasspathEntry::from_path(&bogus).unwrap();
    assert!(matches!(
        ClasspathIndex::build(&[entry]),
        Err(ClasspathError::Zip(_))
    ));
    assert!(matches!(
        ClasspathEntry::from_path(tmp.path().join("lib.so")),
        Err(ClasspathError::Unsupported(_))
    ));

    let lenient = ClasspathIndex::build_lenient(&[bogus, tmp.path().join("missing.jar")]);
    assert_eq!(lenient.len(), ClasspathIndex::with_builtins().len());
}
