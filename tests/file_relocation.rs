use mediamerge::core::db;
use mediamerge::core::error::MigrateError;
use mediamerge::core::relocate::{hash_file, FileRelocator};
use mediamerge::core::store::Store;
use std::fs;
use tempfile::TempDir;

fn test_store(tmp: &TempDir) -> Store {
    let store = Store::new(
        tmp.path().join("data/store.db"),
        tmp.path().join("uploads"),
        tmp.path().join("backups"),
    );
    db::initialize_store(&store).expect("initialize store");
    store
}

fn media_files(store: &Store) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(store.media_dir())
        .expect("read media dir")
        .map(|e| e.expect("entry").file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}

#[test]
fn migrate_copies_files_and_leaves_legacy_in_place() {
    let tmp = TempDir::new().expect("tempdir");
    let store = test_store(&tmp);
    fs::write(store.images_dir().join("a.png"), b"image bytes a").expect("write");
    fs::write(store.images_dir().join("b.png"), b"image bytes b").expect("write");
    fs::write(store.docs_dir().join("c.pdf"), b"document bytes c").expect("write");

    let log = FileRelocator::new(store.clone()).migrate().expect("migrate");
    assert_eq!(log.len(), 3);
    assert!(log.iter().all(|e| e.moved), "fresh run copies everything");

    assert_eq!(media_files(&store), vec!["a.png", "b.png", "c.pdf"]);
    assert!(store.images_dir().join("a.png").exists(), "legacy untouched");
    assert!(store.docs_dir().join("c.pdf").exists(), "legacy untouched");

    let src = hash_file(&store.images_dir().join("a.png")).expect("hash src");
    let dst = hash_file(&store.media_dir().join("a.png")).expect("hash dst");
    assert_eq!(src, dst, "content integrity across the copy");
}

#[test]
fn migrate_rerun_skips_files_already_in_place() {
    let tmp = TempDir::new().expect("tempdir");
    let store = test_store(&tmp);
    fs::write(store.images_dir().join("a.png"), b"image bytes a").expect("write");

    let relocator = FileRelocator::new(store.clone());
    relocator.migrate().expect("first run");
    let log = relocator.migrate().expect("second run");
    assert_eq!(log.len(), 1);
    assert!(!log[0].moved, "identical copy must be skipped, not re-copied");
}

#[test]
fn name_collision_with_different_content_is_corruption() {
    let tmp = TempDir::new().expect("tempdir");
    let store = test_store(&tmp);
    fs::write(store.images_dir().join("a.png"), b"image bytes a").expect("write");
    fs::write(store.media_dir().join("a.png"), b"something else entirely").expect("write");

    let err = FileRelocator::new(store)
        .migrate()
        .expect_err("collision must abort");
    assert!(matches!(err, MigrateError::Corruption(_)), "got {err}");
}

#[test]
fn rollback_after_partial_copy_empties_unified_dir_and_keeps_legacy() {
    let tmp = TempDir::new().expect("tempdir");
    let store = test_store(&tmp);
    fs::write(store.images_dir().join("a.png"), b"image bytes a").expect("write");
    fs::write(store.images_dir().join("b.png"), b"image bytes b").expect("write");
    fs::write(store.docs_dir().join("c.pdf"), b"document bytes c").expect("write");

    // Simulate an interrupted run: only one file made it across.
    fs::copy(
        store.images_dir().join("a.png"),
        store.media_dir().join("a.png"),
    )
    .expect("partial copy");

    let removed = FileRelocator::new(store.clone())
        .rollback()
        .expect("rollback");
    assert_eq!(removed, 1);
    assert!(media_files(&store).is_empty(), "unified dir must be empty");
    assert!(store.images_dir().join("a.png").exists());
    assert!(store.images_dir().join("b.png").exists());
    assert!(store.docs_dir().join("c.pdf").exists());
}

#[test]
fn rollback_twice_is_safe() {
    let tmp = TempDir::new().expect("tempdir");
    let store = test_store(&tmp);
    fs::write(store.images_dir().join("a.png"), b"image bytes a").expect("write");

    let relocator = FileRelocator::new(store.clone());
    relocator.migrate().expect("migrate");
    assert_eq!(relocator.rollback().expect("first rollback"), 1);
    assert_eq!(relocator.rollback().expect("second rollback"), 0);
}

#[test]
fn cleanup_removes_legacy_copies_after_successful_migrate() {
    let tmp = TempDir::new().expect("tempdir");
    let store = test_store(&tmp);
    fs::write(store.images_dir().join("a.png"), b"image bytes a").expect("write");
    fs::write(store.docs_dir().join("c.pdf"), b"document bytes c").expect("write");

    let relocator = FileRelocator::new(store.clone());
    relocator.migrate().expect("migrate");
    let removed = relocator.cleanup().expect("cleanup");
    assert_eq!(removed, 2);

    assert!(!store.images_dir().join("a.png").exists());
    assert!(!store.docs_dir().join("c.pdf").exists());
    assert_eq!(
        media_files(&store),
        vec!["a.png", "c.pdf"],
        "unified copies survive cleanup"
    );
}

#[test]
fn cleanup_without_unified_copy_aborts_before_deleting() {
    let tmp = TempDir::new().expect("tempdir");
    let store = test_store(&tmp);
    fs::write(store.images_dir().join("a.png"), b"image bytes a").expect("write");

    let err = FileRelocator::new(store.clone())
        .cleanup()
        .expect_err("cleanup before migrate must refuse");
    assert!(matches!(err, MigrateError::Corruption(_)), "got {err}");
    assert!(
        store.images_dir().join("a.png").exists(),
        "legacy copy must survive a refused cleanup"
    );
}
