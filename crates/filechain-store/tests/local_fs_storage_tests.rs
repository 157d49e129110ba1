// Integration tests for the local filesystem storage backend

use filechain_core::{ExErrorKind, GlobPattern, StorageBackend};
use filechain_store::LocalFsStorage;
use std::fs;
use std::io::Read;
use tempfile::TempDir;

fn tree(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for (path, body) in files {
        let full = dir.path().join(path);
        fs::create_dir_all(full.parent().unwrap()).unwrap();
        fs::write(full, body).unwrap();
    }
    dir
}

#[test]
fn test_list_is_recursive_sorted_and_relative() {
    let dir = tree(&[
        ("b.txt", "bee"),
        ("a.pdf", "%PDF a"),
        ("neurips/2023/c.pdf", "%PDF c"),
    ]);
    let storage = LocalFsStorage::new();

    let files = storage.list(dir.path().to_str().unwrap(), None).unwrap();
    let paths: Vec<_> = files.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(paths, vec!["a.pdf", "b.txt", "neurips/2023/c.pdf"]);

    let a = &files[0];
    assert_eq!(a.size, 6);
    assert!(a.is_latest);
    assert!(a.version_tag.is_empty());
    assert_eq!(a.etag.len(), 64);
}

#[test]
fn test_list_with_glob() {
    let dir = tree(&[("a.pdf", "1"), ("b.txt", "2"), ("sub/c.pdf", "3")]);
    let storage = LocalFsStorage::new();
    let pattern = GlobPattern::compile("*.pdf").unwrap();

    let files = storage
        .list(dir.path().to_str().unwrap(), Some(&pattern))
        .unwrap();
    let paths: Vec<_> = files.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(paths, vec!["a.pdf", "sub/c.pdf"]);
}

#[test]
fn test_file_scheme_location() {
    let dir = tree(&[("a.txt", "hello")]);
    let storage = LocalFsStorage::new();
    let location = format!("file://{}", dir.path().display());

    let files = storage.list(&location, None).unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(storage.read_all(&files[0]).unwrap(), b"hello");
}

#[test]
fn test_open_reads_listed_file() {
    let dir = tree(&[("notes/a.txt", "first paragraph\n\nsecond")]);
    let storage = LocalFsStorage::new();
    let files = storage.list(dir.path().to_str().unwrap(), None).unwrap();

    let mut text = String::new();
    storage
        .open(&files[0])
        .unwrap()
        .read_to_string(&mut text)
        .unwrap();
    assert_eq!(text, "first paragraph\n\nsecond");
}

#[test]
fn test_open_refuses_file_changed_since_listing() {
    let dir = tree(&[("a.txt", "short")]);
    let storage = LocalFsStorage::new();
    let files = storage.list(dir.path().to_str().unwrap(), None).unwrap();

    fs::write(dir.path().join("a.txt"), "a much longer body").unwrap();

    let err = storage.open(&files[0]).err().unwrap();
    assert_eq!(err.kind(), ExErrorKind::StorageUnavailable);
    assert_eq!(err.row_path(), Some("a.txt"));
}

#[test]
fn test_open_deleted_file_is_unavailable() {
    let dir = tree(&[("a.txt", "gone soon")]);
    let storage = LocalFsStorage::new();
    let files = storage.list(dir.path().to_str().unwrap(), None).unwrap();

    fs::remove_file(dir.path().join("a.txt")).unwrap();
    let err = storage.open(&files[0]).err().unwrap();
    assert_eq!(err.kind(), ExErrorKind::StorageUnavailable);
}

#[test]
fn test_empty_directory_lists_nothing() {
    let dir = TempDir::new().unwrap();
    let files = LocalFsStorage::new()
        .list(dir.path().to_str().unwrap(), None)
        .unwrap();
    assert!(files.is_empty());
}
