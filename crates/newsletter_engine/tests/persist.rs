use std::fs;

use newsletter_engine::{ensure_output_dir, AtomicFileWriter, PersistError};
use tempfile::TempDir;

#[test]
fn creates_missing_output_dir() {
    let temp = TempDir::new().unwrap();
    let new_dir = temp.path().join("out").join("nested");
    assert!(!new_dir.exists());
    ensure_output_dir(&new_dir).unwrap();
    assert!(new_dir.is_dir());
}

#[test]
fn atomic_write_replaces_existing_file() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().to_path_buf());

    let first = writer.write("post.md", b"hello").unwrap();
    assert_eq!(first.file_name().unwrap(), "post.md");
    assert_eq!(fs::read_to_string(&first).unwrap(), "hello");

    let second = writer.write("post.md", b"world").unwrap();
    assert_eq!(first, second);
    assert_eq!(fs::read_to_string(&second).unwrap(), "world");

    // Only the target remains; temp files were renamed away.
    assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 1);
}

#[test]
fn writes_binary_content_unchanged() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().join("images"));
    let bytes = [0xFFu8, 0xD8, 0xFF, 0x00, 0x10];
    let path = writer.write("a.jpg", &bytes).unwrap();
    assert_eq!(fs::read(path).unwrap(), bytes);
}

#[test]
fn no_partial_file_when_directory_is_unusable() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("not_a_dir");
    fs::write(&file_path, "x").unwrap();

    let writer = AtomicFileWriter::new(file_path.clone());
    let result = writer.write("post.md", b"data");
    assert!(matches!(result, Err(PersistError::OutputDir { .. })));
    assert!(!file_path.with_file_name("post.md").exists());
}
