//! Seed scenarios: fixed inputs with fully pinned expectations.

use crate::{archive_dir, audit_archive, extract_archive, inflate, write_tree};
use microzip::crc32;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use std::fs;

#[test]
fn test_single_text_file() {
    let contents = b"Hello, this is a test file!\nWith multiple lines.\n";
    assert_eq!(contents.len(), 49);

    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("stage");
    write_tree(&root, &[("test.txt", contents.as_slice())]);

    let archive = dir.path().join("out.zip");
    archive_dir(&archive, &root);
    let (entries, _) = audit_archive(&fs::read(&archive).unwrap());

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].name, "test.txt");
    assert_eq!(inflate(&entries[0].payload), contents);

    let out = dir.path().join("restored");
    extract_archive(&fs::read(&archive).unwrap(), &out);
    assert_eq!(fs::read(out.join("test.txt")).unwrap(), contents);
    assert_eq!(fs::metadata(out.join("test.txt")).unwrap().len(), 49);
}

#[test]
fn test_empty_file() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("stage");
    write_tree(&root, &[("empty", b"".as_slice())]);

    let archive = dir.path().join("out.zip");
    archive_dir(&archive, &root);
    let (entries, _) = audit_archive(&fs::read(&archive).unwrap());

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].central.uncompressed_size, 0);
    assert_eq!(entries[0].central.crc32, 0x00000000);
    // The empty stream deflates to a single empty final block.
    assert_eq!(entries[0].payload, [0x03, 0x00]);
    assert_eq!(inflate(&entries[0].payload), b"");
}

#[test]
fn test_binary_file() {
    let mut contents = vec![0u8; 5000];
    StdRng::seed_from_u64(0x12345678).fill_bytes(&mut contents);

    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("stage");
    write_tree(&root, &[("binary.dat", contents.as_slice())]);

    let archive = dir.path().join("out.zip");
    archive_dir(&archive, &root);
    let (entries, _) = audit_archive(&fs::read(&archive).unwrap());

    assert_eq!(entries.len(), 1);
    assert_eq!(inflate(&entries[0].payload), contents);
    assert_eq!(entries[0].central.crc32, crc32(&contents));
}

#[test]
fn test_large_repetitive_file() {
    let contents: Vec<u8> = (0..5 * 1024 * 1024u32).map(|i| (i % 256) as u8).collect();

    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("stage");
    write_tree(&root, &[("large.bin", contents.as_slice())]);

    let archive = dir.path().join("out.zip");
    archive_dir(&archive, &root);
    let (entries, _) = audit_archive(&fs::read(&archive).unwrap());

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].central.uncompressed_size, contents.len() as u32);
    assert!(
        u64::from(entries[0].central.compressed_size) < contents.len() as u64 / 20,
        "repetition should compress well, got {} bytes",
        entries[0].central.compressed_size
    );
    assert_eq!(inflate(&entries[0].payload), contents);
}

#[test]
fn test_directory_structure() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("stage");
    write_tree(
        &root,
        &[
            ("root.txt", b"root".as_slice()),
            ("dir1/file1.txt", b"file one".as_slice()),
            ("dir1/subdir/deep.txt", b"deep file".as_slice()),
            ("dir2/file2.txt", b"file two".as_slice()),
        ],
    );

    let archive = dir.path().join("out.zip");
    archive_dir(&archive, &root);
    let bytes = fs::read(&archive).unwrap();
    let (entries, _) = audit_archive(&bytes);

    let mut names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
    names.sort_unstable();
    assert_eq!(
        names,
        ["dir1/file1.txt", "dir1/subdir/deep.txt", "dir2/file2.txt", "root.txt"]
    );

    let out = dir.path().join("restored");
    extract_archive(&bytes, &out);
    microzip::fuzz::compare_trees(&root, &out).unwrap();
    microzip::fuzz::compare_trees(&out, &root).unwrap();
}
