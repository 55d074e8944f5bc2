//! Integration suite: audits written archives record by record and proves
//! the payloads against a third-party DEFLATE implementation.

use microzip::{
    crc32, scan_inputs, write_archive, CentralFileHeader, EndOfCentralDirectory, LocalFileHeader,
};
use quickcheck_macros::quickcheck;
use std::fs;
use std::io::Read;
use std::path::Path;

mod scenario_tests;

/// One entry as seen by walking the finished archive.
pub struct AuditedEntry {
    pub name: String,
    pub local: LocalFileHeader,
    pub central: CentralFileHeader,
    pub payload: Vec<u8>,
    pub local_offset: u64,
}

/// Walks the central directory of `bytes` and cross-references every local
/// header. Panics on any structural inconsistency; detailed field checks are
/// left to the callers.
pub fn audit_archive(bytes: &[u8]) -> (Vec<AuditedEntry>, EndOfCentralDirectory) {
    assert!(bytes.len() >= EndOfCentralDirectory::SIZE);
    let end = EndOfCentralDirectory::parse(&bytes[bytes.len() - EndOfCentralDirectory::SIZE..])
        .expect("end record");
    assert_eq!(end.records_on_disk, end.records_total);
    assert_eq!(end.comment_len, 0);

    let mut entries = Vec::new();
    let mut pos = end.central_dir_offset as usize;
    for _ in 0..end.records_total {
        let central = CentralFileHeader::parse(&bytes[pos..]).expect("central header");
        let name_start = pos + CentralFileHeader::SIZE;
        let name_end = name_start + central.file_name_len as usize;
        let name = std::str::from_utf8(&bytes[name_start..name_end])
            .expect("archive name is UTF-8")
            .to_string();
        pos = name_end + central.extra_field_len as usize + central.comment_len as usize;

        let local_offset = u64::from(central.local_header_offset);
        let local = LocalFileHeader::parse(&bytes[local_offset as usize..]).expect("local header");
        let local_name_start = local_offset as usize + LocalFileHeader::SIZE;
        let local_name_end = local_name_start + local.file_name_len as usize;
        assert_eq!(&bytes[local_name_start..local_name_end], name.as_bytes());

        let payload_start = local_name_end + local.extra_field_len as usize;
        let payload_end = payload_start + central.compressed_size as usize;
        entries.push(AuditedEntry {
            name,
            local,
            central,
            payload: bytes[payload_start..payload_end].to_vec(),
            local_offset,
        });
    }

    let central_dir_end = end.central_dir_offset as usize + end.central_dir_size as usize;
    assert_eq!(pos, central_dir_end, "central directory size is exact");
    assert_eq!(
        central_dir_end,
        bytes.len() - EndOfCentralDirectory::SIZE,
        "end record directly follows the central directory"
    );

    (entries, end)
}

pub fn inflate(data: &[u8]) -> Vec<u8> {
    let mut decoder = flate2::read::DeflateDecoder::new(data);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out).expect("payload inflates");
    out
}

/// Lays out `files` (archive-style relative names, `/`-separated) under
/// `root`.
pub fn write_tree(root: &Path, files: &[(&str, &[u8])]) {
    for (name, contents) in files {
        let path = root.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, contents).unwrap();
    }
}

/// Archives the directory `root` into `archive` through the library.
pub fn archive_dir(archive: &Path, root: &Path) {
    let entries = scan_inputs(&[root.to_str().unwrap()]).unwrap();
    write_archive(archive, &entries).unwrap();
}

/// A minimal extractor over the audited records: enough to round-trip our
/// own output without shelling out.
pub fn extract_archive(bytes: &[u8], out_dir: &Path) {
    let (entries, _) = audit_archive(bytes);
    for entry in entries {
        let target = out_dir.join(&entry.name);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(target, inflate(&entry.payload)).unwrap();
    }
}

#[test]
fn test_archive_layout_and_field_consistency() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("stage");
    write_tree(
        &root,
        &[
            ("root.txt", b"top level\n".as_slice()),
            ("dir1/file1.txt", b"one one one one one one one\n".as_slice()),
            ("dir1/subdir/deep.txt", b"deep".as_slice()),
            ("dir2/file2.txt", b"".as_slice()),
        ],
    );

    let archive = dir.path().join("out.zip");
    archive_dir(&archive, &root);
    let bytes = fs::read(&archive).unwrap();
    let (entries, end) = audit_archive(&bytes);

    assert_eq!(entries.len(), 4);
    assert_eq!(end.records_total, 4);

    // The body is a seamless chain of local blocks starting at offset zero
    // and ending exactly where the central directory begins.
    let mut expected_offset = 0u64;
    for entry in &entries {
        assert_eq!(entry.local_offset, expected_offset);
        expected_offset += (LocalFileHeader::SIZE + entry.name.len()) as u64
            + u64::from(entry.central.compressed_size);
    }
    assert_eq!(expected_offset, u64::from(end.central_dir_offset));

    for entry in &entries {
        let source = fs::read(root.join(&entry.name)).unwrap();
        let restored = inflate(&entry.payload);
        assert_eq!(restored, source, "{} round-trips", entry.name);

        // Local and central copies agree after the back-patch.
        assert_eq!(entry.local.crc32, entry.central.crc32);
        assert_eq!(entry.local.compressed_size, entry.central.compressed_size);
        assert_eq!(entry.local.uncompressed_size, entry.central.uncompressed_size);
        assert_eq!(entry.local.method, entry.central.method);

        assert_eq!(entry.local.flags, 0);
        assert_eq!(entry.local.version_needed, microzip::VERSION_NEEDED);
        assert_eq!(entry.local.mod_time, 0);
        assert_eq!(entry.local.mod_date, 0);
        assert_eq!(entry.local.extra_field_len, 0);
        assert_eq!(entry.central.extra_field_len, 0);
        assert_eq!(entry.central.comment_len, 0);
        assert_eq!(entry.central.disk_number, 0);
        assert_eq!(entry.central.external_attrs, 0);

        assert_eq!(entry.central.crc32, crc32(&source));
        assert_eq!(entry.central.uncompressed_size, source.len() as u32);
        assert_eq!(entry.central.compressed_size, entry.payload.len() as u32);
    }
}

#[test]
fn test_entry_names_use_forward_slashes() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("stage");
    write_tree(&root, &[("a/b/c.txt", b"nested".as_slice())]);

    let archive = dir.path().join("out.zip");
    archive_dir(&archive, &root);
    let (entries, _) = audit_archive(&fs::read(&archive).unwrap());

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].name, "a/b/c.txt");
}

#[test]
fn test_standalone_file_argument() {
    // Standalone arguments keep their verbatim (relative) name.
    let file = tempfile::Builder::new()
        .prefix("microzip-it-")
        .tempfile_in(".")
        .unwrap();
    fs::write(file.path(), b"standalone contents").unwrap();
    let name = file
        .path()
        .file_name()
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();

    let dir = tempfile::tempdir().unwrap();
    let archive = dir.path().join("out.zip");
    let entries = scan_inputs(&[name.clone()]).unwrap();
    write_archive(&archive, &entries).unwrap();

    let (audited, _) = audit_archive(&fs::read(&archive).unwrap());
    assert_eq!(audited.len(), 1);
    assert_eq!(audited[0].name, name);
    assert_eq!(inflate(&audited[0].payload), b"standalone contents");
}

#[quickcheck]
fn prop_any_payload_roundtrips(data: Vec<u8>) -> bool {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("stage");
    write_tree(&root, &[("blob.bin", data.as_slice())]);

    let archive = dir.path().join("out.zip");
    archive_dir(&archive, &root);
    let (entries, _) = audit_archive(&fs::read(&archive).unwrap());

    entries.len() == 1
        && inflate(&entries[0].payload) == data
        && entries[0].central.crc32 == crc32(&data)
        && entries[0].central.uncompressed_size == data.len() as u32
}
