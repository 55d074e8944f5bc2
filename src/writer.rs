//! Archive orchestration.
//!
//! The body is written in one forward pass: each entry gets a placeholder
//! local header (CRC and sizes zeroed) followed by its deflated payload,
//! while a [`CrcReader`] taps the source bytes. Compressed lengths are only
//! known once the encoder finishes, so after the central directory and end
//! record are out and the file is closed, the archive is re-opened and every
//! local header is rewritten in place with the final values. The placeholder
//! is byte-for-byte the same size as the final header, so the second pass
//! only ever seeks, never shifts.
//!
//! ZIP's alternative — data-descriptor trailers behind flag bit 3 — would
//! avoid the second pass, but plain zeroed-flag headers keep the output
//! readable by the simplest extractors.

use crate::crc::CrcReader;
use crate::deflate::DeflateEncoder;
use crate::errors::{Error, ErrorKind};
use crate::path::ArchivePath;
use crate::records::{
    CentralFileHeader, CompressionMethod, EndOfCentralDirectory, LocalFileHeader,
    CENTRAL_HEADER_SIGNATURE, LOCAL_HEADER_SIGNATURE, VERSION_NEEDED,
};
use crate::scanner::FileEntry;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Seek, SeekFrom, Write};
use std::path::Path;

/// What the body pass learned about one entry, in entry order. Consumed by
/// the central-directory pass and again by the back-patch pass.
#[derive(Debug, Clone)]
struct FileStore {
    file_offset: u32,
    method: CompressionMethod,
    uncompressed_size: u32,
    compressed_size: u32,
    crc32: u32,
}

#[derive(Debug)]
struct CountWriter<W> {
    inner: W,
    count: u64,
}

impl<W> CountWriter<W> {
    fn new(inner: W) -> Self {
        CountWriter { inner, count: 0 }
    }

    fn count(&self) -> u64 {
        self.count
    }

    fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for CountWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = self.inner.write(buf)?;
        self.count += written as u64;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

fn narrow_u32(what: &'static str, value: u64) -> Result<u32, Error> {
    u32::try_from(value).map_err(|_| Error::from(ErrorKind::TooLargeFor32Bit { what, value }))
}

fn name_len_u16(path: &ArchivePath) -> Result<u16, Error> {
    u16::try_from(path.len()).map_err(|_| {
        Error::from(ErrorKind::TooLargeFor32Bit {
            what: "file name length",
            value: path.len() as u64,
        })
    })
}

/// Creates (or truncates) `archive` and writes all `entries` into it.
///
/// Any failure is fatal: no cleanup is attempted and a failed run leaves the
/// output unusable.
pub fn write_archive(archive: &Path, entries: &[FileEntry]) -> Result<(), Error> {
    if entries.len() > usize::from(u16::MAX) {
        return Err(Error::from(ErrorKind::TooManyEntries(entries.len())));
    }
    for entry in entries {
        name_len_u16(&entry.archive_path)?;
        // Refuse oversize files on the scan-time snapshot, before any
        // compression work. The authoritative size check happens again on
        // the bytes actually read.
        narrow_u32("uncompressed size", entry.uncompressed_size)?;
    }

    let file = File::create(archive).map_err(|err| Error::io_path(err, archive))?;
    let mut sink = CountWriter::new(BufWriter::new(file));

    let mut stores = Vec::with_capacity(entries.len());
    for entry in entries {
        stores.push(write_entry_body(&mut sink, entry)?);
    }

    let central_dir_offset = narrow_u32("central directory offset", sink.count())?;
    for (entry, store) in entries.iter().zip(&stores) {
        let header = CentralFileHeader {
            signature: CENTRAL_HEADER_SIGNATURE,
            version_made_by: 0,
            version_needed: VERSION_NEEDED,
            flags: 0,
            method: store.method.as_u16(),
            mod_time: 0,
            mod_date: 0,
            crc32: store.crc32,
            compressed_size: store.compressed_size,
            uncompressed_size: store.uncompressed_size,
            file_name_len: name_len_u16(&entry.archive_path)?,
            extra_field_len: 0,
            comment_len: 0,
            disk_number: 0,
            internal_attrs: 0,
            external_attrs: 0,
            local_header_offset: store.file_offset,
        };
        header.write_to(&mut sink).map_err(Error::io)?;
        sink.write_all(entry.archive_path.as_str().as_bytes())
            .map_err(Error::io)?;
    }

    let central_dir_size = narrow_u32(
        "central directory size",
        sink.count() - u64::from(central_dir_offset),
    )?;
    let end =
        EndOfCentralDirectory::new(entries.len() as u16, central_dir_size, central_dir_offset);
    end.write_to(&mut sink).map_err(Error::io)?;

    let mut buffered = sink.into_inner();
    buffered.flush().map_err(Error::io)?;
    drop(buffered);

    patch_local_headers(archive, entries, &stores)
}

fn write_entry_body<W: Write>(
    sink: &mut CountWriter<W>,
    entry: &FileEntry,
) -> Result<FileStore, Error> {
    let file_offset = narrow_u32("local header offset", sink.count())?;
    let name = entry.archive_path.as_str();

    let placeholder = LocalFileHeader::placeholder(
        CompressionMethod::Deflate,
        name_len_u16(&entry.archive_path)?,
    );
    placeholder.write_to(sink).map_err(Error::io)?;
    sink.write_all(name.as_bytes()).map_err(Error::io)?;

    let source = entry.fs_path();
    let source_file = File::open(&source).map_err(|err| Error::io_path(err, &source))?;
    let mut tap = CrcReader::new(source_file);

    let payload_start = sink.count();
    let mut encoder = DeflateEncoder::new(&mut *sink);
    io::copy(&mut tap, &mut encoder).map_err(|err| Error::io_path(err, &source))?;
    encoder.finish().map_err(Error::io)?;

    Ok(FileStore {
        file_offset,
        method: CompressionMethod::Deflate,
        compressed_size: narrow_u32("compressed size", sink.count() - payload_start)?,
        uncompressed_size: narrow_u32("uncompressed size", tap.bytes_read())?,
        crc32: tap.crc32(),
    })
}

/// The second pass: rewrite every local header with the finalized CRC and
/// sizes. The name is rewritten along with it, which is harmless since it
/// cannot have changed.
fn patch_local_headers(
    archive: &Path,
    entries: &[FileEntry],
    stores: &[FileStore],
) -> Result<(), Error> {
    let mut file = OpenOptions::new()
        .read(true)
        .write(true)
        .open(archive)
        .map_err(|err| Error::io_path(err, archive))?;

    for (entry, store) in entries.iter().zip(stores) {
        file.seek(SeekFrom::Start(u64::from(store.file_offset)))
            .map_err(Error::io)?;
        let header = LocalFileHeader {
            signature: LOCAL_HEADER_SIGNATURE,
            version_needed: VERSION_NEEDED,
            flags: 0,
            method: store.method.as_u16(),
            mod_time: 0,
            mod_date: 0,
            crc32: store.crc32,
            compressed_size: store.compressed_size,
            uncompressed_size: store.uncompressed_size,
            file_name_len: name_len_u16(&entry.archive_path)?,
            extra_field_len: 0,
        };
        header.write_to(&mut file).map_err(Error::io)?;
        file.write_all(entry.archive_path.as_str().as_bytes())
            .map_err(Error::io)?;
    }

    Ok(())
}
