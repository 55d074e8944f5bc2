//! A minimal, portable ZIP archiver.
//!
//! The crate ships the `zip` command-line writer — walk the inputs, stream
//! every file through a raw-DEFLATE compressor while computing CRC-32, emit
//! local headers, central directory, and end record, then back-patch the
//! local headers once compressed sizes are known — and the `zipfuzz`
//! differential harness that round-trips randomly generated trees through
//! the writer and an external extractor.

#![forbid(unsafe_code)]

mod crc;
mod deflate;
mod errors;
pub mod fuzz;
mod path;
mod records;
mod scanner;
mod writer;

pub use crc::{crc32, Crc32, CrcReader};
pub use deflate::DeflateEncoder;
pub use errors::{Error, ErrorKind};
pub use path::ArchivePath;
pub use records::{
    CentralFileHeader, CompressionMethod, EndOfCentralDirectory, LocalFileHeader, VERSION_NEEDED,
};
pub use scanner::{scan_inputs, FileEntry};
pub use writer::write_archive;
