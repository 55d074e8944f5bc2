//! The three wire records of a ZIP archive, emitted packed and little-endian.
//!
//! Encoding is byte-exact: each `write_to` produces exactly `SIZE` bytes with
//! no padding and no host-endian dependence. The matching `parse` functions
//! validate signatures and are what the test suite audits archives with.

use crate::errors::{Error, ErrorKind};
use std::io::{self, Write};

pub(crate) const LOCAL_HEADER_SIGNATURE: u32 = 0x04034b50;
pub(crate) const CENTRAL_HEADER_SIGNATURE: u32 = 0x02014b50;
pub(crate) const END_OF_CENTRAL_DIR_SIGNATURE: u32 = 0x06054b50;

/// Version needed to extract: 1.0, the floor for plain deflate entries.
pub const VERSION_NEEDED: u16 = 10;

#[inline(always)]
fn le_u16(d: &[u8]) -> u16 {
    u16::from_le_bytes([d[0], d[1]])
}

#[inline(always)]
fn le_u32(d: &[u8]) -> u32 {
    u32::from_le_bytes([d[0], d[1], d[2], d[3]])
}

/// The compression method stored in a header's method field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    Store,
    Deflate,
}

impl CompressionMethod {
    pub fn as_u16(self) -> u16 {
        match self {
            CompressionMethod::Store => 0,
            CompressionMethod::Deflate => 8,
        }
    }

    pub fn from_u16(id: u16) -> Option<CompressionMethod> {
        match id {
            0 => Some(CompressionMethod::Store),
            8 => Some(CompressionMethod::Deflate),
            _ => None,
        }
    }
}

/// Local file header: 30 fixed bytes followed by the name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFileHeader {
    pub signature: u32,
    pub version_needed: u16,
    pub flags: u16,
    pub method: u16,
    pub mod_time: u16,
    pub mod_date: u16,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub file_name_len: u16,
    pub extra_field_len: u16,
}

impl LocalFileHeader {
    pub const SIZE: usize = 30;

    /// A header for an entry whose CRC and sizes are not yet known. All
    /// variable fields are zero; the byte length matches the final header
    /// exactly, so it can be overwritten in place later.
    pub fn placeholder(method: CompressionMethod, file_name_len: u16) -> LocalFileHeader {
        LocalFileHeader {
            signature: LOCAL_HEADER_SIGNATURE,
            version_needed: VERSION_NEEDED,
            flags: 0,
            method: method.as_u16(),
            mod_time: 0,
            mod_date: 0,
            crc32: 0,
            compressed_size: 0,
            uncompressed_size: 0,
            file_name_len,
            extra_field_len: 0,
        }
    }

    pub fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        out.write_all(&self.signature.to_le_bytes())?;
        out.write_all(&self.version_needed.to_le_bytes())?;
        out.write_all(&self.flags.to_le_bytes())?;
        out.write_all(&self.method.to_le_bytes())?;
        out.write_all(&self.mod_time.to_le_bytes())?;
        out.write_all(&self.mod_date.to_le_bytes())?;
        out.write_all(&self.crc32.to_le_bytes())?;
        out.write_all(&self.compressed_size.to_le_bytes())?;
        out.write_all(&self.uncompressed_size.to_le_bytes())?;
        out.write_all(&self.file_name_len.to_le_bytes())?;
        out.write_all(&self.extra_field_len.to_le_bytes())?;
        Ok(())
    }

    pub fn parse(data: &[u8]) -> Result<LocalFileHeader, Error> {
        if data.len() < Self::SIZE {
            return Err(Error::from(ErrorKind::Eof));
        }

        let result = LocalFileHeader {
            signature: le_u32(&data[0..4]),
            version_needed: le_u16(&data[4..6]),
            flags: le_u16(&data[6..8]),
            method: le_u16(&data[8..10]),
            mod_time: le_u16(&data[10..12]),
            mod_date: le_u16(&data[12..14]),
            crc32: le_u32(&data[14..18]),
            compressed_size: le_u32(&data[18..22]),
            uncompressed_size: le_u32(&data[22..26]),
            file_name_len: le_u16(&data[26..28]),
            extra_field_len: le_u16(&data[28..30]),
        };

        if result.signature != LOCAL_HEADER_SIGNATURE {
            return Err(Error::from(ErrorKind::InvalidSignature {
                expected: LOCAL_HEADER_SIGNATURE,
                actual: result.signature,
            }));
        }

        Ok(result)
    }
}

/// Central directory file header: 46 fixed bytes followed by the name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CentralFileHeader {
    pub signature: u32,
    pub version_made_by: u16,
    pub version_needed: u16,
    pub flags: u16,
    pub method: u16,
    pub mod_time: u16,
    pub mod_date: u16,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub file_name_len: u16,
    pub extra_field_len: u16,
    pub comment_len: u16,
    pub disk_number: u16,
    pub internal_attrs: u16,
    pub external_attrs: u32,
    pub local_header_offset: u32,
}

impl CentralFileHeader {
    pub const SIZE: usize = 46;

    pub fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        out.write_all(&self.signature.to_le_bytes())?;
        out.write_all(&self.version_made_by.to_le_bytes())?;
        out.write_all(&self.version_needed.to_le_bytes())?;
        out.write_all(&self.flags.to_le_bytes())?;
        out.write_all(&self.method.to_le_bytes())?;
        out.write_all(&self.mod_time.to_le_bytes())?;
        out.write_all(&self.mod_date.to_le_bytes())?;
        out.write_all(&self.crc32.to_le_bytes())?;
        out.write_all(&self.compressed_size.to_le_bytes())?;
        out.write_all(&self.uncompressed_size.to_le_bytes())?;
        out.write_all(&self.file_name_len.to_le_bytes())?;
        out.write_all(&self.extra_field_len.to_le_bytes())?;
        out.write_all(&self.comment_len.to_le_bytes())?;
        out.write_all(&self.disk_number.to_le_bytes())?;
        out.write_all(&self.internal_attrs.to_le_bytes())?;
        out.write_all(&self.external_attrs.to_le_bytes())?;
        out.write_all(&self.local_header_offset.to_le_bytes())?;
        Ok(())
    }

    pub fn parse(data: &[u8]) -> Result<CentralFileHeader, Error> {
        if data.len() < Self::SIZE {
            return Err(Error::from(ErrorKind::Eof));
        }

        let result = CentralFileHeader {
            signature: le_u32(&data[0..4]),
            version_made_by: le_u16(&data[4..6]),
            version_needed: le_u16(&data[6..8]),
            flags: le_u16(&data[8..10]),
            method: le_u16(&data[10..12]),
            mod_time: le_u16(&data[12..14]),
            mod_date: le_u16(&data[14..16]),
            crc32: le_u32(&data[16..20]),
            compressed_size: le_u32(&data[20..24]),
            uncompressed_size: le_u32(&data[24..28]),
            file_name_len: le_u16(&data[28..30]),
            extra_field_len: le_u16(&data[30..32]),
            comment_len: le_u16(&data[32..34]),
            disk_number: le_u16(&data[34..36]),
            internal_attrs: le_u16(&data[36..38]),
            external_attrs: le_u32(&data[38..42]),
            local_header_offset: le_u32(&data[42..46]),
        };

        if result.signature != CENTRAL_HEADER_SIGNATURE {
            return Err(Error::from(ErrorKind::InvalidSignature {
                expected: CENTRAL_HEADER_SIGNATURE,
                actual: result.signature,
            }));
        }

        Ok(result)
    }
}

/// End of central directory record: exactly 22 bytes in this writer (no
/// archive comment).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndOfCentralDirectory {
    pub signature: u32,
    pub disk_number: u16,
    pub central_dir_disk: u16,
    pub records_on_disk: u16,
    pub records_total: u16,
    pub central_dir_size: u32,
    pub central_dir_offset: u32,
    pub comment_len: u16,
}

impl EndOfCentralDirectory {
    pub const SIZE: usize = 22;

    pub fn new(records: u16, central_dir_size: u32, central_dir_offset: u32) -> Self {
        EndOfCentralDirectory {
            signature: END_OF_CENTRAL_DIR_SIGNATURE,
            disk_number: 0,
            central_dir_disk: 0,
            records_on_disk: records,
            records_total: records,
            central_dir_size,
            central_dir_offset,
            comment_len: 0,
        }
    }

    pub fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        out.write_all(&self.signature.to_le_bytes())?;
        out.write_all(&self.disk_number.to_le_bytes())?;
        out.write_all(&self.central_dir_disk.to_le_bytes())?;
        out.write_all(&self.records_on_disk.to_le_bytes())?;
        out.write_all(&self.records_total.to_le_bytes())?;
        out.write_all(&self.central_dir_size.to_le_bytes())?;
        out.write_all(&self.central_dir_offset.to_le_bytes())?;
        out.write_all(&self.comment_len.to_le_bytes())?;
        Ok(())
    }

    pub fn parse(data: &[u8]) -> Result<EndOfCentralDirectory, Error> {
        if data.len() < Self::SIZE {
            return Err(Error::from(ErrorKind::Eof));
        }

        let result = EndOfCentralDirectory {
            signature: le_u32(&data[0..4]),
            disk_number: le_u16(&data[4..6]),
            central_dir_disk: le_u16(&data[6..8]),
            records_on_disk: le_u16(&data[8..10]),
            records_total: le_u16(&data[10..12]),
            central_dir_size: le_u32(&data[12..16]),
            central_dir_offset: le_u32(&data[16..20]),
            comment_len: le_u16(&data[20..22]),
        };

        if result.signature != END_OF_CENTRAL_DIR_SIGNATURE {
            return Err(Error::from(ErrorKind::InvalidSignature {
                expected: END_OF_CENTRAL_DIR_SIGNATURE,
                actual: result.signature,
            }));
        }

        Ok(result)
    }
}
