//! SQLite database header
//!
//! The first 100 bytes of every SQLite database file describe its layout.
//! Reading them is the first thing a SQL engine does with a remote file,
//! and the page size found here is the natural chunk size for the reader.

use std::fmt;

use crate::common::{Result, VfsError, SQLITE_HEADER_SIZE};
use crate::vfs::VirtualFileReader;

/// Magic string at offset 0
pub const SQLITE_MAGIC: &[u8; 16] = b"SQLite format 3\0";

/// Text encoding of the database
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8,
    Utf16Le,
    Utf16Be,
}

impl TextEncoding {
    fn from_u32(value: u32) -> Result<Self> {
        match value {
            1 => Ok(TextEncoding::Utf8),
            2 => Ok(TextEncoding::Utf16Le),
            3 => Ok(TextEncoding::Utf16Be),
            // A database that has never been written has no encoding yet
            0 => Ok(TextEncoding::Utf8),
            other => Err(VfsError::NotADatabase(format!(
                "unknown text encoding {}",
                other
            ))),
        }
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextEncoding::Utf8 => write!(f, "UTF-8"),
            TextEncoding::Utf16Le => write!(f, "UTF-16le"),
            TextEncoding::Utf16Be => write!(f, "UTF-16be"),
        }
    }
}

/// Parsed SQLite database header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseHeader {
    /// Database page size in bytes (512..=65536)
    pub page_size: u32,
    /// 1 = legacy rollback journal, 2 = WAL
    pub write_version: u8,
    pub read_version: u8,
    /// Unused bytes at the end of each page
    pub reserved_bytes: u8,
    pub file_change_counter: u32,
    /// Size of the database in pages
    pub database_pages: u32,
    pub freelist_pages: u32,
    pub schema_cookie: u32,
    pub text_encoding: TextEncoding,
    pub user_version: u32,
    pub application_id: u32,
    /// Version of SQLite that last wrote the file
    pub sqlite_version: u32,
}

fn be_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

impl DatabaseHeader {
    /// Parses a header from the first 100 bytes of a database file.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < SQLITE_HEADER_SIZE {
            return Err(VfsError::NotADatabase(format!(
                "header is {} bytes, expected {}",
                bytes.len(),
                SQLITE_HEADER_SIZE
            )));
        }
        if &bytes[..16] != SQLITE_MAGIC {
            return Err(VfsError::NotADatabase("missing SQLite magic string".into()));
        }

        // Stored big-endian at offset 16; the value 1 means 65536
        let raw_page_size = u16::from_be_bytes([bytes[16], bytes[17]]) as u32;
        let page_size = if raw_page_size == 1 { 65_536 } else { raw_page_size };
        if !(512..=65_536).contains(&page_size) || !page_size.is_power_of_two() {
            return Err(VfsError::NotADatabase(format!(
                "invalid page size {}",
                page_size
            )));
        }

        Ok(Self {
            page_size,
            write_version: bytes[18],
            read_version: bytes[19],
            reserved_bytes: bytes[20],
            file_change_counter: be_u32(bytes, 24),
            database_pages: be_u32(bytes, 28),
            freelist_pages: be_u32(bytes, 36),
            schema_cookie: be_u32(bytes, 40),
            text_encoding: TextEncoding::from_u32(be_u32(bytes, 56))?,
            user_version: be_u32(bytes, 60),
            application_id: be_u32(bytes, 68),
            sqlite_version: be_u32(bytes, 96),
        })
    }

    /// Reads and parses the header of a remote database.
    pub fn read_from(reader: &VirtualFileReader) -> Result<Self> {
        let bytes = reader.read(0, SQLITE_HEADER_SIZE as u64)?;
        Self::parse(&bytes)
    }

    /// Returns the database size implied by the header.
    pub fn database_size(&self) -> u64 {
        self.page_size as u64 * self.database_pages as u64
    }

    /// Returns true if the database uses write-ahead logging.
    pub fn is_wal(&self) -> bool {
        self.write_version == 2 || self.read_version == 2
    }

    /// Formats the SQLite version number (e.g. 3045001 -> "3.45.1").
    pub fn sqlite_version_string(&self) -> String {
        let v = self.sqlite_version;
        format!("{}.{}.{}", v / 1_000_000, (v / 1_000) % 1_000, v % 1_000)
    }
}
