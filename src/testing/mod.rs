//! Fixtures shared by unit and integration tests
//!
//! Not part of the supported API.

mod memory_transport;

pub use memory_transport::*;

use crate::common::SQLITE_HEADER_SIZE;
use crate::sqlite::SQLITE_MAGIC;

/// Builds a minimal valid SQLite header.
pub fn build_header(page_size: u32, database_pages: u32) -> [u8; SQLITE_HEADER_SIZE] {
    let mut header = [0u8; SQLITE_HEADER_SIZE];
    header[..16].copy_from_slice(SQLITE_MAGIC);
    let raw_page_size: u16 = if page_size == 65_536 { 1 } else { page_size as u16 };
    header[16..18].copy_from_slice(&raw_page_size.to_be_bytes());
    header[18] = 1;
    header[19] = 1;
    header[21] = 64;
    header[22] = 32;
    header[23] = 32;
    header[24..28].copy_from_slice(&1u32.to_be_bytes());
    header[28..32].copy_from_slice(&database_pages.to_be_bytes());
    header[44..48].copy_from_slice(&4u32.to_be_bytes());
    header[56..60].copy_from_slice(&1u32.to_be_bytes());
    header[96..100].copy_from_slice(&3_045_001u32.to_be_bytes());
    header
}
