use std::io::{self, Read, Seek, SeekFrom};

use super::VirtualFileReader;

/// A `Read + Seek` view of a [`VirtualFileReader`], for consumers written
/// against file I/O.
///
/// Reads past the end of the file return 0 bytes like a regular file; the
/// underlying reader is never asked for bytes beyond the file size.
pub struct ReaderCursor<'a> {
    reader: &'a VirtualFileReader,
    position: u64,
}

impl<'a> ReaderCursor<'a> {
    pub fn new(reader: &'a VirtualFileReader) -> Self {
        Self {
            reader,
            position: 0,
        }
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn reader(&self) -> &'a VirtualFileReader {
        self.reader
    }

    fn total_size(&self) -> io::Result<u64> {
        Ok(self.reader.handle().require_size()?)
    }
}

impl Read for ReaderCursor<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let total_size = self.total_size()?;
        if self.position >= total_size || buf.is_empty() {
            return Ok(0);
        }

        let length = (buf.len() as u64).min(total_size - self.position) as usize;
        self.reader.read_at(self.position, &mut buf[..length])?;
        self.position += length as u64;
        Ok(length)
    }
}

impl Seek for ReaderCursor<'_> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::End(delta) => self.total_size()?.checked_add_signed(delta),
            SeekFrom::Current(delta) => self.position.checked_add_signed(delta),
        };

        match target {
            Some(position) => {
                self.position = position;
                Ok(position)
            }
            None => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "invalid seek to a negative or overflowing position",
            )),
        }
    }
}
