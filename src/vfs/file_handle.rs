use std::ops::RangeInclusive;

use tracing::info;

use crate::common::{PageIndex, ReaderConfig, Result, VfsError};
use crate::fetch::RangeFetcher;

/// FileHandle describes one remote file: where it lives, how large it is
/// and how it is divided into pages. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHandle {
    url: String,
    /// None when the server did not report a size and no override was given
    total_size: Option<u64>,
    page_size: usize,
}

impl FileHandle {
    pub fn new(url: impl Into<String>, total_size: Option<u64>, page_size: usize) -> Self {
        Self {
            url: url.into(),
            total_size,
            page_size,
        }
    }

    /// Creates a handle for `url`, using the configured size override or
    /// probing the server for the size.
    pub fn open(fetcher: &RangeFetcher, url: impl Into<String>, config: &ReaderConfig) -> Result<Self> {
        config.validate()?;
        let url = url.into();

        let total_size = match config.file_size {
            Some(size) => Some(size),
            None => fetcher.probe_size(&url)?,
        };

        info!(
            "Opened {} (size {:?}, page size {})",
            url, total_size, config.page_size
        );

        Ok(Self::new(url, total_size, config.page_size))
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn total_size(&self) -> Option<u64> {
        self.total_size
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Returns the number of pages in the file, if its size is known.
    pub fn num_pages(&self) -> Option<u64> {
        self.total_size
            .map(|size| size.div_ceil(self.page_size as u64))
    }

    /// Returns the file size, failing with `UnknownSize` if it was never
    /// learned.
    pub fn require_size(&self) -> Result<u64> {
        self.total_size.ok_or_else(|| VfsError::UnknownSize {
            url: self.url.clone(),
        })
    }

    /// Validates a read of `length` bytes at `offset` against the file size.
    pub fn check_read(&self, offset: u64, length: u64) -> Result<u64> {
        let total_size = self.require_size()?;
        match offset.checked_add(length) {
            Some(end) if end <= total_size => Ok(total_size),
            _ => Err(VfsError::OutOfRange {
                offset,
                length,
                total_size,
            }),
        }
    }

    /// Returns the inclusive range of pages touched by a non-empty read.
    pub fn pages_for(&self, offset: u64, length: u64) -> RangeInclusive<u64> {
        debug_assert!(length > 0);
        let first = PageIndex::containing(offset, self.page_size).as_u64();
        let last = PageIndex::containing(offset + length - 1, self.page_size).as_u64();
        first..=last
    }
}
