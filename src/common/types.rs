use std::fmt;

/// Page index type - ordinal position of a page within the remote file
/// (`byte_offset / page_size`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageIndex(pub u64);

impl PageIndex {
    pub fn new(index: u64) -> Self {
        Self(index)
    }

    /// Returns the page containing the given byte offset.
    pub fn containing(offset: u64, page_size: usize) -> Self {
        Self(offset / page_size as u64)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// Returns the inclusive byte range `[start, end]` this page covers in a
    /// file of `total_size` bytes. The final page is clipped to the file end.
    pub fn byte_range(&self, page_size: usize, total_size: u64) -> (u64, u64) {
        let start = self.0 * page_size as u64;
        let end = total_size.min(start + page_size as u64);
        (start, end.saturating_sub(1))
    }
}

impl fmt::Display for PageIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PageIndex({})", self.0)
    }
}

/// Monotonic timestamp used for fetch ordering
pub type Timestamp = u64;
