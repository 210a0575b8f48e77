use bytes::Bytes;

use crate::common::{PageIndex, Timestamp};

/// An immutable block of the remote file.
///
/// `data` is exactly one page long except for the last page of the file,
/// which may be shorter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    index: PageIndex,
    data: Bytes,
    fetched_at: Timestamp,
}

impl Page {
    pub fn new(index: PageIndex, data: Bytes, fetched_at: Timestamp) -> Self {
        Self {
            index,
            data,
            fetched_at,
        }
    }

    pub fn index(&self) -> PageIndex {
        self.index
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Cache clock value at the time the page was fetched.
    pub fn fetched_at(&self) -> Timestamp {
        self.fetched_at
    }
}
