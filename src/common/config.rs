use std::time::Duration;

use super::error::{Result, VfsError};

/// Default page (chunk) size in bytes (4 KB, SQLite's default page size)
pub const DEFAULT_PAGE_SIZE: usize = 4096;

/// Default number of fetch worker threads
pub const DEFAULT_FETCH_WORKERS: usize = 4;

/// Default timeout for a single HTTP request
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Capacity of the fetch scheduler's request queue
pub const FETCH_QUEUE_CAPACITY: usize = 128;

/// How often a waiter re-checks its cancellation token
pub const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Size of the SQLite database file header
pub const SQLITE_HEADER_SIZE: usize = 100;

/// Configuration for a `VirtualFileReader`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderConfig {
    /// Fixed page size for the lifetime of the file handle
    pub page_size: usize,
    /// Maximum number of resident pages (None = unbounded)
    pub cache_capacity: Option<usize>,
    /// Manual file size override; skips the size probe when set
    pub file_size: Option<u64>,
    /// Number of threads fetching pages in parallel
    pub fetch_workers: usize,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            cache_capacity: None,
            file_size: None,
            fetch_workers: DEFAULT_FETCH_WORKERS,
        }
    }
}

impl ReaderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_cache_capacity(mut self, pages: usize) -> Self {
        self.cache_capacity = Some(pages);
        self
    }

    pub fn with_file_size(mut self, size: u64) -> Self {
        self.file_size = Some(size);
        self
    }

    pub fn with_fetch_workers(mut self, workers: usize) -> Self {
        self.fetch_workers = workers;
        self
    }

    /// Rejects configurations that cannot produce a working reader.
    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(VfsError::InvalidConfig("page size must be non-zero".into()));
        }
        if self.fetch_workers == 0 {
            return Err(VfsError::InvalidConfig(
                "at least one fetch worker is required".into(),
            ));
        }
        if self.cache_capacity == Some(0) {
            return Err(VfsError::InvalidConfig(
                "bounded cache capacity must be at least one page".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reader_config_defaults() {
        let config = ReaderConfig::default();
        assert_eq!(config.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(config.cache_capacity, None);
        assert_eq!(config.file_size, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_reader_config_rejects_zero_values() {
        assert!(ReaderConfig::new().with_page_size(0).validate().is_err());
        assert!(ReaderConfig::new().with_fetch_workers(0).validate().is_err());
        assert!(matches!(
            ReaderConfig::new().with_cache_capacity(0).validate(),
            Err(VfsError::InvalidConfig(_))
        ));
    }
}
