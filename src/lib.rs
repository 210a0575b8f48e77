//! httpvfs - query remote SQLite files over HTTP without downloading them
//!
//! This crate presents a remote, immutable file as a random-access byte
//! source. The file is fetched in fixed-size pages using HTTP `Range`
//! requests, and every fetched page is cached, so a SQL engine reading the
//! file only pays network cost for the pages it actually touches.
//!
//! # Architecture
//!
//! - **Fetch** (`fetch`): network access
//!   - `Transport`: the HTTP seam (`HttpTransport` over reqwest)
//!   - `RangeFetcher`: one ranged GET per call, partial-content validation, stats
//!   - `FetchScheduler`: worker threads fetching distinct pages in parallel
//!
//! - **Cache** (`cache`): fetched pages
//!   - `PageCache`: page-index keyed store, unbounded or bounded
//!   - `FetchOrderReplacer`: least-recently-fetched eviction
//!
//! - **VFS** (`vfs`): the read interface
//!   - `FileHandle`: url, size and page size of one remote file
//!   - `VirtualFileReader`: byte-range reads with in-flight fetch deduplication
//!   - `ReaderCursor`: `std::io::Read + Seek` adapter
//!
//! - **SQLite** (`sqlite`): database header parsing
//!
//! # Example
//!
//! ```rust,no_run
//! use httpvfs::common::ReaderConfig;
//! use httpvfs::sqlite::DatabaseHeader;
//! use httpvfs::vfs::VirtualFileReader;
//!
//! let config = ReaderConfig::new().with_page_size(4096);
//! let reader = VirtualFileReader::open("https://example.com/data.sqlite3", config).unwrap();
//!
//! let header = DatabaseHeader::read_from(&reader).unwrap();
//! println!("{} pages of {} bytes", header.database_pages, header.page_size);
//!
//! let stats = reader.stats();
//! println!("{} requests, {} bytes", stats.total_requests, stats.total_bytes);
//! ```

pub mod cache;
pub mod common;
pub mod fetch;
pub mod sqlite;
#[doc(hidden)]
pub mod testing;
pub mod vfs;

// Re-export commonly used types at the crate root
pub use common::{PageIndex, ReaderConfig, Result, Stats, VfsError};
pub use vfs::{CancellationToken, VirtualFileReader};
