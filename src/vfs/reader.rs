use std::collections::HashMap;
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::cache::{Page, PageCache};
use crate::common::{PageIndex, ReaderConfig, Result, Stats, StatsCollector, VfsError};
use crate::fetch::{FetchRequest, FetchScheduler, HttpTransport, RangeFetcher, Transport};

use super::{CancellationToken, FileHandle, PendingFetch};

/// State shared between the reader and the fetch completion callbacks
struct ReaderState {
    /// Fetched pages
    cache: PageCache,
    /// In-flight fetches keyed by page, removed once they resolve
    in_flight: Mutex<HashMap<PageIndex, Arc<PendingFetch>>>,
    /// Counters for this handle
    stats: Arc<StatsCollector>,
}

/// Settles one page's in-flight entry. If the fetch callback is dropped
/// without running, the waiters get a `Scheduler` error instead of blocking.
struct FetchCompletion {
    index: PageIndex,
    state: Arc<ReaderState>,
    pending: Arc<PendingFetch>,
}

impl FetchCompletion {
    fn finish(&self, outcome: Result<Arc<Page>>) {
        {
            let mut in_flight = self.state.in_flight.lock();
            // A later fetch of the same page may own the entry by now
            if in_flight
                .get(&self.index)
                .is_some_and(|entry| Arc::ptr_eq(entry, &self.pending))
            {
                in_flight.remove(&self.index);
            }
        }
        self.pending.resolve(outcome);
    }
}

impl Drop for FetchCompletion {
    fn drop(&mut self) {
        if !self.pending.is_resolved() {
            self.finish(Err(VfsError::Scheduler(format!(
                "Fetch of {} was abandoned",
                self.index
            ))));
        }
    }
}

/// Where a page needed by a read will come from
enum PageSlot {
    Ready(Arc<Page>),
    Pending(Arc<PendingFetch>),
}

/// VirtualFileReader presents a remote file as a random-access byte source.
///
/// Reads are translated into whole-page fetches. Pages are cached for the
/// lifetime of the reader, so repeated or overlapping reads cost no network
/// traffic after the first touch. Concurrent misses on the same page share
/// one fetch.
pub struct VirtualFileReader {
    /// The remote file
    handle: FileHandle,
    /// Shared state
    state: Arc<ReaderState>,
    /// Worker pool performing the fetches
    scheduler: FetchScheduler,
}

impl VirtualFileReader {
    /// Opens `url` over HTTP(S).
    pub fn open(url: impl Into<String>, config: ReaderConfig) -> Result<Self> {
        Self::with_transport(Arc::new(HttpTransport::new()?), url, config)
    }

    /// Opens `url` over the given transport.
    pub fn with_transport(
        transport: Arc<dyn Transport>,
        url: impl Into<String>,
        config: ReaderConfig,
    ) -> Result<Self> {
        let stats = Arc::new(StatsCollector::new());
        let fetcher = Arc::new(RangeFetcher::new(transport, Arc::clone(&stats)));
        let handle = FileHandle::open(&fetcher, url, &config)?;

        let state = Arc::new(ReaderState {
            cache: PageCache::with_capacity(config.cache_capacity),
            in_flight: Mutex::new(HashMap::new()),
            stats,
        });
        let scheduler = FetchScheduler::new(fetcher, handle.url(), config.fetch_workers);

        Ok(Self {
            handle,
            state,
            scheduler,
        })
    }

    /// Reads exactly `length` bytes starting at `offset`.
    pub fn read(&self, offset: u64, length: u64) -> Result<Bytes> {
        self.read_pages(offset, length, None)
    }

    /// Like [`read`](Self::read), but stops waiting with `Cancelled` once
    /// `token` is cancelled. Fetches already started still fill the cache.
    pub fn read_with_cancel(
        &self,
        offset: u64,
        length: u64,
        token: &CancellationToken,
    ) -> Result<Bytes> {
        self.read_pages(offset, length, Some(token))
    }

    /// Fills `buf` with the bytes starting at `offset`.
    pub fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        let bytes = self.read(offset, buf.len() as u64)?;
        buf.copy_from_slice(&bytes);
        Ok(())
    }

    pub fn handle(&self) -> &FileHandle {
        &self.handle
    }

    /// Returns the file size, if known.
    pub fn size(&self) -> Option<u64> {
        self.handle.total_size()
    }

    pub fn page_size(&self) -> usize {
        self.handle.page_size()
    }

    pub fn cache(&self) -> &PageCache {
        &self.state.cache
    }

    /// Returns a snapshot of this reader's counters.
    pub fn stats(&self) -> Stats {
        self.state.stats.snapshot()
    }

    /// Returns the number of page fetches currently in flight.
    pub fn in_flight(&self) -> usize {
        self.state.in_flight.lock().len()
    }

    fn read_pages(
        &self,
        offset: u64,
        length: u64,
        token: Option<&CancellationToken>,
    ) -> Result<Bytes> {
        let total_size = self.handle.check_read(offset, length)?;
        if length == 0 {
            return Ok(Bytes::new());
        }

        // Submit every miss before waiting on any, so distinct pages are
        // fetched in parallel
        let slots = self
            .handle
            .pages_for(offset, length)
            .map(|index| self.resolve_page(PageIndex::new(index), total_size))
            .collect::<Result<Vec<_>>>()?;

        let mut pages = Vec::with_capacity(slots.len());
        for slot in slots {
            let page = match slot {
                PageSlot::Ready(page) => page,
                PageSlot::Pending(pending) => match token {
                    Some(token) => pending.wait_cancellable(token)?,
                    None => pending.wait()?,
                },
            };
            pages.push(page);
        }

        Ok(self.assemble(&pages, offset, length))
    }

    /// Finds a page in the cache, joins its in-flight fetch, or starts one.
    fn resolve_page(&self, index: PageIndex, total_size: u64) -> Result<PageSlot> {
        if let Some(page) = self.state.cache.get(index) {
            trace!("Cache hit for {}", index);
            self.state.stats.record_hit();
            return Ok(PageSlot::Ready(page));
        }

        let pending = {
            let mut in_flight = self.state.in_flight.lock();

            if let Some(pending) = in_flight.get(&index) {
                trace!("Joining in-flight fetch for {}", index);
                self.state.stats.record_miss();
                return Ok(PageSlot::Pending(Arc::clone(pending)));
            }

            // Completions insert into the cache before leaving the in-flight
            // map, so a page absent from both really needs a fetch
            if let Some(page) = self.state.cache.get(index) {
                self.state.stats.record_hit();
                return Ok(PageSlot::Ready(page));
            }

            let pending = Arc::new(PendingFetch::new(index));
            in_flight.insert(index, Arc::clone(&pending));
            pending
        };
        self.state.stats.record_miss();

        let (start, end_inclusive) = index.byte_range(self.handle.page_size(), total_size);
        debug!("Cache miss for {}, fetching bytes {}-{}", index, start, end_inclusive);

        let completion = FetchCompletion {
            index,
            state: Arc::clone(&self.state),
            pending: Arc::clone(&pending),
        };
        let request = FetchRequest::new(
            index,
            start,
            end_inclusive,
            Box::new(move |result: Result<Bytes>| {
                let outcome = result.map(|data| {
                    let page = Page::new(index, data, completion.state.cache.next_timestamp());
                    completion.state.cache.put(page)
                });
                completion.finish(outcome);
            }),
        );

        // A rejected request is dropped with its callback, which settles
        // the in-flight entry
        self.scheduler.schedule(request)?;

        Ok(PageSlot::Pending(pending))
    }

    /// Slices `[offset, offset + length)` out of consecutive pages.
    fn assemble(&self, pages: &[Arc<Page>], offset: u64, length: u64) -> Bytes {
        let page_size = self.handle.page_size() as u64;
        let first_page_start = pages[0].index().as_u64() * page_size;
        let skip = (offset - first_page_start) as usize;
        let length = length as usize;

        if let [page] = pages {
            return page.data().slice(skip..skip + length);
        }

        let mut out = BytesMut::with_capacity(length);
        let mut skip = skip;
        for page in pages {
            let remaining = length - out.len();
            let data = &page.data()[skip..];
            out.extend_from_slice(&data[..data.len().min(remaining)]);
            skip = 0;
        }
        out.freeze()
    }
}

impl std::fmt::Debug for VirtualFileReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualFileReader")
            .field("handle", &self.handle)
            .field("cached_pages", &self.state.cache.len())
            .field("workers", &self.scheduler.worker_count())
            .finish()
    }
}
