use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::trace;

use crate::common::{PageIndex, Timestamp};

use super::{FetchOrderReplacer, Page};

/// PageCache stores fetched pages keyed by page index.
///
/// Unbounded unless created with [`PageCache::bounded`], in which case the
/// least-recently-fetched page is evicted once the capacity is exceeded.
/// Lookups never change cache state.
pub struct PageCache {
    /// Maximum number of resident pages (None = unbounded)
    capacity: Option<usize>,
    /// Resident pages
    pages: RwLock<HashMap<PageIndex, Arc<Page>>>,
    /// Eviction order for the bounded variant
    replacer: FetchOrderReplacer,
    /// Clock used to stamp `Page::fetched_at`
    clock: AtomicU64,
}

impl PageCache {
    /// Creates an unbounded cache.
    pub fn unbounded() -> Self {
        Self::with_capacity(None)
    }

    /// Creates a cache holding at most `max_pages` pages.
    pub fn bounded(max_pages: usize) -> Self {
        Self::with_capacity(Some(max_pages))
    }

    pub fn with_capacity(capacity: Option<usize>) -> Self {
        Self {
            capacity,
            pages: RwLock::new(HashMap::new()),
            replacer: FetchOrderReplacer::new(),
            clock: AtomicU64::new(0),
        }
    }

    /// Returns the next fetch timestamp.
    pub fn next_timestamp(&self) -> Timestamp {
        self.clock.fetch_add(1, Ordering::Relaxed)
    }

    /// Looks up a page.
    pub fn get(&self, index: PageIndex) -> Option<Arc<Page>> {
        self.pages.read().get(&index).cloned()
    }

    pub fn contains(&self, index: PageIndex) -> bool {
        self.pages.read().contains_key(&index)
    }

    /// Inserts a page, replacing any previous entry for its index wholesale,
    /// and evicts down to capacity. Returns the shared page.
    pub fn put(&self, page: Page) -> Arc<Page> {
        let index = page.index();
        let page = Arc::new(page);

        let mut pages = self.pages.write();
        pages.insert(index, Arc::clone(&page));

        if let Some(capacity) = self.capacity {
            self.replacer.record_fetch(index, page.fetched_at());

            while pages.len() > capacity {
                match self.replacer.evict() {
                    Some(victim) => {
                        trace!("Evicting {}", victim);
                        pages.remove(&victim);
                    }
                    None => break,
                }
            }
        }

        page
    }

    /// Drops every resident page.
    pub fn clear(&self) {
        let mut pages = self.pages.write();
        pages.clear();
        self.replacer.clear();
    }

    /// Returns the number of resident pages.
    pub fn len(&self) -> usize {
        self.pages.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.read().is_empty()
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Returns the total number of bytes held by resident pages.
    pub fn cached_bytes(&self) -> u64 {
        self.pages.read().values().map(|p| p.len() as u64).sum()
    }
}

impl Default for PageCache {
    fn default() -> Self {
        Self::unbounded()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn page(cache: &PageCache, index: u64, fill: u8) -> Page {
        Page::new(
            PageIndex::new(index),
            Bytes::from(vec![fill; 16]),
            cache.next_timestamp(),
        )
    }

    #[test]
    fn test_page_cache_get_put() {
        let cache = PageCache::unbounded();
        assert!(cache.is_empty());
        assert!(cache.get(PageIndex::new(0)).is_none());

        cache.put(page(&cache, 0, 0xAB));

        let hit = cache.get(PageIndex::new(0)).unwrap();
        assert_eq!(hit.index(), PageIndex::new(0));
        assert_eq!(hit.data()[0], 0xAB);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.cached_bytes(), 16);
    }

    #[test]
    fn test_page_cache_unbounded_keeps_everything() {
        let cache = PageCache::unbounded();
        for i in 0..1000 {
            cache.put(page(&cache, i, i as u8));
        }
        assert_eq!(cache.len(), 1000);
        assert_eq!(cache.capacity(), None);
    }

    #[test]
    fn test_page_cache_put_replaces_wholesale() {
        let cache = PageCache::unbounded();
        cache.put(page(&cache, 3, 1));
        let held = cache.get(PageIndex::new(3)).unwrap();

        cache.put(page(&cache, 3, 2));

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(PageIndex::new(3)).unwrap().data()[0], 2);
        // Readers holding the old page keep seeing the old bytes
        assert!(held.data().iter().all(|&b| b == 1));
    }

    #[test]
    fn test_page_cache_bounded_evicts_least_recently_fetched() {
        let cache = PageCache::bounded(2);

        cache.put(page(&cache, 0, 0));
        cache.put(page(&cache, 1, 1));
        // Lookups do not refresh page 0
        assert!(cache.get(PageIndex::new(0)).is_some());
        cache.put(page(&cache, 2, 2));

        assert_eq!(cache.len(), 2);
        assert!(!cache.contains(PageIndex::new(0)));
        assert!(cache.contains(PageIndex::new(1)));
        assert!(cache.contains(PageIndex::new(2)));
    }

    #[test]
    fn test_page_cache_clear() {
        let cache = PageCache::bounded(4);
        cache.put(page(&cache, 0, 0));
        cache.put(page(&cache, 1, 1));
        assert_eq!(cache.len(), 2);

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.cached_bytes(), 0);
    }
}
