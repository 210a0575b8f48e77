use std::collections::HashMap;

use parking_lot::Mutex;

use crate::common::{PageIndex, Timestamp};

/// Least-recently-fetched replacement policy.
///
/// Tracks the fetch timestamp of every resident page and evicts the page
/// fetched earliest. Cache hits do not refresh a page's position, so a hot
/// page is evicted once enough newer pages have been fetched after it.
pub struct FetchOrderReplacer {
    /// Fetch timestamp of each tracked page
    fetched_at: Mutex<HashMap<PageIndex, Timestamp>>,
}

impl FetchOrderReplacer {
    pub fn new() -> Self {
        Self {
            fetched_at: Mutex::new(HashMap::new()),
        }
    }

    /// Records that `index` was (re)fetched at `timestamp`, replacing any
    /// previous record for the page.
    pub fn record_fetch(&self, index: PageIndex, timestamp: Timestamp) {
        self.fetched_at.lock().insert(index, timestamp);
    }

    /// Evicts the page with the earliest fetch timestamp.
    /// Returns None if no pages are tracked.
    pub fn evict(&self) -> Option<PageIndex> {
        let mut fetched_at = self.fetched_at.lock();

        let victim = fetched_at
            .iter()
            .min_by_key(|(index, ts)| (**ts, **index))
            .map(|(index, _)| *index);

        if let Some(index) = victim {
            fetched_at.remove(&index);
        }

        victim
    }

    /// Removes every tracked page.
    pub fn clear(&self) {
        self.fetched_at.lock().clear();
    }

    /// Returns the number of tracked pages.
    pub fn size(&self) -> usize {
        self.fetched_at.lock().len()
    }
}

impl Default for FetchOrderReplacer {
    fn default() -> Self {
        Self::new()
    }
}
