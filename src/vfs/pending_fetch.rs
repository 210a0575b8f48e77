use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

use crate::cache::Page;
use crate::common::{PageIndex, Result, VfsError, CANCEL_POLL_INTERVAL};

use super::CancellationToken;

/// A page fetch in flight, shared by every reader that needs the page.
///
/// The first reader to miss creates it; later readers attach to it instead
/// of issuing their own request. All of them receive the same outcome.
pub struct PendingFetch {
    page_index: PageIndex,
    result: Mutex<Option<Result<Arc<Page>>>>,
    ready: Condvar,
}

impl PendingFetch {
    pub fn new(page_index: PageIndex) -> Self {
        Self {
            page_index,
            result: Mutex::new(None),
            ready: Condvar::new(),
        }
    }

    pub fn page_index(&self) -> PageIndex {
        self.page_index
    }

    /// Publishes the outcome and wakes every waiter. Only the first call
    /// has an effect.
    pub fn resolve(&self, outcome: Result<Arc<Page>>) {
        let mut result = self.result.lock();
        if result.is_none() {
            *result = Some(outcome);
            self.ready.notify_all();
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.result.lock().is_some()
    }

    /// Blocks until the fetch resolves.
    pub fn wait(&self) -> Result<Arc<Page>> {
        let mut result = self.result.lock();
        loop {
            if let Some(outcome) = result.as_ref() {
                return outcome.clone();
            }
            self.ready.wait(&mut result);
        }
    }

    /// Blocks until the fetch resolves or `token` is cancelled.
    pub fn wait_cancellable(&self, token: &CancellationToken) -> Result<Arc<Page>> {
        let mut result = self.result.lock();
        loop {
            if let Some(outcome) = result.as_ref() {
                return outcome.clone();
            }
            if token.is_cancelled() {
                return Err(VfsError::Cancelled);
            }
            self.ready.wait_for(&mut result, CANCEL_POLL_INTERVAL);
        }
    }
}
