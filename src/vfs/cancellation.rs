use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Signals that a caller has abandoned a read.
///
/// Cancelling only stops the caller from waiting; fetches already in flight
/// still complete and populate the cache.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}
