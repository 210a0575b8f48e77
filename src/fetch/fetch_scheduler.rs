use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use bytes::Bytes;
use crossbeam_channel::{bounded, Receiver, Sender};
use tracing::{error, trace};

use crate::common::{PageIndex, Result, VfsError, FETCH_QUEUE_CAPACITY};

use super::RangeFetcher;

/// Completion callback invoked on the worker thread with the fetch outcome
pub type FetchCallback = Box<dyn FnOnce(Result<Bytes>) + Send>;

/// Represents one page fetch
pub struct FetchRequest {
    /// The page being fetched
    pub page_index: PageIndex,
    /// First byte of the page
    pub start: u64,
    /// Last byte of the page (inclusive)
    pub end_inclusive: u64,
    /// Receives the fetched bytes or the error
    pub callback: FetchCallback,
}

impl FetchRequest {
    pub fn new(page_index: PageIndex, start: u64, end_inclusive: u64, callback: FetchCallback) -> Self {
        Self {
            page_index,
            start,
            end_inclusive,
            callback,
        }
    }
}

/// FetchScheduler manages a pool of background worker threads that perform
/// range fetches for one remote file. Requests for distinct pages run in
/// parallel with no ordering guarantees.
pub struct FetchScheduler {
    /// Channel sender for queuing requests
    request_sender: Sender<FetchRequest>,
    /// Flag to signal shutdown
    shutdown: Arc<AtomicBool>,
    /// Handles to the background worker threads
    worker_handles: Vec<JoinHandle<()>>,
}

impl FetchScheduler {
    /// Creates a new FetchScheduler fetching from `url` with `workers` threads.
    pub fn new(fetcher: Arc<RangeFetcher>, url: impl Into<String>, workers: usize) -> Self {
        let (sender, receiver) = bounded::<FetchRequest>(FETCH_QUEUE_CAPACITY);
        let shutdown = Arc::new(AtomicBool::new(false));
        let url: Arc<str> = Arc::from(url.into());

        let worker_handles = (0..workers.max(1))
            .map(|_| {
                let fetcher = Arc::clone(&fetcher);
                let receiver = receiver.clone();
                let shutdown = Arc::clone(&shutdown);
                let url = Arc::clone(&url);
                thread::spawn(move || {
                    Self::start_worker_thread(&fetcher, &url, receiver, shutdown);
                })
            })
            .collect();

        Self {
            request_sender: sender,
            shutdown,
            worker_handles,
        }
    }

    /// Queues a fetch for processing by the worker pool.
    pub fn schedule(&self, request: FetchRequest) -> Result<()> {
        self.request_sender
            .send(request)
            .map_err(|e| VfsError::Scheduler(format!("Failed to schedule fetch: {}", e)))
    }

    /// Returns the number of worker threads.
    pub fn worker_count(&self) -> usize {
        self.worker_handles.len()
    }

    /// The background worker thread function.
    /// Processes requests from the queue until shutdown is signaled.
    fn start_worker_thread(
        fetcher: &RangeFetcher,
        url: &str,
        receiver: Receiver<FetchRequest>,
        shutdown: Arc<AtomicBool>,
    ) {
        loop {
            if shutdown.load(Ordering::Relaxed) {
                // Queued fetches still complete so their waiters are resolved
                while let Ok(request) = receiver.try_recv() {
                    Self::process_request(fetcher, url, request);
                }
                break;
            }

            match receiver.recv_timeout(Duration::from_millis(100)) {
                Ok(request) => Self::process_request(fetcher, url, request),
                Err(crossbeam_channel::RecvTimeoutError::Timeout) => {}
                Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
            }
        }
    }

    /// Runs one fetch and hands the outcome to its callback. A panic in
    /// either is contained so the worker keeps serving the queue.
    fn process_request(fetcher: &RangeFetcher, url: &str, request: FetchRequest) {
        let FetchRequest {
            page_index,
            start,
            end_inclusive,
            callback,
        } = request;
        trace!("Worker fetching {}", page_index);

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            fetcher.fetch_range(url, start, end_inclusive)
        }))
        .unwrap_or_else(|_| {
            error!("Fetch of {} panicked", page_index);
            Err(VfsError::Scheduler(format!("Fetch of {} panicked", page_index)))
        });

        if panic::catch_unwind(AssertUnwindSafe(move || callback(result))).is_err() {
            error!("Completion callback for {} panicked", page_index);
        }
    }
}

impl Drop for FetchScheduler {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);

        for handle in self.worker_handles.drain(..) {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::StatsCollector;
    use crate::fetch::{Transport, TransportResponse};
    use crate::testing::MemoryTransport;
    use std::sync::mpsc;

    const URL: &str = "http://example.com/test.db";

    fn scheduler(data: Vec<u8>, workers: usize) -> (FetchScheduler, Arc<StatsCollector>) {
        let transport = Arc::new(MemoryTransport::new(data));
        let stats = Arc::new(StatsCollector::new());
        let fetcher = Arc::new(RangeFetcher::new(transport, Arc::clone(&stats)));
        (FetchScheduler::new(fetcher, URL, workers), stats)
    }

    /// Transport whose every call panics
    struct PanickingTransport;

    impl Transport for PanickingTransport {
        fn get_range(&self, _url: &str, _start: u64, _end_inclusive: u64) -> Result<TransportResponse> {
            panic!("connection pool corrupted");
        }

        fn head(&self, _url: &str) -> Result<TransportResponse> {
            panic!("connection pool corrupted");
        }
    }

    fn send_result(tx: mpsc::Sender<Result<Bytes>>) -> FetchCallback {
        Box::new(move |result: Result<Bytes>| {
            let _ = tx.send(result);
        })
    }

    #[test]
    fn test_fetch_scheduler_delivers_result() {
        let data: Vec<u8> = (0..=255u8).collect();
        let (scheduler, stats) = scheduler(data.clone(), 2);
        assert_eq!(scheduler.worker_count(), 2);

        let (tx, rx) = mpsc::channel();
        scheduler
            .schedule(FetchRequest::new(
                PageIndex::new(1),
                16,
                31,
                Box::new(move |result: Result<Bytes>| {
                    let _ = tx.send(result);
                }),
            ))
            .unwrap();

        let bytes = rx.recv().unwrap().unwrap();
        assert_eq!(&bytes[..], &data[16..32]);
        assert_eq!(stats.total_requests(), 1);
    }

    #[test]
    fn test_fetch_scheduler_delivers_errors() {
        let (scheduler, _) = scheduler(vec![0u8; 64], 1);

        let (tx, rx) = mpsc::channel();
        scheduler
            .schedule(FetchRequest::new(
                PageIndex::new(0),
                0,
                127,
                Box::new(move |result: Result<Bytes>| {
                    let _ = tx.send(result);
                }),
            ))
            .unwrap();

        assert!(matches!(
            rx.recv().unwrap(),
            Err(VfsError::ShortRead { expected: 128, actual: 64 })
        ));
    }

    #[test]
    fn test_fetch_scheduler_drop_completes_queued_requests() {
        let (scheduler, _) = scheduler(vec![7u8; 4096], 1);
        let (tx, rx) = mpsc::channel();

        for i in 0..8u64 {
            let tx = tx.clone();
            scheduler
                .schedule(FetchRequest::new(
                    PageIndex::new(i),
                    i * 512,
                    i * 512 + 511,
                    Box::new(move |result: Result<Bytes>| {
                        let _ = tx.send(result.is_ok());
                    }),
                ))
                .unwrap();
        }
        drop(tx);
        drop(scheduler);

        let completed: Vec<bool> = rx.iter().collect();
        assert_eq!(completed.len(), 8);
        assert!(completed.into_iter().all(|ok| ok));
    }

    #[test]
    fn test_fetch_scheduler_transport_panic_becomes_error() {
        let fetcher = Arc::new(RangeFetcher::new(
            Arc::new(PanickingTransport),
            Arc::new(StatsCollector::new()),
        ));
        let scheduler = FetchScheduler::new(fetcher, URL, 1);

        let (tx, rx) = mpsc::channel();
        for i in 0..2u64 {
            scheduler
                .schedule(FetchRequest::new(PageIndex::new(i), 0, 15, send_result(tx.clone())))
                .unwrap();
        }

        // The single worker survives the first panic and serves the second request
        for _ in 0..2 {
            assert!(matches!(rx.recv().unwrap(), Err(VfsError::Scheduler(_))));
        }
    }

    #[test]
    fn test_fetch_scheduler_survives_callback_panic() {
        let data: Vec<u8> = (0..=255u8).collect();
        let (scheduler, _) = scheduler(data.clone(), 1);

        scheduler
            .schedule(FetchRequest::new(
                PageIndex::new(0),
                0,
                15,
                Box::new(|_result: Result<Bytes>| panic!("waiter bookkeeping failed")),
            ))
            .unwrap();

        let (tx, rx) = mpsc::channel();
        scheduler
            .schedule(FetchRequest::new(PageIndex::new(1), 16, 31, send_result(tx)))
            .unwrap();

        let bytes = rx.recv().unwrap().unwrap();
        assert_eq!(&bytes[..], &data[16..32]);
    }
}
