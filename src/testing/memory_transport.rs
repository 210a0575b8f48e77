use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;

use crate::common::{Result, VfsError};
use crate::fetch::{Transport, TransportResponse, STATUS_OK, STATUS_PARTIAL_CONTENT};

/// An in-memory transport serving a fixed byte array.
///
/// Behaves like a static file host and can be switched into the failure
/// modes real hosts exhibit: ignoring `Range` (answering 200), hiding the
/// file size, compressing responses, misreporting ranges, dropping
/// connections, or responding slowly.
pub struct MemoryTransport {
    data: Bytes,
    supports_ranges: AtomicBool,
    reports_size: AtomicBool,
    failing: AtomicBool,
    latency: Mutex<Option<Duration>>,
    /// `Content-Encoding` sent on HEAD and partial responses
    encoding: Option<String>,
    /// Added to the start reported in `Content-Range`
    range_skew: u64,
    /// Extra bytes appended to every partial body
    trailing_bytes: usize,
    head_requests: AtomicU64,
    /// Every ranged GET received, as `(start, end_inclusive)`
    range_log: Mutex<Vec<(u64, u64)>>,
}

impl MemoryTransport {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            supports_ranges: AtomicBool::new(true),
            reports_size: AtomicBool::new(true),
            failing: AtomicBool::new(false),
            latency: Mutex::new(None),
            encoding: None,
            range_skew: 0,
            trailing_bytes: 0,
            head_requests: AtomicU64::new(0),
            range_log: Mutex::new(Vec::new()),
        }
    }

    /// Answers ranged GETs with 200 and the full body, like a host that
    /// compresses on the fly.
    pub fn without_range_support(self) -> Self {
        self.supports_ranges.store(false, Ordering::SeqCst);
        self
    }

    /// Omits `Content-Length` and reports `*` as the Content-Range total.
    pub fn without_size(self) -> Self {
        self.reports_size.store(false, Ordering::SeqCst);
        self
    }

    /// Delays every request by `latency`.
    pub fn with_latency(self, latency: Duration) -> Self {
        *self.latency.lock() = Some(latency);
        self
    }

    /// Labels HEAD and partial responses with `Content-Encoding: encoding`.
    pub fn with_encoding(mut self, encoding: &str) -> Self {
        self.encoding = Some(encoding.to_string());
        self
    }

    /// Reports a `Content-Range` starting `skew` bytes after the real start.
    pub fn with_range_skew(mut self, skew: u64) -> Self {
        self.range_skew = skew;
        self
    }

    /// Appends `count` bytes past the requested range to every partial body.
    pub fn with_trailing_bytes(mut self, count: usize) -> Self {
        self.trailing_bytes = count;
        self
    }

    /// While set, every request fails with a network error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Number of ranged GETs received.
    pub fn range_requests(&self) -> usize {
        self.range_log.lock().len()
    }

    /// Number of ranged GETs whose range started at `start`.
    pub fn range_requests_starting_at(&self, start: u64) -> usize {
        self.range_log
            .lock()
            .iter()
            .filter(|(s, _)| *s == start)
            .count()
    }

    pub fn head_requests(&self) -> u64 {
        self.head_requests.load(Ordering::SeqCst)
    }

    fn simulate_network(&self) -> Result<()> {
        let latency = *self.latency.lock();
        if let Some(latency) = latency {
            thread::sleep(latency);
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(VfsError::Network("connection refused".into()));
        }
        Ok(())
    }

    fn size_field(&self) -> String {
        if self.reports_size.load(Ordering::SeqCst) {
            self.data.len().to_string()
        } else {
            "*".to_string()
        }
    }
}

impl Transport for MemoryTransport {
    fn get_range(&self, _url: &str, start: u64, end_inclusive: u64) -> Result<TransportResponse> {
        self.range_log.lock().push((start, end_inclusive));
        self.simulate_network()?;

        let len = self.data.len() as u64;
        let reports_size = self.reports_size.load(Ordering::SeqCst);

        if !self.supports_ranges.load(Ordering::SeqCst) {
            return Ok(TransportResponse {
                status: STATUS_OK,
                content_length: reports_size.then_some(len),
                content_range: None,
                content_encoding: Some("gzip".into()),
                body: Bytes::new(),
            });
        }

        if start >= len || start > end_inclusive {
            return Ok(TransportResponse {
                status: 416,
                content_range: Some(format!("bytes */{}", self.size_field())),
                ..Default::default()
            });
        }

        let end = end_inclusive.min(len - 1);
        let mut body = self.data.slice(start as usize..=end as usize);
        if self.trailing_bytes > 0 {
            let mut padded = body.to_vec();
            padded.resize(padded.len() + self.trailing_bytes, 0);
            body = Bytes::from(padded);
        }

        Ok(TransportResponse {
            status: STATUS_PARTIAL_CONTENT,
            content_length: Some(body.len() as u64),
            content_range: Some(format!(
                "bytes {}-{}/{}",
                start + self.range_skew,
                end,
                self.size_field()
            )),
            content_encoding: self.encoding.clone(),
            body,
        })
    }

    fn head(&self, _url: &str) -> Result<TransportResponse> {
        self.head_requests.fetch_add(1, Ordering::SeqCst);
        self.simulate_network()?;

        Ok(TransportResponse {
            status: STATUS_OK,
            content_length: self
                .reports_size
                .load(Ordering::SeqCst)
                .then_some(self.data.len() as u64),
            content_encoding: self.encoding.clone(),
            ..Default::default()
        })
    }
}
