use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, warn};

use crate::common::{Result, StatsCollector, VfsError};

use super::{Transport, TransportResponse, STATUS_OK, STATUS_PARTIAL_CONTENT};

/// A parsed `Content-Range: bytes start-end/total` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentRange {
    pub start: u64,
    pub end_inclusive: u64,
    /// None when the server reports `*`
    pub total: Option<u64>,
}

impl ContentRange {
    /// Parses the header value. Unsatisfied ranges (`bytes */total`) are
    /// rejected since they carry no byte range.
    pub fn parse(value: &str) -> Result<Self> {
        let invalid = || VfsError::InvalidContentRange(value.to_string());

        let rest = value.trim().strip_prefix("bytes").ok_or_else(invalid)?.trim_start();
        let (range, total) = rest.split_once('/').ok_or_else(invalid)?;
        let (start, end) = range.split_once('-').ok_or_else(invalid)?;

        let start = start.trim().parse::<u64>().map_err(|_| invalid())?;
        let end_inclusive = end.trim().parse::<u64>().map_err(|_| invalid())?;
        let total = match total.trim() {
            "*" => None,
            t => Some(t.parse::<u64>().map_err(|_| invalid())?),
        };

        if end_inclusive < start {
            return Err(invalid());
        }

        Ok(Self {
            start,
            end_inclusive,
            total,
        })
    }
}

/// RangeFetcher issues single ranged requests against a remote file and
/// records every network access in the owning handle's stats.
pub struct RangeFetcher {
    transport: Arc<dyn Transport>,
    stats: Arc<StatsCollector>,
}

impl RangeFetcher {
    pub fn new(transport: Arc<dyn Transport>, stats: Arc<StatsCollector>) -> Self {
        Self { transport, stats }
    }

    pub fn stats(&self) -> &Arc<StatsCollector> {
        &self.stats
    }

    /// Fetches bytes `[start, end_inclusive]` of `url` with one request.
    ///
    /// Fails with `RangeNotSupported` when the server ignores the `Range`
    /// header, and with `ShortRead` rather than returning fewer bytes than
    /// requested.
    pub fn fetch_range(&self, url: &str, start: u64, end_inclusive: u64) -> Result<Bytes> {
        debug_assert!(start <= end_inclusive);
        let expected = end_inclusive - start + 1;

        debug!("Fetching bytes {}-{} of {}", start, end_inclusive, url);
        let response = self.send(|t| t.get_range(url, start, end_inclusive))?;

        match response.status {
            STATUS_PARTIAL_CONTENT => {}
            STATUS_OK => {
                warn!("{} ignored the Range header (status 200)", url);
                return Err(VfsError::RangeNotSupported {
                    url: url.to_string(),
                    status: response.status,
                });
            }
            status => {
                return Err(VfsError::HttpStatus {
                    url: url.to_string(),
                    status,
                })
            }
        }

        // A compressed partial body is a slice of the compressed stream, not
        // of the file
        if let Some(encoding) = response.content_encoding.as_deref() {
            if !encoding.eq_ignore_ascii_case("identity") {
                warn!("{} served a ranged response with {} encoding", url, encoding);
                return Err(VfsError::RangeNotSupported {
                    url: url.to_string(),
                    status: response.status,
                });
            }
        }

        if let Some(header) = response.content_range.as_deref() {
            let range = ContentRange::parse(header)?;
            if range.start != start || range.end_inclusive > end_inclusive {
                return Err(VfsError::InvalidContentRange(format!(
                    "requested bytes {}-{}, server sent {}",
                    start, end_inclusive, header
                )));
            }
        }

        let actual = response.body.len() as u64;
        if actual < expected {
            return Err(VfsError::ShortRead { expected, actual });
        }
        if actual > expected {
            return Err(VfsError::InvalidContentRange(format!(
                "requested {} bytes, received {}",
                expected, actual
            )));
        }

        Ok(response.body)
    }

    /// Discovers the size of `url`.
    ///
    /// Tries `HEAD` first, then a one-byte ranged GET whose `Content-Range`
    /// total reveals the size. Returns `Ok(None)` when neither reports it.
    /// Probes are counted as `probe_requests`, never as read traffic.
    pub fn probe_size(&self, url: &str) -> Result<Option<u64>> {
        let head = self.send_probe(|t| t.head(url))?;
        if (200..300).contains(&head.status) && head.content_encoding.is_none() {
            if let Some(len) = head.content_length {
                debug!("HEAD {} reported {} bytes", url, len);
                return Ok(Some(len));
            }
        }

        let probe = self.send_probe(|t| t.get_range(url, 0, 0))?;
        match probe.status {
            STATUS_PARTIAL_CONTENT => {
                let total = match probe.content_range.as_deref() {
                    Some(header) => ContentRange::parse(header)?.total,
                    None => None,
                };
                debug!("Ranged probe of {} reported size {:?}", url, total);
                Ok(total)
            }
            STATUS_OK => {
                warn!("{} ignored the Range header during size probe", url);
                Err(VfsError::RangeNotSupported {
                    url: url.to_string(),
                    status: probe.status,
                })
            }
            status => Err(VfsError::HttpStatus {
                url: url.to_string(),
                status,
            }),
        }
    }

    /// Sends one request and records it, counting the bytes actually received.
    fn send<F>(&self, request: F) -> Result<TransportResponse>
    where
        F: FnOnce(&dyn Transport) -> Result<TransportResponse>,
    {
        let result = request(self.transport.as_ref());
        let received = result.as_ref().map(|r| r.body.len() as u64).unwrap_or(0);
        self.stats.record_request(received);
        result
    }

    /// Sends one size-discovery request and records it as a probe.
    fn send_probe<F>(&self, request: F) -> Result<TransportResponse>
    where
        F: FnOnce(&dyn Transport) -> Result<TransportResponse>,
    {
        let result = request(self.transport.as_ref());
        self.stats.record_probe();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryTransport;

    const URL: &str = "http://example.com/test.db";

    fn reference(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    fn fetcher(transport: MemoryTransport) -> (RangeFetcher, Arc<MemoryTransport>) {
        let transport = Arc::new(transport);
        let fetcher = RangeFetcher::new(transport.clone(), Arc::new(StatsCollector::new()));
        (fetcher, transport)
    }

    #[test]
    fn test_content_range_parse() {
        let range = ContentRange::parse("bytes 0-1023/10000").unwrap();
        assert_eq!(range.start, 0);
        assert_eq!(range.end_inclusive, 1023);
        assert_eq!(range.total, Some(10_000));

        let unknown = ContentRange::parse("bytes 5-9/*").unwrap();
        assert_eq!(unknown.total, None);

        assert!(ContentRange::parse("bytes */10000").is_err());
        assert!(ContentRange::parse("items 0-1/2").is_err());
        assert!(ContentRange::parse("bytes 9-5/10").is_err());
    }

    #[test]
    fn test_fetch_range_returns_exact_bytes() {
        let data = reference(10_000);
        let (fetcher, _) = fetcher(MemoryTransport::new(data.clone()));

        let bytes = fetcher.fetch_range(URL, 1024, 2047).unwrap();
        assert_eq!(&bytes[..], &data[1024..2048]);
        assert_eq!(fetcher.stats().total_requests(), 1);
        assert_eq!(fetcher.stats().total_bytes(), 1024);
    }

    #[test]
    fn test_fetch_range_full_content_is_range_not_supported() {
        let (fetcher, _) = fetcher(MemoryTransport::new(reference(100)).without_range_support());

        let err = fetcher.fetch_range(URL, 0, 9).unwrap_err();
        assert!(matches!(err, VfsError::RangeNotSupported { status: 200, .. }));
        assert_eq!(fetcher.stats().total_requests(), 1);
    }

    #[test]
    fn test_fetch_range_past_end_is_short_read() {
        let (fetcher, _) = fetcher(MemoryTransport::new(reference(100)));

        // Server clips to the file end; the fetcher must not pass that on
        let err = fetcher.fetch_range(URL, 90, 109).unwrap_err();
        assert_eq!(
            err,
            VfsError::ShortRead {
                expected: 20,
                actual: 10
            }
        );
        // The bytes still crossed the network
        assert_eq!(fetcher.stats().total_bytes(), 10);
    }

    #[test]
    fn test_fetch_range_network_error() {
        let (fetcher, transport) = fetcher(MemoryTransport::new(reference(100)));
        transport.set_failing(true);

        let err = fetcher.fetch_range(URL, 0, 9).unwrap_err();
        assert!(matches!(err, VfsError::Network(_)));
        assert!(err.is_retryable());
        assert_eq!(fetcher.stats().total_requests(), 1);
        assert_eq!(fetcher.stats().total_bytes(), 0);
    }

    #[test]
    fn test_fetch_range_unsatisfiable_is_http_status() {
        let (fetcher, _) = fetcher(MemoryTransport::new(reference(100)));

        let err = fetcher.fetch_range(URL, 200, 299).unwrap_err();
        assert!(matches!(err, VfsError::HttpStatus { status: 416, .. }));
    }

    #[test]
    fn test_probe_size_uses_head() {
        let (fetcher, transport) = fetcher(MemoryTransport::new(reference(10_000)));

        assert_eq!(fetcher.probe_size(URL).unwrap(), Some(10_000));
        assert_eq!(transport.head_requests(), 1);
        assert_eq!(transport.range_requests(), 0);
    }

    #[test]
    fn test_probe_size_hidden_size() {
        let (fetcher, transport) = fetcher(MemoryTransport::new(reference(10_000)).without_size());

        assert_eq!(fetcher.probe_size(URL).unwrap(), None);
        assert_eq!(transport.range_requests(), 1);
        // HEAD plus the ranged probe, neither counted as read traffic
        assert_eq!(fetcher.stats().probe_requests(), 2);
        assert_eq!(fetcher.stats().total_requests(), 0);
        assert_eq!(fetcher.stats().total_bytes(), 0);
    }

    #[test]
    fn test_fetch_range_compressed_partial_is_range_not_supported() {
        let (fetcher, _) = fetcher(MemoryTransport::new(reference(1000)).with_encoding("gzip"));

        let err = fetcher.fetch_range(URL, 0, 99).unwrap_err();
        assert!(matches!(err, VfsError::RangeNotSupported { status: 206, .. }));
    }

    #[test]
    fn test_fetch_range_identity_encoding_is_accepted() {
        let data = reference(1000);
        let (fetcher, _) = fetcher(MemoryTransport::new(data.clone()).with_encoding("identity"));

        assert_eq!(&fetcher.fetch_range(URL, 0, 99).unwrap()[..], &data[..100]);
    }

    #[test]
    fn test_fetch_range_mismatched_content_range() {
        let (fetcher, _) = fetcher(MemoryTransport::new(reference(1000)).with_range_skew(1));

        let err = fetcher.fetch_range(URL, 100, 199).unwrap_err();
        assert!(matches!(err, VfsError::InvalidContentRange(_)));
    }

    #[test]
    fn test_fetch_range_oversized_body() {
        let (fetcher, _) = fetcher(MemoryTransport::new(reference(1000)).with_trailing_bytes(3));

        let err = fetcher.fetch_range(URL, 100, 199).unwrap_err();
        assert!(matches!(err, VfsError::InvalidContentRange(_)));
        // The extra bytes still crossed the network
        assert_eq!(fetcher.stats().total_bytes(), 103);
    }

    #[test]
    fn test_probe_size_ignores_compressed_head() {
        let (fetcher, transport) =
            fetcher(MemoryTransport::new(reference(10_000)).with_encoding("gzip"));

        assert_eq!(fetcher.probe_size(URL).unwrap(), Some(10_000));
        assert_eq!(transport.head_requests(), 1);
        assert_eq!(transport.range_requests_starting_at(0), 1);
    }
}
