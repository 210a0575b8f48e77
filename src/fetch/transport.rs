use bytes::Bytes;

use crate::common::Result;

/// HTTP status for a successful ranged response
pub const STATUS_PARTIAL_CONTENT: u16 = 206;

/// HTTP status for a full-content response
pub const STATUS_OK: u16 = 200;

/// The parts of an HTTP response the range fetcher inspects.
#[derive(Debug, Clone, Default)]
pub struct TransportResponse {
    pub status: u16,
    /// `Content-Length` header, if present
    pub content_length: Option<u64>,
    /// Raw `Content-Range` header, if present
    pub content_range: Option<String>,
    /// `Content-Encoding` header, if present
    pub content_encoding: Option<String>,
    /// Response body. Left empty for anything but a partial-content
    /// response so a full download is never triggered by accident.
    pub body: Bytes,
}

/// A blocking HTTP client capable of ranged GETs and HEAD requests.
///
/// Transport errors surface as `VfsError::Network`; HTTP-level outcomes
/// (including non-206 statuses) are returned as responses for the
/// `RangeFetcher` to judge.
pub trait Transport: Send + Sync {
    /// Issues `GET url` with `Range: bytes=start-end_inclusive`.
    fn get_range(&self, url: &str, start: u64, end_inclusive: u64) -> Result<TransportResponse>;

    /// Issues `HEAD url`.
    fn head(&self, url: &str) -> Result<TransportResponse>;
}
