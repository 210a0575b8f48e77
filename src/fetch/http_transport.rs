use std::time::Duration;

use bytes::Bytes;
use reqwest::blocking::{Client, Response};
use reqwest::header::{CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_RANGE, RANGE};

use crate::common::{Result, DEFAULT_REQUEST_TIMEOUT};

use super::{Transport, TransportResponse, STATUS_PARTIAL_CONTENT};

/// Transport backed by a blocking reqwest client.
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Creates a transport with the default request timeout.
    pub fn new() -> Result<Self> {
        Self::with_timeout(DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("httpvfs/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    /// Wraps a preconfigured client (proxies, TLS roots, headers).
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    fn header(response: &Response, name: reqwest::header::HeaderName) -> Option<String> {
        response
            .headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(String::from)
    }

    fn into_transport_response(response: Response, read_body: bool) -> Result<TransportResponse> {
        let status = response.status().as_u16();
        // Read the header directly: the body size hint of a HEAD response is 0
        let content_length =
            Self::header(&response, CONTENT_LENGTH).and_then(|v| v.trim().parse::<u64>().ok());
        let content_range = Self::header(&response, CONTENT_RANGE);
        let content_encoding = Self::header(&response, CONTENT_ENCODING);

        let body = if read_body && status == STATUS_PARTIAL_CONTENT {
            response.bytes()?
        } else {
            Bytes::new()
        };

        Ok(TransportResponse {
            status,
            content_length,
            content_range,
            content_encoding,
            body,
        })
    }
}

impl Transport for HttpTransport {
    fn get_range(&self, url: &str, start: u64, end_inclusive: u64) -> Result<TransportResponse> {
        let response = self
            .client
            .get(url)
            .header(RANGE, format!("bytes={}-{}", start, end_inclusive))
            .send()?;
        Self::into_transport_response(response, true)
    }

    fn head(&self, url: &str) -> Result<TransportResponse> {
        let response = self.client.head(url).send()?;
        Self::into_transport_response(response, false)
    }
}
