use thiserror::Error;

/// Errors produced while reading a remote file.
///
/// `Clone` so that a single failed fetch can be delivered to every reader
/// waiting on the same page.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VfsError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Server does not support range requests for {url} (status {status}); check that the host does not compress the file")]
    RangeNotSupported { url: String, status: u16 },

    #[error("Read of {length} bytes at offset {offset} exceeds file size {total_size}")]
    OutOfRange {
        offset: u64,
        length: u64,
        total_size: u64,
    },

    #[error("Size of {url} is unknown; supply the file size explicitly")]
    UnknownSize { url: String },

    #[error("HTTP {status} for URL: {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Short read: expected {expected} bytes, received {actual}")]
    ShortRead { expected: u64, actual: u64 },

    #[error("Invalid Content-Range: {0}")]
    InvalidContentRange(String),

    #[error("Read cancelled")]
    Cancelled,

    #[error("Fetch scheduler error: {0}")]
    Scheduler(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Not a SQLite database: {0}")]
    NotADatabase(String),

    #[error("I/O error ({kind:?}): {message}")]
    Io {
        kind: std::io::ErrorKind,
        message: String,
    },
}

impl VfsError {
    /// Transport failures may succeed when the caller retries; everything
    /// else is a property of the server, the file, or the request.
    pub fn is_retryable(&self) -> bool {
        matches!(self, VfsError::Network(_))
    }
}

impl From<std::io::Error> for VfsError {
    fn from(err: std::io::Error) -> Self {
        VfsError::Io {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for VfsError {
    fn from(err: reqwest::Error) -> Self {
        VfsError::Network(err.to_string())
    }
}

impl From<VfsError> for std::io::Error {
    fn from(err: VfsError) -> Self {
        let kind = match &err {
            VfsError::Io { kind, .. } => *kind,
            VfsError::OutOfRange { .. } => std::io::ErrorKind::UnexpectedEof,
            VfsError::Cancelled => std::io::ErrorKind::Interrupted,
            VfsError::InvalidConfig(_) => std::io::ErrorKind::InvalidInput,
            _ => std::io::ErrorKind::Other,
        };
        std::io::Error::new(kind, err)
    }
}

pub type Result<T> = std::result::Result<T, VfsError>;
