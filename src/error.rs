//! Error types for betwire-client.

use thiserror::Error;

/// Main error type for all betwire operations.
#[derive(Debug, Error)]
pub enum BetwireError {
    /// I/O error during socket operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Connection closed before a complete frame arrived.
    #[error("connection closed mid-frame")]
    ConnectionClosed,

    /// Payload does not fit the 16-bit length prefix.
    #[error("payload of {0} bytes does not fit the 16-bit length prefix")]
    PayloadTooLarge(usize),

    /// Response payload does not parse as expected.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The aggregator answered a batch with its fatal error sentinel.
    #[error("aggregator reported a fatal error")]
    RemoteError,

    /// The record source cannot be read.
    #[error("record source error: {0}")]
    Source(#[from] csv::Error),

    /// A row in the record source has the wrong shape.
    #[error("malformed record on line {line}: expected {expected} fields, got {got}")]
    MalformedRecord {
        /// 1-based row number in the source file.
        line: u64,
        /// Fields a row must have.
        expected: usize,
        /// Fields the row actually had.
        got: usize,
    },
}

/// Result type alias using BetwireError.
pub type Result<T> = std::result::Result<T, BetwireError>;
