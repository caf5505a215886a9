use thiserror::Error;

/// Errors raised by a [`ResultSink`](crate::sink::ResultSink).
///
/// The protocol layer never retries a delivery, it only reports the failure
/// to whoever drives the link.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SinkError {
    #[error("Result rejected: {0}")]
    Rejected(String),

    #[error("Sink unavailable: {0}")]
    Unavailable(String),
}

#[derive(Error, Debug)]
pub enum Error {
    // Protocol errors
    #[error("Checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("Frame decode failed: {0}")]
    Decode(String),

    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    // Delivery errors
    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
