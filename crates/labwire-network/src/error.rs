use labwire_core::SinkError;
use std::net::SocketAddr;
use thiserror::Error;

/// Errors that can occur while driving an analyzer link.
///
/// Protocol content never produces an error: corrupted frames, noise and
/// incomplete transmissions are logged and skipped by the session. What
/// remains are transport failures and, on the simulator side, unexpected
/// answers from the host.
#[derive(Debug, Error)]
pub enum LinkError {
    /// Failed to bind the listening socket
    #[error("Failed to bind to {addr}: {source}")]
    BindFailed {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// Serial port could not be opened or configured
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// No reply within the configured timeout
    #[error("No reply after {0}ms")]
    Timeout(u64),

    /// Host answered with something other than ACK or NAK
    #[error("Unexpected reply byte 0x{0:02X}")]
    UnexpectedReply(u8),

    /// Peer closed the connection while a reply was expected
    #[error("Connection closed by peer")]
    ConnectionClosed,

    /// Result sink refused or failed a delivery
    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),

    /// Error surfaced by the protocol codec
    #[error("Protocol error: {0}")]
    Protocol(#[from] labwire_core::Error),

    /// Low-level I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
