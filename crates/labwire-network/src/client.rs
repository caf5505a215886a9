//! Analyzer simulator.
//!
//! `AnalyzerClient` plays the instrument side of the link: it connects to a
//! host, sends ENQ, one frame at a time and EOT, waiting for the host's
//! answer after each step, as the EC90 does. Used by the `send` command and
//! by tests.
//!
//! # Example Usage
//!
//! ```no_run
//! use labwire_network::{AnalyzerClient, AnalyzerClientConfig};
//! use labwire_protocol::TransmissionBuilder;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut client = AnalyzerClient::connect(AnalyzerClientConfig::default()).await?;
//!
//! let tx = TransmissionBuilder::new()
//!     .record("P|1|S100")
//!     .record("R|1|^^Na|140|mmol/L");
//! let report = client.send_transmission(&tx).await?;
//! assert_eq!(report.naks, 0);
//! # Ok(())
//! # }
//! ```

use labwire_core::constants::{ACK, DEFAULT_TCP_PORT, ENQ, EOT, NAK};
use labwire_protocol::TransmissionBuilder;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, info, trace, warn};

use crate::error::LinkError;

/// Configuration for the analyzer simulator
#[derive(Debug, Clone)]
pub struct AnalyzerClientConfig {
    /// Host address to connect to
    pub server_addr: SocketAddr,

    /// Timeout for connecting and for each reply
    pub timeout: Duration,
}

impl Default for AnalyzerClientConfig {
    fn default() -> Self {
        Self {
            server_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_TCP_PORT)),
            timeout: Duration::from_millis(3000),
        }
    }
}

/// Host answers collected while sending one transmission.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransmissionReport {
    pub frames_sent: usize,
    pub acks: usize,
    pub naks: usize,
}

/// Instrument-side TCP client.
pub struct AnalyzerClient {
    stream: TcpStream,
    timeout: Duration,
}

impl AnalyzerClient {
    /// Connect to a host.
    ///
    /// # Errors
    ///
    /// Returns `LinkError::Timeout` if the connection is not established
    /// within the configured timeout, `LinkError::Io` if it is refused.
    pub async fn connect(config: AnalyzerClientConfig) -> Result<Self, LinkError> {
        info!(addr = %config.server_addr, "Connecting to host");

        let stream = tokio::time::timeout(config.timeout, TcpStream::connect(config.server_addr))
            .await
            .map_err(|_| LinkError::Timeout(config.timeout.as_millis() as u64))??;

        if let Err(e) = stream.set_nodelay(true) {
            warn!(error = %e, "Failed to set TCP_NODELAY");
        }

        Ok(Self {
            stream,
            timeout: config.timeout,
        })
    }

    /// Send a whole transmission, waiting for the host after every step.
    ///
    /// A NAK for a frame is counted but the frame is not retransmitted.
    ///
    /// # Errors
    ///
    /// Fails if the host does not acknowledge ENQ or EOT, answers with an
    /// unexpected byte, stays silent past the timeout, or disconnects.
    pub async fn send_transmission(
        &mut self,
        tx: &TransmissionBuilder,
    ) -> Result<TransmissionReport, LinkError> {
        let mut report = TransmissionReport::default();

        self.write(&[ENQ]).await?;
        self.expect_ack().await?;
        report.acks += 1;

        for frame in tx.frames() {
            self.write(&frame).await?;
            report.frames_sent += 1;

            match self.read_reply().await? {
                ACK => report.acks += 1,
                NAK => {
                    warn!(frame = report.frames_sent, "Frame refused by host");
                    report.naks += 1;
                }
                other => return Err(LinkError::UnexpectedReply(other)),
            }
        }

        self.write(&[EOT]).await?;
        self.expect_ack().await?;
        report.acks += 1;

        debug!(?report, "Transmission sent");
        Ok(report)
    }

    /// Shut down the write half, signalling end of stream to the host.
    pub async fn close(mut self) -> Result<(), LinkError> {
        self.stream.shutdown().await?;
        Ok(())
    }

    async fn write(&mut self, bytes: &[u8]) -> Result<(), LinkError> {
        trace!(len = bytes.len(), "Writing to host");
        self.stream.write_all(bytes).await?;
        self.stream.flush().await?;
        Ok(())
    }

    async fn expect_ack(&mut self) -> Result<(), LinkError> {
        match self.read_reply().await? {
            ACK => Ok(()),
            other => Err(LinkError::UnexpectedReply(other)),
        }
    }

    async fn read_reply(&mut self) -> Result<u8, LinkError> {
        match tokio::time::timeout(self.timeout, self.stream.read_u8()).await {
            Ok(Ok(byte)) => Ok(byte),
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                Err(LinkError::ConnectionClosed)
            }
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(LinkError::Timeout(self.timeout.as_millis() as u64)),
        }
    }
}
