//! TCP listener for analyzers connecting over the LAN.
//!
//! # Architecture
//!
//! ```text
//! Analyzer A ┐
//!            ├──> AnalyzerListener ──> one task per connection
//! Analyzer B ┘                              │
//!                                           ├── Session (own state)
//!                                           └── ResultSink (shared)
//! ```
//!
//! Each connection gets its own [`Session`](labwire_protocol::Session);
//! the sink is shared between connections and must tolerate concurrent
//! deliveries.
//!
//! # Example Usage
//!
//! ```no_run
//! use labwire_core::{ResultSink, SampleResult, SinkError};
//! use labwire_network::{AnalyzerListener, TcpListenerConfig};
//! use std::sync::Arc;
//!
//! struct Print;
//!
//! impl ResultSink for Print {
//!     async fn deliver(&self, result: SampleResult) -> Result<(), SinkError> {
//!         println!("{result}");
//!         Ok(())
//!     }
//! }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let listener = AnalyzerListener::bind(TcpListenerConfig::default()).await?;
//! listener.run(Arc::new(Print), tokio::signal::ctrl_c()).await?;
//! # Ok(())
//! # }
//! ```

use labwire_core::ResultSink;
use labwire_core::constants::DEFAULT_TCP_PORT;
use std::future::Future;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::error::LinkError;
use crate::link::{LinkConfig, LinkSummary, serve_link};

/// Configuration for the TCP listener
///
/// # Example
///
/// ```
/// use labwire_network::TcpListenerConfig;
///
/// let config = TcpListenerConfig::default()
///     .bind_addr("127.0.0.1:9000".parse().unwrap())
///     .max_connections(4);
/// assert_eq!(config.bind_addr.port(), 9000);
/// ```
#[derive(Debug, Clone)]
pub struct TcpListenerConfig {
    /// Address to bind the listener to
    pub bind_addr: SocketAddr,

    /// Maximum number of analyzers served at the same time
    pub max_connections: usize,

    /// Settings applied to every accepted link
    pub link: LinkConfig,
}

impl Default for TcpListenerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_TCP_PORT)),
            max_connections: 16,
            link: LinkConfig::default(),
        }
    }
}

impl TcpListenerConfig {
    pub fn bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = max.max(1);
        self
    }

    pub fn link(mut self, link: LinkConfig) -> Self {
        self.link = link;
        self
    }
}

/// TCP listener accepting analyzer connections.
pub struct AnalyzerListener {
    listener: TcpListener,
    config: TcpListenerConfig,
    /// Free connection slots
    slots: Arc<Semaphore>,
}

impl AnalyzerListener {
    /// Bind the listener to the configured address.
    ///
    /// # Errors
    ///
    /// Returns `LinkError::BindFailed` if the address is in use or not
    /// available.
    pub async fn bind(config: TcpListenerConfig) -> Result<Self, LinkError> {
        let listener = TcpListener::bind(config.bind_addr)
            .await
            .map_err(|source| LinkError::BindFailed {
                addr: config.bind_addr,
                source,
            })?;

        info!(
            addr = %config.bind_addr,
            max_connections = config.max_connections,
            "Waiting for analyzer connections"
        );

        Ok(Self {
            listener,
            slots: Arc::new(Semaphore::new(config.max_connections)),
            config,
        })
    }

    /// Address actually bound, useful with port 0.
    pub fn local_addr(&self) -> Result<SocketAddr, LinkError> {
        Ok(self.listener.local_addr()?)
    }

    pub fn config(&self) -> &TcpListenerConfig {
        &self.config
    }

    /// Accept a single connection and serve it until the analyzer
    /// disconnects.
    pub async fn serve_once<S: ResultSink>(&self, sink: &S) -> Result<LinkSummary, LinkError> {
        let (stream, addr) = self.listener.accept().await?;
        serve_connection(stream, addr, &self.config.link, sink).await
    }

    /// Serve connections until `shutdown` resolves.
    ///
    /// Connections beyond `max_connections` are closed right away. Links
    /// still open at shutdown are dropped, abandoning any transmission in
    /// progress.
    pub async fn run<S, F>(self, sink: Arc<S>, shutdown: F) -> Result<(), LinkError>
    where
        S: ResultSink + 'static,
        F: Future,
    {
        let mut links = JoinSet::new();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!(open_links = links.len(), "Shutting down listener");
                    break;
                }
                accepted = self.listener.accept() => {
                    let (stream, addr) = match accepted {
                        Ok(conn) => conn,
                        Err(e) => {
                            error!(error = %e, "Accept failed");
                            continue;
                        }
                    };

                    let Ok(permit) = Arc::clone(&self.slots).try_acquire_owned() else {
                        warn!(
                            addr = %addr,
                            max_connections = self.config.max_connections,
                            "Connection rejected: maximum connections reached"
                        );
                        drop(stream);
                        continue;
                    };

                    let sink = Arc::clone(&sink);
                    let link = self.config.link.clone();
                    links.spawn(async move {
                        let _permit = permit;
                        if let Err(e) = serve_connection(stream, addr, &link, sink.as_ref()).await {
                            warn!(addr = %addr, error = %e, "Link ended with error");
                        }
                    });
                }
                Some(joined) = links.join_next(), if !links.is_empty() => {
                    if let Err(e) = joined {
                        error!(error = %e, "Link task failed");
                    }
                }
            }
        }

        links.shutdown().await;
        Ok(())
    }
}

async fn serve_connection<S: ResultSink>(
    stream: TcpStream,
    addr: SocketAddr,
    config: &LinkConfig,
    sink: &S,
) -> Result<LinkSummary, LinkError> {
    info!(addr = %addr, "Analyzer connected");

    if let Err(e) = stream.set_nodelay(true) {
        warn!(addr = %addr, error = %e, "Failed to set TCP_NODELAY");
    }

    let summary = serve_link(stream, config, sink).await?;

    info!(
        addr = %addr,
        delivered = summary.delivered,
        sink_errors = summary.sink_errors.len(),
        abandoned = summary.stats.sessions_abandoned,
        duration_ms = summary.duration().num_milliseconds(),
        "Analyzer disconnected"
    );
    Ok(summary)
}
