//! Per-link driver loops.
//!
//! A driver owns one transport and one [`Session`]. It writes every reply
//! the session asks for before reading again and hands completed results
//! to the sink, at most once each.
//!
//! ```text
//! transport ──bytes──> Session ──Reply──────> transport (ACK/NAK)
//!                         └─────Completed──> ResultSink
//! ```
//!
//! Two flavours exist: [`serve_link`] for async transports (TCP) and
//! [`serve_blocking`] for `std::io` transports (serial lines).

use chrono::{DateTime, Utc};
use futures::{SinkExt, StreamExt};
use labwire_core::constants::DEFAULT_READ_BUFFER_SIZE;
use labwire_core::{ResultSink, SampleResult, SinkError};
use labwire_protocol::{AstmCodec, LinkStats, Session, SessionConfig, SessionEvent};
use std::io::{ErrorKind, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::Framed;
use tracing::{debug, info, trace, warn};

use crate::error::LinkError;

/// Settings shared by every link driver.
#[derive(Debug, Clone)]
pub struct LinkConfig {
    pub session: SessionConfig,

    /// Size of each transport read.
    pub read_buffer_size: usize,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
        }
    }
}

impl LinkConfig {
    pub fn session(mut self, session: SessionConfig) -> Self {
        self.session = session;
        self
    }

    pub fn read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size.max(1);
        self
    }
}

/// What happened on a link, returned when the transport ends.
#[derive(Debug, Clone)]
pub struct LinkSummary {
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,

    /// Results accepted by the sink.
    pub delivered: u64,

    /// Deliveries the sink refused. The link kept serving after each one.
    pub sink_errors: Vec<SinkError>,

    /// Session counters at the end of the link.
    pub stats: LinkStats,
}

impl LinkSummary {
    fn start() -> Self {
        let now = Utc::now();
        Self {
            started_at: now,
            ended_at: now,
            delivered: 0,
            sink_errors: Vec::new(),
            stats: LinkStats::default(),
        }
    }

    fn finish(mut self, stats: LinkStats) -> Self {
        self.ended_at = Utc::now();
        self.stats = stats;
        self
    }

    fn record_delivery(&mut self, outcome: Result<(), SinkError>) {
        match outcome {
            Ok(()) => self.delivered += 1,
            Err(err) => {
                warn!(error = %err, "Result delivery failed");
                self.sink_errors.push(err);
            }
        }
    }

    pub fn duration(&self) -> chrono::Duration {
        self.ended_at - self.started_at
    }
}

/// Drive an async transport until it closes.
///
/// # Errors
///
/// Returns an error only for transport failures. Sink failures are
/// collected in [`LinkSummary::sink_errors`].
pub async fn serve_link<T, S>(io: T, config: &LinkConfig, sink: &S) -> Result<LinkSummary, LinkError>
where
    T: AsyncRead + AsyncWrite + Unpin,
    S: ResultSink,
{
    let codec = AstmCodec::with_config(config.session.clone());
    let mut framed = Framed::with_capacity(io, codec, config.read_buffer_size);
    let mut summary = LinkSummary::start();

    while let Some(event) = framed.next().await {
        match event? {
            SessionEvent::Reply(byte) => {
                trace!(reply = %byte, "Sending reply");
                // Sink::send flushes before returning
                framed.send(byte).await?;
            }
            SessionEvent::Completed(result) => {
                info!(result = %result, "Delivering result");
                let outcome = sink.deliver(result).await;
                summary.record_delivery(outcome);
            }
            SessionEvent::Discarded(reason) => {
                debug!(reason = %reason, "Transmission discarded");
            }
            SessionEvent::FrameRejected(_) | SessionEvent::Diagnostic(_) => {}
        }

        if framed.codec().is_finished() {
            debug!("One-shot session finished, closing link");
            break;
        }
    }

    let stats = framed.codec().session().stats();
    Ok(summary.finish(stats))
}

/// Drive a blocking transport until it reaches end of stream or `shutdown`
/// is set.
///
/// Read timeouts are not errors; they give the loop a chance to observe
/// `shutdown`. Completed results are passed to `deliver`.
///
/// # Errors
///
/// Returns an error for transport failures other than timeouts and
/// interrupts.
pub fn serve_blocking<T, F>(
    io: &mut T,
    config: &LinkConfig,
    shutdown: &AtomicBool,
    mut deliver: F,
) -> Result<LinkSummary, LinkError>
where
    T: Read + Write + ?Sized,
    F: FnMut(SampleResult) -> Result<(), SinkError>,
{
    let mut session = Session::with_config(config.session.clone());
    let mut buffer = vec![0u8; config.read_buffer_size];
    let mut summary = LinkSummary::start();

    while !shutdown.load(Ordering::Relaxed) && !session.is_finished() {
        let (events, at_eof) = match io.read(&mut buffer) {
            Ok(0) => {
                debug!("End of stream");
                (session.close(), true)
            }
            Ok(n) => (session.feed(&buffer[..n]), false),
            Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => continue,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };

        for event in events {
            match event {
                SessionEvent::Reply(byte) => {
                    trace!(reply = %byte, "Sending reply");
                    io.write_all(&[byte.as_u8()])?;
                    io.flush()?;
                }
                SessionEvent::Completed(result) => {
                    info!(result = %result, "Delivering result");
                    summary.record_delivery(deliver(result));
                }
                SessionEvent::Discarded(reason) => {
                    debug!(reason = %reason, "Transmission discarded");
                }
                SessionEvent::FrameRejected(_) | SessionEvent::Diagnostic(_) => {}
            }
        }

        if at_eof {
            break;
        }
    }

    // Shutdown requested mid-transmission
    session.close();

    Ok(summary.finish(session.stats()))
}
