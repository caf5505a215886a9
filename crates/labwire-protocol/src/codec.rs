//! Tokio codec for analyzer links.
//!
//! `AstmCodec` wraps a [`Session`] so a link can be driven with
//! `tokio_util::codec::Framed`:
//!
//! ```text
//! Transport -> Decoder -> SessionEvent (reply, completed, discarded, ...)
//! ControlByte -> Encoder -> Transport
//! ```
//!
//! # Usage with Tokio Framed
//!
//! ```rust,no_run
//! use futures::{SinkExt, StreamExt};
//! use labwire_protocol::{AstmCodec, SessionEvent};
//! use tokio::net::TcpStream;
//! use tokio_util::codec::Framed;
//!
//! # async fn example() -> labwire_core::Result<()> {
//! let stream = TcpStream::connect("127.0.0.1:8000").await?;
//! let mut framed = Framed::new(stream, AstmCodec::new());
//!
//! while let Some(event) = framed.next().await {
//!     match event? {
//!         SessionEvent::Reply(byte) => framed.send(byte).await?,
//!         SessionEvent::Completed(result) => println!("{result}"),
//!         _ => {}
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! The decoder never fails on protocol content: corrupted frames and noise
//! come out as events. Errors are limited to I/O failures of the
//! underlying transport.

use bytes::BytesMut;
use std::collections::VecDeque;
use tokio_util::codec::{Decoder, Encoder};

use crate::control::ControlByte;
use crate::session::{Session, SessionConfig, SessionEvent};
use labwire_core::{Error, Result};

/// Tokio codec producing [`SessionEvent`]s and encoding replies.
#[derive(Debug)]
pub struct AstmCodec {
    session: Session,

    /// Events produced by the last feed and not yet handed out.
    pending: VecDeque<SessionEvent>,
}

impl AstmCodec {
    /// Codec for a persistent link with default settings.
    ///
    /// ```
    /// use labwire_protocol::AstmCodec;
    ///
    /// let codec = AstmCodec::new();
    /// assert!(!codec.is_finished());
    /// ```
    pub fn new() -> Self {
        Self::with_config(SessionConfig::default())
    }

    pub fn with_config(config: SessionConfig) -> Self {
        Self {
            session: Session::with_config(config),
            pending: VecDeque::new(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn into_session(self) -> Session {
        self.session
    }

    /// Whether a one-shot session has ended and every event was handed out.
    pub fn is_finished(&self) -> bool {
        self.session.is_finished() && self.pending.is_empty()
    }
}

impl Default for AstmCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for AstmCodec {
    type Item = SessionEvent;
    type Error = Error;

    /// Hand the buffered bytes to the session and return the next event.
    ///
    /// # Example
    ///
    /// ```
    /// use bytes::BytesMut;
    /// use labwire_protocol::{AstmCodec, ControlByte, SessionEvent};
    /// use tokio_util::codec::Decoder;
    ///
    /// let mut codec = AstmCodec::new();
    /// let mut buffer = BytesMut::from(&b"\x05"[..]);
    ///
    /// let event = codec.decode(&mut buffer).unwrap();
    /// assert_eq!(event, Some(SessionEvent::Reply(ControlByte::Ack)));
    /// ```
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        if !src.is_empty() {
            // The session keeps partial lines itself, every byte is consumed.
            let events = self.session.feed(src);
            src.clear();
            self.pending.extend(events);
        }

        Ok(self.pending.pop_front())
    }

    /// Drain what is left and abandon a transmission cut off by end of
    /// stream.
    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>> {
        if let Some(event) = self.decode(buf)? {
            return Ok(Some(event));
        }

        self.pending.extend(self.session.close());
        Ok(self.pending.pop_front())
    }
}

impl Encoder<ControlByte> for AstmCodec {
    type Error = Error;

    fn encode(&mut self, item: ControlByte, dst: &mut BytesMut) -> Result<()> {
        dst.extend_from_slice(&[item.as_u8()]);
        Ok(())
    }
}
