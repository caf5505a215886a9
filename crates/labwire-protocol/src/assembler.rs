//! Line-oriented frame assembler for the analyzer link.
//!
//! Transport reads are not aligned with frames: one read can hold half a
//! frame, several frames, or end between ETX and the line feed. The
//! assembler accumulates bytes, cuts them into lines on LF, and turns each
//! line into an [`AssemblerEvent`].
//!
//! # Line Classification
//!
//! ```text
//! <STX>1P|1|S100<ETX>91<CR><LF>   -> Frame + Reply(ACK)
//! <STX>1P|1|S100<ETX>00<CR><LF>   -> Rejected(ChecksumMismatch) + Reply(ACK)
//! garbage<CR><LF>                 -> Diagnostic + Reply(ACK)
//! <CR><LF>                        -> ignored
//! ```
//!
//! Every non-blank line is acknowledged, framed or not, whether or not its
//! checksum matches. The analyzer waits for one reply per line and does not
//! expect a NAK; set [`AssemblerConfig::nak_on_checksum_error`] to answer
//! mismatches with NAK instead.
//!
//! # Usage
//!
//! ```
//! use labwire_protocol::{AssemblerEvent, FrameAssembler};
//!
//! let mut assembler = FrameAssembler::new();
//!
//! assembler.feed(b"\x02P|1|12345\x03");
//! assert_eq!(assembler.events_available(), 0);
//!
//! assembler.feed(b"7B\r\n");
//! let events: Vec<_> = assembler.drain_events().collect();
//! assert!(matches!(events[0], AssemblerEvent::Frame(_)));
//! assert!(matches!(events[1], AssemblerEvent::Reply(_)));
//! ```

use bytes::{Bytes, BytesMut};
use labwire_core::constants::{DEFAULT_MAX_LINE_LENGTH, LF};
use std::collections::VecDeque;
use tracing::{debug, trace, warn};

use crate::control::ControlByte;
use crate::frame::{DecodedFrame, FrameError, RawFrame, hex_dump};

/// Initial buffer capacity for incoming link data.
const INITIAL_BUFFER_CAPACITY: usize = 1024;

/// Recommended initial capacity for the event queue.
///
/// A frame produces two events (frame plus reply), a read rarely holds more
/// than a couple of frames.
const INITIAL_EVENT_QUEUE_CAPACITY: usize = 4;

/// Assembler settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblerConfig {
    /// Longest line kept in the buffer while waiting for a line feed.
    pub max_line_length: usize,

    /// Answer checksum mismatches with NAK instead of ACK.
    pub nak_on_checksum_error: bool,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            nak_on_checksum_error: false,
        }
    }
}

impl AssemblerConfig {
    pub fn max_line_length(mut self, max: usize) -> Self {
        self.max_line_length = max;
        self
    }

    pub fn nak_on_checksum_error(mut self, enabled: bool) -> Self {
        self.nak_on_checksum_error = enabled;
        self
    }
}

/// Output of the assembler, in wire order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssemblerEvent {
    /// A checksum-valid frame.
    Frame(DecodedFrame),

    /// A framed line that was dropped. The session continues.
    Rejected(FrameError),

    /// Control byte to write back to the sender before reading further.
    Reply(ControlByte),

    /// A complete line without STX/ETX, kept for logging only. Followed by
    /// a `Reply(ACK)` like every other line.
    Diagnostic(Bytes),
}

/// Stateful line assembler.
#[derive(Debug)]
pub struct FrameAssembler {
    /// Bytes of the line currently being received.
    buffer: BytesMut,

    /// Prefix of `buffer` already searched for LF.
    scanned: usize,

    /// Events ready for extraction.
    events: VecDeque<AssemblerEvent>,

    config: AssemblerConfig,
}

impl FrameAssembler {
    /// Create an assembler with default settings.
    pub fn new() -> Self {
        Self::with_config(AssemblerConfig::default())
    }

    pub fn with_config(config: AssemblerConfig) -> Self {
        Self {
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            scanned: 0,
            events: VecDeque::with_capacity(INITIAL_EVENT_QUEUE_CAPACITY),
            config,
        }
    }

    pub fn config(&self) -> &AssemblerConfig {
        &self.config
    }

    /// Append bytes from the transport and process every complete line.
    pub fn feed(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);

        while self.try_extract_line() {
            // Continue extracting lines while possible
        }

        self.enforce_line_limit();
    }

    /// Next event, if any.
    pub fn next_event(&mut self) -> Option<AssemblerEvent> {
        self.events.pop_front()
    }

    pub fn events_available(&self) -> usize {
        self.events.len()
    }

    /// Number of bytes of an incomplete line held in the buffer.
    pub fn pending_len(&self) -> usize {
        self.buffer.len()
    }

    /// Drop the partial line and all queued events.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.scanned = 0;
        self.events.clear();
    }

    /// Iterator over the currently queued events.
    ///
    /// Does not process more data; call [`feed()`] first.
    ///
    /// [`feed()`]: FrameAssembler::feed
    pub fn drain_events(&mut self) -> DrainEvents<'_> {
        DrainEvents { assembler: self }
    }

    /// Cut one line off the buffer and classify it.
    ///
    /// Returns `true` if a line was consumed. The search resumes where the
    /// previous call stopped, so a line fed byte by byte is scanned once.
    fn try_extract_line(&mut self) -> bool {
        let Some(offset) = self.buffer[self.scanned..].iter().position(|&b| b == LF) else {
            self.scanned = self.buffer.len();
            return false;
        };

        let line = self.buffer.split_to(self.scanned + offset + 1).freeze();
        self.scanned = 0;
        self.classify_line(line.trim_ascii());
        true
    }

    fn classify_line(&mut self, line: &[u8]) {
        if line.is_empty() {
            return;
        }

        match RawFrame::from_line(line) {
            Some(raw) => self.accept_framed_line(raw),
            None => self.record_diagnostic(line),
        }
    }

    /// Validate a framed line and queue its outcome followed by the reply.
    fn accept_framed_line(&mut self, raw: RawFrame) {
        let reply = match raw.decode() {
            Ok(frame) => {
                debug!(frame = %frame, "Frame accepted");
                self.events.push_back(AssemblerEvent::Frame(frame));
                ControlByte::Ack
            }
            Err(err @ FrameError::ChecksumMismatch { .. }) => {
                warn!(error = %err, "Checksum mismatch, frame skipped");
                self.events.push_back(AssemblerEvent::Rejected(err));
                if self.config.nak_on_checksum_error {
                    ControlByte::Nak
                } else {
                    ControlByte::Ack
                }
            }
            Err(err) => {
                warn!(error = %err, "Frame skipped");
                self.events.push_back(AssemblerEvent::Rejected(err));
                ControlByte::Ack
            }
        };

        self.events.push_back(AssemblerEvent::Reply(reply));
    }

    fn record_diagnostic(&mut self, line: &[u8]) {
        debug!(
            text = %String::from_utf8_lossy(line).escape_debug(),
            hex = %hex_dump(line),
            "Non-frame line"
        );
        self.events
            .push_back(AssemblerEvent::Diagnostic(Bytes::copy_from_slice(line)));
        self.events.push_back(AssemblerEvent::Reply(ControlByte::Ack));
    }

    /// Drop a partial line that grew past the configured limit.
    fn enforce_line_limit(&mut self) {
        if self.buffer.len() <= self.config.max_line_length {
            return;
        }

        warn!(
            buffered = self.buffer.len(),
            limit = self.config.max_line_length,
            "Line exceeded limit without terminator, discarding"
        );
        trace!(hex = %hex_dump(&self.buffer[..self.buffer.len().min(64)]), "Discarded prefix");
        self.buffer.clear();
        self.scanned = 0;
        self.events.push_back(AssemblerEvent::Rejected(FrameError::Overflow {
            limit: self.config.max_line_length,
        }));
    }
}

impl Default for FrameAssembler {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator draining events from a [`FrameAssembler`].
pub struct DrainEvents<'a> {
    assembler: &'a mut FrameAssembler,
}

impl Iterator for DrainEvents<'_> {
    type Item = AssemblerEvent;

    fn next(&mut self) -> Option<Self::Item> {
        self.assembler.next_event()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.assembler.events_available();
        (len, Some(len))
    }
}

impl ExactSizeIterator for DrainEvents<'_> {
    fn len(&self) -> usize {
        self.assembler.events_available()
    }
}
