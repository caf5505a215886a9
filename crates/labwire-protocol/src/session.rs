//! Session state machine for one analyzer link.
//!
//! The machine is sans-IO: the driver hands it whatever bytes the transport
//! produced and performs the I/O described by the returned
//! [`SessionEvent`]s (write replies, deliver results).
//!
//! # States
//!
//! - `Idle`: waiting for ENQ, every other byte is ignored
//! - `Handshake`: transmission in progress, lines go to the frame assembler
//! - `Terminated`: EOT seen and the result handed out
//!
//! # Valid Transitions
//!
//! - Idle → Handshake (ENQ, reply ACK)
//! - Handshake → Handshake (ENQ again, transmission restarted)
//! - Handshake → Terminated (EOT, reply ACK)
//! - Handshake → Idle (transport closed before EOT)
//! - Terminated → Idle (persistent links only)
//!
//! # Example
//!
//! ```
//! use labwire_protocol::{Session, SessionEvent, TransmissionBuilder};
//!
//! let wire = TransmissionBuilder::new()
//!     .record("P|1|S100")
//!     .record("R|1|^^Na|140|mmol/L")
//!     .build();
//!
//! let mut session = Session::new();
//! let events = session.feed(&wire);
//!
//! let completed: Vec<_> = events
//!     .iter()
//!     .filter_map(|e| match e {
//!         SessionEvent::Completed(result) => Some(result),
//!         _ => None,
//!     })
//!     .collect();
//! assert_eq!(completed.len(), 1);
//! assert_eq!(completed[0].sample_id.as_deref(), Some("S100"));
//! ```

use bytes::Bytes;
use chrono::Utc;
use labwire_core::constants::{ENQ, EOT};
use labwire_core::{ReferenceTable, SampleResult};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

use crate::assembler::{AssemblerConfig, AssemblerEvent, FrameAssembler};
use crate::control::ControlByte;
use crate::frame::{DecodedFrame, FrameError};
use crate::normalizer::ResultNormalizer;

/// Link-level state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Waiting for ENQ.
    Idle,

    /// Between ENQ and EOT.
    Handshake,

    /// EOT received. One-shot sessions stay here.
    Terminated,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state_str = match self {
            SessionState::Idle => "Idle",
            SessionState::Handshake => "Handshake",
            SessionState::Terminated => "Terminated",
        };
        write!(f, "{}", state_str)
    }
}

impl SessionState {
    /// Check if transition to target state is valid from this state.
    ///
    /// ```
    /// use labwire_protocol::SessionState;
    ///
    /// assert!(SessionState::Idle.can_transition_to(&SessionState::Handshake));
    /// assert!(!SessionState::Idle.can_transition_to(&SessionState::Terminated));
    /// ```
    pub fn can_transition_to(&self, target: &SessionState) -> bool {
        matches!(
            (self, target),
            // From Idle
            (SessionState::Idle, SessionState::Handshake)
            // From Handshake
            | (SessionState::Handshake, SessionState::Handshake | SessionState::Terminated | SessionState::Idle)
            // From Terminated
            | (SessionState::Terminated, SessionState::Idle)
        )
    }
}

/// Why a transmission produced no result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardReason {
    /// EOT arrived but no record carried a sample id.
    IdentityMissing { tests: usize },

    /// The transport ended before EOT.
    Abandoned { frames: usize },
}

impl fmt::Display for DiscardReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscardReason::IdentityMissing { tests } => {
                write!(f, "sample identity missing ({tests} tests dropped)")
            }
            DiscardReason::Abandoned { frames } => {
                write!(f, "transmission abandoned before EOT ({frames} frames dropped)")
            }
        }
    }
}

/// Actions and outcomes reported by [`Session::feed`], in wire order.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Byte to write back to the analyzer.
    Reply(ControlByte),

    /// A finished transmission with a sample id, ready for the sink.
    Completed(SampleResult),

    /// A finished or abandoned transmission that yields no result.
    Discarded(DiscardReason),

    /// A framed line that was skipped.
    FrameRejected(FrameError),

    /// A line without framing, kept for logging.
    Diagnostic(Bytes),
}

/// Session settings.
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    /// Stay `Terminated` after the first EOT instead of waiting for the
    /// next ENQ.
    pub one_shot: bool,

    pub assembler: AssemblerConfig,

    pub reference_table: Arc<ReferenceTable>,
}

impl SessionConfig {
    pub fn one_shot(mut self, enabled: bool) -> Self {
        self.one_shot = enabled;
        self
    }

    pub fn assembler(mut self, config: AssemblerConfig) -> Self {
        self.assembler = config;
        self
    }

    pub fn reference_table(mut self, table: Arc<ReferenceTable>) -> Self {
        self.reference_table = table;
        self
    }
}

/// Counters kept for the lifetime of a [`Session`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkStats {
    pub sessions_started: u64,
    pub sessions_completed: u64,
    pub sessions_discarded: u64,
    pub sessions_abandoned: u64,
    pub frames_accepted: u64,
    pub frames_rejected: u64,
    pub replies: u64,
}

/// Protocol state for one physical link.
#[derive(Debug)]
pub struct Session {
    state: SessionState,
    one_shot: bool,
    assembler: FrameAssembler,
    normalizer: ResultNormalizer,
    /// Frames of the current transmission in arrival order.
    frames: Vec<DecodedFrame>,
    stats: LinkStats,
}

impl Session {
    /// Create a persistent session with the default reference table.
    pub fn new() -> Self {
        Self::with_config(SessionConfig::default())
    }

    pub fn with_config(config: SessionConfig) -> Self {
        Self {
            state: SessionState::Idle,
            one_shot: config.one_shot,
            assembler: FrameAssembler::with_config(config.assembler),
            normalizer: ResultNormalizer::new(config.reference_table),
            frames: Vec::new(),
            stats: LinkStats::default(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn stats(&self) -> LinkStats {
        self.stats
    }

    /// Whether a one-shot session has finished and ignores further input.
    pub fn is_finished(&self) -> bool {
        self.one_shot && self.state == SessionState::Terminated
    }

    /// Frames collected so far in the current transmission.
    pub fn frames(&self) -> &[DecodedFrame] {
        &self.frames
    }

    /// Process bytes read from the transport.
    ///
    /// ENQ and EOT are recognised anywhere in the input, so a read holding
    /// the tail of one transmission and the start of the next is handled in
    /// order.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        let mut rest = bytes;

        while !rest.is_empty() {
            rest = match self.state {
                SessionState::Idle => self.feed_idle(rest, &mut events),
                SessionState::Handshake => self.feed_handshake(rest, &mut events),
                SessionState::Terminated => {
                    trace!(ignored = rest.len(), "Session terminated, input ignored");
                    &[]
                }
            };
        }

        events
    }

    /// Handle end of stream.
    ///
    /// A transmission still in progress is abandoned: its frames are dropped
    /// and no result is produced.
    pub fn close(&mut self) -> Vec<SessionEvent> {
        if self.state != SessionState::Handshake {
            return Vec::new();
        }

        let frames = self.frames.len();
        warn!(frames, "Transport closed before EOT, transmission abandoned");

        self.reset_transmission();
        self.stats.sessions_abandoned += 1;
        self.enter(SessionState::Idle);

        vec![SessionEvent::Discarded(DiscardReason::Abandoned { frames })]
    }

    /// Skip to the next ENQ.
    fn feed_idle<'a>(&mut self, bytes: &'a [u8], events: &mut Vec<SessionEvent>) -> &'a [u8] {
        let Some(pos) = bytes.iter().position(|&b| b == ENQ) else {
            trace!(ignored = bytes.len(), "Idle, waiting for ENQ");
            return &[];
        };

        if pos > 0 {
            trace!(ignored = pos, "Bytes before ENQ ignored");
        }

        self.start_transmission(events);
        &bytes[pos + 1..]
    }

    /// Hand bytes up to the next ENQ or EOT to the assembler, then act on
    /// that control byte.
    fn feed_handshake<'a>(
        &mut self,
        bytes: &'a [u8],
        events: &mut Vec<SessionEvent>,
    ) -> &'a [u8] {
        let control = bytes.iter().position(|&b| b == ENQ || b == EOT);
        let (data, rest) = match control {
            Some(pos) => (&bytes[..pos], Some((bytes[pos], &bytes[pos + 1..]))),
            None => (bytes, None),
        };

        if !data.is_empty() {
            self.assembler.feed(data);
            self.collect_assembler_events(events);
        }

        match rest {
            Some((ENQ, rest)) => {
                warn!(
                    frames = self.frames.len(),
                    "ENQ during transmission, restarting session"
                );
                self.start_transmission(events);
                rest
            }
            Some((_, rest)) => {
                self.finish_transmission(events);
                rest
            }
            None => &[],
        }
    }

    fn start_transmission(&mut self, events: &mut Vec<SessionEvent>) {
        debug!("ENQ received");
        self.reset_transmission();
        self.enter(SessionState::Handshake);
        self.stats.sessions_started += 1;
        self.reply(ControlByte::Ack, events);
    }

    fn finish_transmission(&mut self, events: &mut Vec<SessionEvent>) {
        if self.assembler.pending_len() > 0 {
            debug!(
                pending = self.assembler.pending_len(),
                "Unterminated line dropped at EOT"
            );
        }

        let frames = std::mem::take(&mut self.frames);
        self.reset_transmission();
        self.enter(SessionState::Terminated);

        let result = self.normalizer.normalize_frames(&frames);
        self.reply(ControlByte::Ack, events);

        if result.has_identity() {
            let result = result.finalize(Utc::now());
            info!(
                sample_id = result.sample_id.as_deref().unwrap_or_default(),
                tests = result.tests.len(),
                frames = frames.len(),
                "Transmission complete"
            );
            self.stats.sessions_completed += 1;
            events.push(SessionEvent::Completed(result));
        } else {
            let tests = result.tests.len();
            warn!(tests, frames = frames.len(), "Sample identity missing, result discarded");
            self.stats.sessions_discarded += 1;
            events.push(SessionEvent::Discarded(DiscardReason::IdentityMissing { tests }));
        }

        if !self.one_shot {
            self.enter(SessionState::Idle);
        }
    }

    fn collect_assembler_events(&mut self, events: &mut Vec<SessionEvent>) {
        while let Some(event) = self.assembler.next_event() {
            match event {
                AssemblerEvent::Frame(frame) => {
                    self.stats.frames_accepted += 1;
                    self.frames.push(frame);
                }
                AssemblerEvent::Rejected(err) => {
                    self.stats.frames_rejected += 1;
                    events.push(SessionEvent::FrameRejected(err));
                }
                AssemblerEvent::Reply(byte) => self.reply(byte, events),
                AssemblerEvent::Diagnostic(line) => events.push(SessionEvent::Diagnostic(line)),
            }
        }
    }

    fn reply(&mut self, byte: ControlByte, events: &mut Vec<SessionEvent>) {
        self.stats.replies += 1;
        events.push(SessionEvent::Reply(byte));
    }

    fn reset_transmission(&mut self) {
        self.frames.clear();
        self.assembler.clear();
    }

    fn enter(&mut self, target: SessionState) {
        debug_assert!(
            self.state.can_transition_to(&target),
            "invalid session transition {} -> {}",
            self.state,
            target
        );
        trace!(from = %self.state, to = %target, "Session state change");
        self.state = target;
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
