//! Core constants for the ASTM low-level protocol implementation.
//!
//! This module defines the control bytes, separators and limits used by the
//! analyzer link. They are shared by the protocol engine, the transports and
//! the frame builder used by the analyzer simulator.
//!
//! # Wire Structure
//!
//! An analyzer transmission looks like this:
//!
//! ```text
//! <ENQ>
//! <STX>1P|1|S100<ETX>91<CR><LF>
//! <STX>2R|1|^^Na|140|mmol/L<CR>R|2|^^K|4.0|mmol/L<ETX>22<CR><LF>
//! <EOT>
//! ```
//!
//! Where:
//! - `<ENQ>` - Sender asks for the line (0x05), answered with `<ACK>`
//! - `<STX>` / `<ETX>` - Start and end of one frame (0x02 / 0x03)
//! - `1`, `2` - Optional frame sequence digit
//! - `91` - Two hex digits of the frame checksum
//! - `<CR><LF>` - Frame terminator, the line feed closes the line
//! - `<EOT>` - End of transmission (0x04), answered with `<ACK>`
//!
//! # Separators
//!
//! | Separator | Name | Purpose | Example |
//! |-----------|------|---------|---------|
//! | `\|` | FIELD_SEPARATOR | Separates fields of a record | `R\|1\|^^Na\|140` |
//! | `^` | COMPONENT_SEPARATOR | Separates components inside a field | `^^Na` |
//! | `\r` | RECORD_SEPARATOR | Separates records inside one frame | `P\|1\|S1\rR\|1...` |
//!
//! # Usage
//!
//! ```
//! use labwire_core::constants::*;
//!
//! assert_eq!(ENQ, 0x05);
//! let fields: Vec<&str> = "R|1|^^Na|140".split(FIELD_SEPARATOR).collect();
//! assert_eq!(fields[3], "140");
//! ```

// ============================================================================
// Control Bytes
// ============================================================================

/// Enquiry (ENQ). The analyzer requests the line before a transmission.
pub const ENQ: u8 = 0x05;

/// Acknowledge (ACK). Sent for the handshake, every accepted frame and EOT.
pub const ACK: u8 = 0x06;

/// Negative acknowledge (NAK).
///
/// The analyzer link does not emit NAK unless explicitly configured to do so
/// for frames failing checksum validation.
pub const NAK: u8 = 0x15;

/// Start of text marker (STX).
///
/// ```text
/// <STX>1P|1|S100<ETX>91<CR><LF>
/// ^^^^^
/// ```
pub const STX: u8 = 0x02;

/// End of text marker (ETX). The checksum covers this byte.
///
/// ```text
/// <STX>1P|1|S100<ETX>91<CR><LF>
///                ^^^^^
/// ```
pub const ETX: u8 = 0x03;

/// End of transmission (EOT). Finalizes the session.
pub const EOT: u8 = 0x04;

/// Carriage return. Terminates records inside a frame and precedes LF.
pub const CR: u8 = 0x0D;

/// Line feed. Closes a frame line on the wire.
pub const LF: u8 = 0x0A;

// ============================================================================
// Record Separators
// ============================================================================

/// Field separator inside a record.
pub const FIELD_SEPARATOR: char = '|';

/// Component separator inside a field.
///
/// ```
/// use labwire_core::constants::COMPONENT_SEPARATOR;
///
/// let code = "^^Na".rsplit(COMPONENT_SEPARATOR).next();
/// assert_eq!(code, Some("Na"));
/// ```
pub const COMPONENT_SEPARATOR: char = '^';

/// Record separator inside one decoded frame.
pub const RECORD_SEPARATOR: char = '\r';

// ============================================================================
// Frame Layout
// ============================================================================

/// Number of checksum characters following ETX.
pub const CHECKSUM_LENGTH: usize = 2;

/// Maximum length of a line held in the assembler before it is dropped.
///
/// A transmission that grows this far without a line feed is either corrupt
/// or not an analyzer at all.
pub const DEFAULT_MAX_LINE_LENGTH: usize = 64 * 1024; // 64 KB

// ============================================================================
// Transport Defaults
// ============================================================================

/// TCP port the analyzer connects to.
pub const DEFAULT_TCP_PORT: u16 = 8000;

/// Default serial baud rate of the analyzer.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Read size used by the link drivers.
pub const DEFAULT_READ_BUFFER_SIZE: usize = 1024;
