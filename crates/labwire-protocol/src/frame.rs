use bytes::Bytes;
use labwire_core::constants::{CHECKSUM_LENGTH, ETX, RECORD_SEPARATOR, STX};
use std::fmt;
use thiserror::Error;

use crate::checksum;

/// Reasons a line carrying a frame is not turned into a [`DecodedFrame`].
///
/// None of these end the session; the line is logged and skipped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("Checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("Frame payload not decodable ({length} bytes)")]
    Undecodable { length: usize },

    #[error("Line exceeded {limit} bytes without terminator")]
    Overflow { limit: usize },
}

impl From<FrameError> for labwire_core::Error {
    fn from(err: FrameError) -> Self {
        match err {
            FrameError::ChecksumMismatch { expected, actual } => {
                labwire_core::Error::ChecksumMismatch { expected, actual }
            }
            other => labwire_core::Error::Decode(other.to_string()),
        }
    }
}

/// Frame as found on one wire line, before validation.
///
/// ```text
/// <STX> payload <ETX> C1 C2 <CR><LF>
///       ^^^^^^^       ^^^^^
///       payload()     checksum_field()
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    payload: Bytes,
    checksum: Bytes,
}

impl RawFrame {
    pub fn new(payload: impl Into<Bytes>, checksum: impl Into<Bytes>) -> Self {
        Self {
            payload: payload.into(),
            checksum: checksum.into(),
        }
    }

    /// Locate a frame in a line that has already been stripped of its
    /// terminator.
    ///
    /// Returns `None` unless the line starts with STX and contains an ETX.
    /// The checksum field is whatever follows ETX, up to two bytes; a
    /// truncated field simply fails validation later.
    ///
    /// ```
    /// use labwire_protocol::RawFrame;
    ///
    /// let raw = RawFrame::from_line(b"\x02P|1|12345\x037B").unwrap();
    /// assert_eq!(raw.payload(), b"P|1|12345");
    /// assert_eq!(raw.checksum_field(), b"7B");
    ///
    /// assert!(RawFrame::from_line(b"no markers here").is_none());
    /// ```
    pub fn from_line(line: &[u8]) -> Option<Self> {
        if line.first() != Some(&STX) {
            return None;
        }
        let etx_pos = line.iter().position(|&b| b == ETX)?;
        let checksum_end = (etx_pos + 1 + CHECKSUM_LENGTH).min(line.len());

        Some(Self {
            payload: Bytes::copy_from_slice(&line[1..etx_pos]),
            checksum: Bytes::copy_from_slice(&line[etx_pos + 1..checksum_end]),
        })
    }

    /// Bytes strictly between STX and ETX.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Checksum characters received after ETX.
    pub fn checksum_field(&self) -> &[u8] {
        &self.checksum
    }

    /// Checksum computed over the payload and ETX.
    pub fn expected_checksum(&self) -> String {
        checksum::checksum(&self.payload, ETX)
    }

    pub fn is_valid(&self) -> bool {
        checksum::verify(&self.payload, ETX, &self.checksum)
    }

    /// Validate and decode the frame.
    ///
    /// Undecodable bytes are dropped rather than failing the frame; only a
    /// payload with no usable text left is rejected.
    ///
    /// # Errors
    /// - `FrameError::ChecksumMismatch` if the checksum does not match
    /// - `FrameError::Undecodable` if nothing readable remains
    pub fn decode(self) -> Result<DecodedFrame, FrameError> {
        if !self.is_valid() {
            return Err(FrameError::ChecksumMismatch {
                expected: self.expected_checksum(),
                actual: String::from_utf8_lossy(&self.checksum).to_ascii_uppercase(),
            });
        }

        let text = decode_lossy(&self.payload);
        if text.trim().is_empty() {
            return Err(FrameError::Undecodable {
                length: self.payload.len(),
            });
        }

        Ok(DecodedFrame::from_text(text))
    }
}

/// Best-effort text decode: invalid UTF-8 sequences are removed.
fn decode_lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .chars()
        .filter(|&c| c != char::REPLACEMENT_CHARACTER)
        .collect()
}

/// Validated frame text with its sequence digit removed.
///
/// One decoded frame may carry several records separated by carriage
/// returns; [`DecodedFrame::records`] yields them in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedFrame {
    sequence: Option<u8>,
    text: String,
}

impl DecodedFrame {
    /// Build a decoded frame from payload text, stripping a leading frame
    /// sequence digit.
    ///
    /// The digit is only stripped when it is directly followed by an
    /// alphabetic record tag, so `1P|...` becomes `P|...` while a payload
    /// such as `12|...` is left untouched.
    ///
    /// ```
    /// use labwire_protocol::DecodedFrame;
    ///
    /// let frame = DecodedFrame::from_text("1P|1|S100");
    /// assert_eq!(frame.sequence(), Some(1));
    /// assert_eq!(frame.text(), "P|1|S100");
    /// ```
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        let bytes = text.as_bytes();

        if bytes.len() >= 2 && bytes[0].is_ascii_digit() && bytes[1].is_ascii_alphabetic() {
            let sequence = bytes[0] - b'0';
            return Self {
                sequence: Some(sequence),
                text: text[1..].to_string(),
            };
        }

        Self {
            sequence: None,
            text,
        }
    }

    /// Frame sequence number, if the sender included one.
    pub fn sequence(&self) -> Option<u8> {
        self.sequence
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Non-empty record lines in arrival order.
    pub fn records(&self) -> impl Iterator<Item = &str> {
        self.text
            .split(RECORD_SEPARATOR)
            .map(str::trim)
            .filter(|line| !line.is_empty())
    }
}

impl fmt::Display for DecodedFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.sequence {
            Some(seq) => write!(f, "Frame[seq={}, '{}']", seq, self.text.escape_debug()),
            None => write!(f, "Frame['{}']", self.text.escape_debug()),
        }
    }
}

/// Hex rendering used when logging lines that are not frames.
pub fn hex_dump(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wire(payload: &[u8]) -> Vec<u8> {
        let mut line = vec![STX];
        line.extend_from_slice(payload);
        line.push(ETX);
        line.extend_from_slice(checksum::checksum(payload, ETX).as_bytes());
        line
    }

    #[test]
    fn test_from_line_requires_markers() {
        assert!(RawFrame::from_line(b"").is_none());
        assert!(RawFrame::from_line(b"P|1|S100").is_none());
        assert!(RawFrame::from_line(b"\x02P|1|S100").is_none());
        assert!(RawFrame::from_line(b"xx\x02P|1\x0300").is_none());
    }

    #[test]
    fn test_valid_frame_decodes() {
        let raw = RawFrame::from_line(&wire(b"1P|1|S100")).unwrap();
        assert!(raw.is_valid());

        let frame = raw.decode().unwrap();
        assert_eq!(frame.sequence(), Some(1));
        assert_eq!(frame.text(), "P|1|S100");
    }

    #[test]
    fn test_lowercase_checksum_accepted() {
        let mut line = vec![STX];
        line.extend_from_slice(b"P|1|12345");
        line.push(ETX);
        line.extend_from_slice(b"7b");

        assert!(RawFrame::from_line(&line).unwrap().decode().is_ok());
    }

    #[test]
    fn test_checksum_mismatch() {
        let mut line = wire(b"P|1|S100");
        let last = line.len() - 1;
        line[last] = if line[last] == b'0' { b'1' } else { b'0' };

        let err = RawFrame::from_line(&line).unwrap().decode().unwrap_err();
        assert!(matches!(err, FrameError::ChecksumMismatch { .. }));
    }

    #[test]
    fn test_truncated_checksum_field() {
        let raw = RawFrame::from_line(b"\x02P|1|12345\x037").unwrap();
        assert_eq!(raw.checksum_field(), b"7");
        assert!(!raw.is_valid());
    }

    #[test]
    fn test_invalid_bytes_dropped() {
        let payload = b"P|1|S1\xFF\xFE00";
        let frame = RawFrame::from_line(&wire(payload)).unwrap().decode().unwrap();
        assert_eq!(frame.text(), "P|1|S100");
    }

    #[test]
    fn test_empty_payload_rejected() {
        let err = RawFrame::from_line(&wire(b"")).unwrap().decode().unwrap_err();
        assert_eq!(err, FrameError::Undecodable { length: 0 });

        let err = RawFrame::from_line(&wire(b"\xFF\xFF")).unwrap().decode().unwrap_err();
        assert_eq!(err, FrameError::Undecodable { length: 2 });
    }

    #[test]
    fn test_sequence_digit_rules() {
        let frame = DecodedFrame::from_text("7OBX|1|NM|||Na|140");
        assert_eq!(frame.sequence(), Some(7));
        assert_eq!(frame.text(), "OBX|1|NM|||Na|140");

        let frame = DecodedFrame::from_text("R|1|^^Na|140");
        assert_eq!(frame.sequence(), None);

        let frame = DecodedFrame::from_text("12|x");
        assert_eq!(frame.sequence(), None);
        assert_eq!(frame.text(), "12|x");
    }

    #[test]
    fn test_records_split_on_carriage_return() {
        let frame = DecodedFrame::from_text("2R|1|^^Na|140\rR|2|^^K|4.0\r\rR|3|^^Cl|102\r");
        let records: Vec<&str> = frame.records().collect();
        assert_eq!(records, vec!["R|1|^^Na|140", "R|2|^^K|4.0", "R|3|^^Cl|102"]);
    }

    #[test]
    fn test_error_conversion() {
        let err: labwire_core::Error = FrameError::Undecodable { length: 3 }.into();
        assert!(matches!(err, labwire_core::Error::Decode(_)));

        let err: labwire_core::Error = FrameError::ChecksumMismatch {
            expected: "7B".into(),
            actual: "00".into(),
        }
        .into();
        assert!(matches!(err, labwire_core::Error::ChecksumMismatch { .. }));
    }

    #[test]
    fn test_hex_dump() {
        assert_eq!(hex_dump(&[0x05, 0x41, 0xFF]), "05 41 FF");
    }
}
