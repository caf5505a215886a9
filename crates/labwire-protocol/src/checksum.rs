//! ASTM frame checksum.
//!
//! The checksum is the modulo-256 sum of every byte after STX up to and
//! including the frame terminator (ETX), rendered as two uppercase hex
//! digits. The two ASCII characters following ETX on the wire carry the
//! sender's value.
//!
//! ```
//! use labwire_protocol::checksum;
//! use labwire_core::constants::ETX;
//!
//! assert_eq!(checksum::checksum(b"P|1|12345", ETX), "7B");
//! assert!(checksum::verify(b"P|1|12345", ETX, b"7b"));
//! ```

use labwire_core::{Error, Result};

/// Modulo-256 sum of `payload` followed by `terminator`.
#[must_use]
pub fn compute(payload: &[u8], terminator: u8) -> u8 {
    payload
        .iter()
        .fold(terminator, |acc, &b| acc.wrapping_add(b))
}

/// Checksum as the two uppercase hex digits sent on the wire.
#[must_use]
pub fn checksum(payload: &[u8], terminator: u8) -> String {
    format!("{:02X}", compute(payload, terminator))
}

/// Compare the computed checksum with the received characters.
///
/// The comparison is case-insensitive. Anything other than exactly two
/// characters never matches.
#[must_use]
pub fn verify(payload: &[u8], terminator: u8, received: &[u8]) -> bool {
    received.len() == 2 && received.eq_ignore_ascii_case(checksum(payload, terminator).as_bytes())
}

/// Like [`verify`], reporting both values on mismatch.
///
/// # Errors
/// Returns `Error::ChecksumMismatch` with the computed value as `expected`
/// and the received characters (uppercased, lossily decoded) as `actual`.
pub fn verify_checked(payload: &[u8], terminator: u8, received: &[u8]) -> Result<()> {
    if verify(payload, terminator, received) {
        return Ok(());
    }
    Err(Error::ChecksumMismatch {
        expected: checksum(payload, terminator),
        actual: String::from_utf8_lossy(received).to_ascii_uppercase(),
    })
}
