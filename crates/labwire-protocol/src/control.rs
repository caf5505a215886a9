use labwire_core::constants::{ACK, ENQ, EOT, ETX, NAK, STX};
use std::fmt;

/// Single-byte control characters of the low-level protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlByte {
    Enq,
    Ack,
    Nak,
    Stx,
    Etx,
    Eot,
}

impl ControlByte {
    #[must_use]
    pub fn as_u8(&self) -> u8 {
        match self {
            ControlByte::Enq => ENQ,
            ControlByte::Ack => ACK,
            ControlByte::Nak => NAK,
            ControlByte::Stx => STX,
            ControlByte::Etx => ETX,
            ControlByte::Eot => EOT,
        }
    }

    #[must_use]
    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            ENQ => Some(ControlByte::Enq),
            ACK => Some(ControlByte::Ack),
            NAK => Some(ControlByte::Nak),
            STX => Some(ControlByte::Stx),
            ETX => Some(ControlByte::Etx),
            EOT => Some(ControlByte::Eot),
            _ => None,
        }
    }
}

impl fmt::Display for ControlByte {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ControlByte::Enq => "ENQ",
            ControlByte::Ack => "ACK",
            ControlByte::Nak => "NAK",
            ControlByte::Stx => "STX",
            ControlByte::Etx => "ETX",
            ControlByte::Eot => "EOT",
        };
        write!(f, "{name}")
    }
}

impl From<ControlByte> for u8 {
    fn from(byte: ControlByte) -> Self {
        byte.as_u8()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_values() {
        assert_eq!(ControlByte::Enq.as_u8(), 0x05);
        assert_eq!(ControlByte::Ack.as_u8(), 0x06);
        assert_eq!(ControlByte::Nak.as_u8(), 0x15);
        assert_eq!(ControlByte::Stx.as_u8(), 0x02);
        assert_eq!(ControlByte::Etx.as_u8(), 0x03);
        assert_eq!(ControlByte::Eot.as_u8(), 0x04);
    }

    #[test]
    fn test_from_u8() {
        assert_eq!(ControlByte::from_u8(0x04), Some(ControlByte::Eot));
        assert_eq!(ControlByte::from_u8(b'A'), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(ControlByte::Ack.to_string(), "ACK");
    }
}
