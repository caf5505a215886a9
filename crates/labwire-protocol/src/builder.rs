use labwire_core::constants::{CR, ENQ, EOT, ETX, LF, RECORD_SEPARATOR, STX};

use crate::checksum;

/// Frame sequence numbers run 1..=7 then wrap to 0.
const SEQUENCE_MODULUS: u8 = 8;

/// Builder for a single wire frame.
///
/// Produces `STX [seq] payload ETX C1 C2 CR LF`, the checksum covering the
/// sequence digit, the payload and ETX.
///
/// # Example
/// ```
/// use labwire_protocol::FrameBuilder;
///
/// let wire = FrameBuilder::new("P|1|S100").sequence(1).build();
/// assert_eq!(wire, b"\x021P|1|S100\x0391\r\n");
/// ```
#[derive(Debug, Clone)]
pub struct FrameBuilder {
    payload: String,
    sequence: Option<u8>,
    checksum: Option<String>,
}

impl FrameBuilder {
    pub fn new(payload: impl Into<String>) -> Self {
        Self {
            payload: payload.into(),
            sequence: None,
            checksum: None,
        }
    }

    /// Prefix the payload with a frame sequence digit (taken modulo 8).
    pub fn sequence(mut self, seq: u8) -> Self {
        self.sequence = Some(seq % SEQUENCE_MODULUS);
        self
    }

    /// Send an explicit checksum instead of the computed one.
    ///
    /// Used to simulate line corruption.
    pub fn checksum(mut self, checksum: impl Into<String>) -> Self {
        self.checksum = Some(checksum.into());
        self
    }

    /// Text between STX and ETX.
    pub fn body(&self) -> String {
        match self.sequence {
            Some(seq) => format!("{seq}{}", self.payload),
            None => self.payload.clone(),
        }
    }

    pub fn build(&self) -> Vec<u8> {
        let body = self.body();
        let checksum = self
            .checksum
            .clone()
            .unwrap_or_else(|| checksum::checksum(body.as_bytes(), ETX));

        let mut wire = Vec::with_capacity(body.len() + 6);
        wire.push(STX);
        wire.extend_from_slice(body.as_bytes());
        wire.push(ETX);
        wire.extend_from_slice(checksum.as_bytes());
        wire.push(CR);
        wire.push(LF);
        wire
    }
}

/// Builder for a whole ENQ..EOT transmission, as an analyzer sends it.
///
/// Records are packed into frames (one record per frame by default) and
/// frames are numbered from 1.
///
/// # Example
/// ```
/// use labwire_protocol::TransmissionBuilder;
///
/// let tx = TransmissionBuilder::new()
///     .record("H|\\^&|||EC90")
///     .record("P|1|S100")
///     .record("R|1|^^Na|140|mmol/L")
///     .record("L|1|N");
///
/// assert_eq!(tx.frames().len(), 4);
/// let wire = tx.build();
/// assert_eq!(wire.first(), Some(&0x05));
/// assert_eq!(wire.last(), Some(&0x04));
/// ```
#[derive(Debug, Clone)]
pub struct TransmissionBuilder {
    records: Vec<String>,
    records_per_frame: usize,
}

impl TransmissionBuilder {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            records_per_frame: 1,
        }
    }

    pub fn record(mut self, record: impl Into<String>) -> Self {
        self.records.push(record.into());
        self
    }

    pub fn records<I, S>(mut self, records: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.records.extend(records.into_iter().map(Into::into));
        self
    }

    /// Pack up to `count` records into each frame, separated by CR.
    pub fn records_per_frame(mut self, count: usize) -> Self {
        self.records_per_frame = count.max(1);
        self
    }

    /// Encoded frames without the surrounding ENQ and EOT.
    pub fn frames(&self) -> Vec<Vec<u8>> {
        let separator = RECORD_SEPARATOR.to_string();
        self.records
            .chunks(self.records_per_frame)
            .enumerate()
            .map(|(idx, chunk)| {
                let payload = chunk.join(separator.as_str());
                let seq = ((idx + 1) % usize::from(SEQUENCE_MODULUS)) as u8;
                FrameBuilder::new(payload).sequence(seq).build()
            })
            .collect()
    }

    /// ENQ, every frame, EOT.
    pub fn build(&self) -> Vec<u8> {
        let mut wire = vec![ENQ];
        for frame in self.frames() {
            wire.extend(frame);
        }
        wire.push(EOT);
        wire
    }
}

impl Default for TransmissionBuilder {
    fn default() -> Self {
        Self::new()
    }
}
