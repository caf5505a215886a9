//! Pipe-delimited record parsing.
//!
//! Only the records needed to recover sample identity and result values
//! are interpreted; every other tag is reported as [`Record::Other`].
//!
//! | Tag   | Sample id            | Name     | Test code             | Value | Unit |
//! |-------|----------------------|----------|-----------------------|-------|------|
//! | `P`   | field 2, else 3      | field 4  |                       |       |      |
//! | `O`   | field 2, else 3      |          |                       |       |      |
//! | `R`   |                      |          | last `^` of field 2   | 3     | 4    |
//! | `OBX` |                      |          | last `^` of field 4   | 5     | 6    |
//!
//! Field positions follow the analyzer's output and are best effort:
//! missing fields yield `None`, never an error.

use labwire_core::constants::{COMPONENT_SEPARATOR, FIELD_SEPARATOR};
use std::fmt;
use tracing::{debug, trace};

use crate::frame::DecodedFrame;

/// One classified record line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    /// Patient information record.
    Patient {
        sample_id: Option<String>,
        patient_name: Option<String>,
    },

    /// Test order record, used as a fallback identity source.
    Order { sample_id: Option<String> },

    /// Result (`R`) or extended observation (`OBX`) record.
    Result {
        code: String,
        value: String,
        unit: Option<String>,
    },

    /// Header, comment, terminator, query, manufacturer, unknown tags and
    /// result records too incomplete to use.
    Other { tag: String },
}

impl Record {
    /// Record type tag as it appeared on the wire.
    pub fn tag(&self) -> &str {
        match self {
            Record::Patient { .. } => "P",
            Record::Order { .. } => "O",
            Record::Result { .. } => "R",
            Record::Other { tag } => tag,
        }
    }

    pub fn is_result(&self) -> bool {
        matches!(self, Record::Result { .. })
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Record::Patient { sample_id, .. } => {
                write!(f, "Patient[{}]", sample_id.as_deref().unwrap_or("-"))
            }
            Record::Order { sample_id } => {
                write!(f, "Order[{}]", sample_id.as_deref().unwrap_or("-"))
            }
            Record::Result { code, value, unit } => match unit {
                Some(unit) => write!(f, "Result[{code}={value} {unit}]"),
                None => write!(f, "Result[{code}={value}]"),
            },
            Record::Other { tag } => write!(f, "Other[{tag}]"),
        }
    }
}

/// Stateless record classifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordParser;

impl RecordParser {
    pub fn new() -> Self {
        Self
    }

    /// Classify one record line.
    ///
    /// Returns `None` for blank lines.
    ///
    /// ```
    /// use labwire_protocol::{Record, RecordParser};
    ///
    /// let record = RecordParser::new().parse_line("R|1|^^^Na|140|mmol/L").unwrap();
    /// assert_eq!(
    ///     record,
    ///     Record::Result {
    ///         code: "Na".into(),
    ///         value: "140".into(),
    ///         unit: Some("mmol/L".into()),
    ///     }
    /// );
    /// ```
    pub fn parse_line(&self, line: &str) -> Option<Record> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let fields: Vec<&str> = line.split(FIELD_SEPARATOR).collect();
        let tag = fields[0].trim();

        let record = match tag {
            "P" => Record::Patient {
                sample_id: first_present(&fields, &[2, 3]),
                patient_name: field(&fields, 4).map(join_components),
            },
            "O" => Record::Order {
                sample_id: first_present(&fields, &[2, 3]),
            },
            "R" => result_record(&fields, 2, tag),
            "OBX" => result_record(&fields, 4, tag),
            other => Record::Other {
                tag: other.to_string(),
            },
        };

        trace!(line, record = %record, "Record parsed");
        Some(record)
    }

    /// Classify every record line of a decoded frame, in order.
    pub fn parse_frame(&self, frame: &DecodedFrame) -> Vec<Record> {
        frame
            .records()
            .filter_map(|line| self.parse_line(line))
            .collect()
    }
}

/// Result record with the test code in `code_idx` and value and unit in
/// the two following fields.
fn result_record(fields: &[&str], code_idx: usize, tag: &str) -> Record {
    let code = field(fields, code_idx).and_then(last_component);
    let value = field(fields, code_idx + 1);

    match (code, value) {
        (Some(code), Some(value)) => Record::Result {
            code: code.to_string(),
            value: value.to_string(),
            unit: field(fields, code_idx + 2).map(str::to_string),
        },
        _ => {
            debug!(tag, fields = fields.len(), "Result record without code or value");
            Record::Other {
                tag: tag.to_string(),
            }
        }
    }
}

/// Trimmed, non-empty field at `idx`.
fn field<'a>(fields: &[&'a str], idx: usize) -> Option<&'a str> {
    fields
        .get(idx)
        .map(|f| f.trim())
        .filter(|f| !f.is_empty())
}

/// First component of the first non-empty field among `indices`.
fn first_present(fields: &[&str], indices: &[usize]) -> Option<String> {
    indices
        .iter()
        .filter_map(|&idx| field(fields, idx))
        .filter_map(|f| {
            f.split(COMPONENT_SEPARATOR)
                .map(str::trim)
                .find(|c| !c.is_empty())
        })
        .next()
        .map(str::to_string)
}

fn last_component(field: &str) -> Option<&str> {
    field
        .rsplit(COMPONENT_SEPARATOR)
        .next()
        .map(str::trim)
        .filter(|c| !c.is_empty())
}

/// `DOE^JOHN` → `DOE JOHN`. Every separator becomes one space, empty
/// components included.
fn join_components(field: &str) -> String {
    field.replace(COMPONENT_SEPARATOR, " ")
}
