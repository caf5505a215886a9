use labwire_core::{ReferenceTable, SampleResult, TestValue};
use std::sync::Arc;
use tracing::debug;

use crate::frame::DecodedFrame;
use crate::record::{Record, RecordParser};

/// Folds records of one transmission into a [`SampleResult`].
///
/// Records are applied in arrival order. The first non-empty sample id
/// wins, whether it comes from a patient or an order record; for a test
/// code seen twice the later value replaces the earlier one. Numeric values
/// are classified with the injected [`ReferenceTable`].
#[derive(Debug, Clone, Default)]
pub struct ResultNormalizer {
    table: Arc<ReferenceTable>,
    parser: RecordParser,
}

impl ResultNormalizer {
    pub fn new(table: Arc<ReferenceTable>) -> Self {
        Self {
            table,
            parser: RecordParser::new(),
        }
    }

    pub fn reference_table(&self) -> &ReferenceTable {
        &self.table
    }

    /// Build a result from already parsed records.
    pub fn normalize<'a>(&self, records: impl IntoIterator<Item = &'a Record>) -> SampleResult {
        let mut result = SampleResult::new();

        for record in records {
            self.apply(&mut result, record);
        }

        result
    }

    /// Parse every frame and build a result from the records it carries.
    pub fn normalize_frames(&self, frames: &[DecodedFrame]) -> SampleResult {
        let records: Vec<Record> = frames
            .iter()
            .flat_map(|frame| self.parser.parse_frame(frame))
            .collect();
        self.normalize(&records)
    }

    fn apply(&self, result: &mut SampleResult, record: &Record) {
        match record {
            Record::Patient {
                sample_id,
                patient_name,
            } => {
                if let Some(id) = sample_id {
                    result.offer_sample_id(id);
                }
                if let Some(name) = patient_name {
                    result.offer_patient_name(name);
                }
            }
            Record::Order { sample_id } => {
                if let Some(id) = sample_id {
                    result.offer_sample_id(id);
                }
            }
            Record::Result { code, value, unit } => {
                let mut test = TestValue::new(value.as_str());
                if let Some(unit) = unit {
                    test = test.with_unit(unit.as_str());
                }
                if let Some(interpretation) = self.table.classify(code, &test) {
                    test = test.with_interpretation(interpretation);
                }

                if let Some(previous) = result.insert_test(code.as_str(), test) {
                    debug!(code = %code, previous = %previous.value, current = %value, "Test value replaced");
                }
            }
            Record::Other { .. } => {}
        }
    }
}
