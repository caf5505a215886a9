use labwire_core::{Interpretation, TestValue};
use serde::{Deserialize, Serialize};

/// One row of the `test_values` table.
///
/// `numeric_value` is filled when the reported text parses as a number, so
/// ranges can be queried in SQL. `interpretation` holds `Low`, `Normal` or
/// `High`; use [`StoredTestValue::get_interpretation`] for the typed view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct StoredTestValue {
    pub id: i64,
    pub sample_row_id: i64,
    pub code: String,
    pub value: String,
    pub numeric_value: Option<f64>,
    pub unit: Option<String>,
    pub interpretation: Option<String>,
}

impl StoredTestValue {
    pub fn get_interpretation(&self) -> Option<Interpretation> {
        self.interpretation.as_deref()?.parse().ok()
    }

    /// Convert back into the domain value.
    pub fn to_test_value(&self) -> TestValue {
        TestValue {
            value: self.value.clone(),
            unit: self.unit.clone(),
            interpretation: self.get_interpretation(),
        }
    }
}
