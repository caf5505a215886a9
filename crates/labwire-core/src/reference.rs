//! Reference ranges used to interpret analyzer values.
//!
//! The table is injected into the normalizer, never hardcoded in the
//! protocol logic. [`ReferenceTable::default`] carries the electrolyte panel
//! of the analyzer; deployments can load their own table from JSON:
//!
//! ```json
//! {
//!   "Na": { "low": 135.0, "high": 145.0, "name": "Sodium" },
//!   "K":  { "low": 3.5,   "high": 5.1,   "name": "Potassium" }
//! }
//! ```

use crate::{Error, Interpretation, Result, TestValue};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Inclusive normal range for one test code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceRange {
    pub low: f64,
    pub high: f64,
    /// Human readable test name, e.g. `Sodium` for `Na`.
    #[serde(default)]
    pub name: Option<String>,
}

impl ReferenceRange {
    /// Create a range with validation.
    ///
    /// # Errors
    /// Returns `Error::Config` if a bound is not finite or `low > high`.
    pub fn new(low: f64, high: f64) -> Result<Self> {
        let range = Self {
            low,
            high,
            name: None,
        };
        range.validate()?;
        Ok(range)
    }

    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    fn validate(&self) -> Result<()> {
        if !self.low.is_finite() || !self.high.is_finite() || self.low > self.high {
            return Err(Error::Config(format!(
                "Invalid reference range {}-{}",
                self.low, self.high
            )));
        }
        Ok(())
    }

    /// Below low is `Low`, above high is `High`, the bounds themselves are `Normal`.
    #[must_use]
    pub fn classify(&self, value: f64) -> Interpretation {
        if value < self.low {
            Interpretation::Low
        } else if value > self.high {
            Interpretation::High
        } else {
            Interpretation::Normal
        }
    }
}

/// Test code to reference range lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReferenceTable {
    ranges: BTreeMap<String, ReferenceRange>,
}

impl ReferenceTable {
    /// A table without any range. Nothing gets classified.
    pub fn empty() -> Self {
        Self {
            ranges: BTreeMap::new(),
        }
    }

    /// Add or replace the range for a code.
    #[must_use]
    pub fn with_range(mut self, code: impl Into<String>, range: ReferenceRange) -> Self {
        self.ranges.insert(code.into(), range);
        self
    }

    #[must_use]
    pub fn range(&self, code: &str) -> Option<&ReferenceRange> {
        self.ranges.get(code)
    }

    /// Display name for a code, falling back to the code itself.
    #[must_use]
    pub fn display_name<'a>(&'a self, code: &'a str) -> &'a str {
        self.ranges
            .get(code)
            .and_then(|r| r.name.as_deref())
            .unwrap_or(code)
    }

    /// Classify a value. Unknown codes and non-numeric text yield `None`.
    #[must_use]
    pub fn classify(&self, code: &str, value: &TestValue) -> Option<Interpretation> {
        let range = self.ranges.get(code)?;
        value.as_f64().map(|v| range.classify(v))
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Parse a table from JSON text.
    ///
    /// # Errors
    /// Returns `Error::Config` on malformed JSON or an invalid range.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let table: ReferenceTable = serde_json::from_str(json)
            .map_err(|e| Error::Config(format!("Invalid reference table: {e}")))?;
        for range in table.ranges.values() {
            range.validate()?;
        }
        Ok(table)
    }

    /// Load a table from a JSON file.
    ///
    /// # Errors
    /// Returns `Error::Io` if the file cannot be read, `Error::Config` if its
    /// content is invalid.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }
}

impl Default for ReferenceTable {
    /// Electrolyte panel reported by the analyzer.
    fn default() -> Self {
        let range = |low, high, name: &str| ReferenceRange {
            low,
            high,
            name: Some(name.to_string()),
        };
        Self::empty()
            .with_range("Na", range(135.0, 145.0, "Sodium"))
            .with_range("K", range(3.50, 5.10, "Potassium"))
            .with_range("Cl", range(98.0, 107.0, "Chloride"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Write;

    #[rstest]
    #[case("Na", "134.9", Some(Interpretation::Low))]
    #[case("Na", "135", Some(Interpretation::Normal))]
    #[case("Na", "145", Some(Interpretation::Normal))]
    #[case("Na", "145.1", Some(Interpretation::High))]
    #[case("K", "4.0", Some(Interpretation::Normal))]
    #[case("K", "3.4", Some(Interpretation::Low))]
    #[case("Cl", "108", Some(Interpretation::High))]
    #[case("Cl", "---", None)]
    #[case("Ca", "2.3", None)]
    fn test_default_table_classification(
        #[case] code: &str,
        #[case] raw: &str,
        #[case] expected: Option<Interpretation>,
    ) {
        let table = ReferenceTable::default();
        assert_eq!(table.classify(code, &TestValue::new(raw)), expected);
    }

    #[test]
    fn test_display_name_fallback() {
        let table = ReferenceTable::default();
        assert_eq!(table.display_name("Na"), "Sodium");
        assert_eq!(table.display_name("iCa"), "iCa");
    }

    #[test]
    fn test_invalid_range_rejected() {
        assert!(ReferenceRange::new(10.0, 1.0).is_err());
        assert!(ReferenceRange::new(f64::NAN, 1.0).is_err());
        assert!(ReferenceRange::new(1.0, 1.0).is_ok());
    }

    #[test]
    fn test_from_json() {
        let table = ReferenceTable::from_json_str(
            r#"{ "iCa": { "low": 1.12, "high": 1.32, "name": "Ionized Calcium" }, "Li": { "low": 0.6, "high": 1.2 } }"#,
        )
        .unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.display_name("iCa"), "Ionized Calcium");
        assert_eq!(table.display_name("Li"), "Li");
        assert_eq!(
            table.classify("Li", &TestValue::new("1.5")),
            Some(Interpretation::High)
        );
    }

    #[test]
    fn test_from_json_rejects_inverted_range() {
        let result = ReferenceTable::from_json_str(r#"{ "Na": { "low": 145, "high": 135 } }"#);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "Na": {{ "low": 130, "high": 150 }} }}"#).unwrap();

        let table = ReferenceTable::load(file.path()).unwrap();
        assert_eq!(
            table.classify("Na", &TestValue::new("132")),
            Some(Interpretation::Normal)
        );
    }

    #[test]
    fn test_load_missing_file() {
        let result = ReferenceTable::load("/nonexistent/ranges.json");
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
