use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Classification of a numeric value against its reference range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interpretation {
    Low,
    Normal,
    High,
}

impl Interpretation {
    /// Get the interpretation as the label used in reports and storage.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Interpretation::Low => "Low",
            Interpretation::Normal => "Normal",
            Interpretation::High => "High",
        }
    }
}

impl fmt::Display for Interpretation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Interpretation {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Interpretation::Low),
            "normal" => Ok(Interpretation::Normal),
            "high" => Ok(Interpretation::High),
            other => Err(crate::Error::Config(format!(
                "Unknown interpretation: {other}"
            ))),
        }
    }
}

/// One test value reported by the analyzer.
///
/// The value is kept as the text the analyzer sent (`"4.0"` stays `"4.0"`),
/// [`TestValue::as_f64`] provides the numeric view used for classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestValue {
    pub value: String,
    pub unit: Option<String>,
    pub interpretation: Option<Interpretation>,
}

impl TestValue {
    /// Create an unclassified value without unit.
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            unit: None,
            interpretation: None,
        }
    }

    /// Attach a unit. Blank units are treated as absent.
    #[must_use]
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        let unit = unit.into();
        self.unit = if unit.trim().is_empty() {
            None
        } else {
            Some(unit)
        };
        self
    }

    /// Attach an interpretation.
    #[must_use]
    pub fn with_interpretation(mut self, interpretation: Interpretation) -> Self {
        self.interpretation = Some(interpretation);
        self
    }

    /// Numeric view of the value, `None` for textual results such as `"***"`.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        self.value
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
    }
}

impl fmt::Display for TestValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.value)?;
        if let Some(unit) = &self.unit {
            write!(f, " {unit}")?;
        }
        if let Some(interpretation) = &self.interpretation {
            write!(f, " [{interpretation}]")?;
        }
        Ok(())
    }
}

/// Aggregate produced once per analyzer transmission.
///
/// # Merge Rules
///
/// - `sample_id` and `patient_name`: the first non-empty value wins. Later
///   records carrying a different identity are ignored.
/// - `tests`: keyed by test code, the last value for a code wins, since the
///   analyzer re-transmits corrected values.
///
/// # Example
///
/// ```
/// use labwire_core::{SampleResult, TestValue};
///
/// let mut result = SampleResult::new();
/// result.offer_sample_id("S100");
/// result.offer_sample_id("S200");
/// result.insert_test("Na", TestValue::new("140"));
/// result.insert_test("Na", TestValue::new("138"));
///
/// assert_eq!(result.sample_id.as_deref(), Some("S100"));
/// assert_eq!(result.test("Na").unwrap().value, "138");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleResult {
    pub sample_id: Option<String>,
    pub patient_name: Option<String>,
    pub tests: BTreeMap<String, TestValue>,
    /// Set when the transmission is finalized at end of transmission.
    pub received_at: Option<DateTime<Utc>>,
}

impl SampleResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer a sample id. Returns `true` if it was taken.
    pub fn offer_sample_id(&mut self, id: &str) -> bool {
        Self::offer(&mut self.sample_id, id)
    }

    /// Offer a patient name. Returns `true` if it was taken.
    pub fn offer_patient_name(&mut self, name: &str) -> bool {
        Self::offer(&mut self.patient_name, name)
    }

    fn offer(slot: &mut Option<String>, candidate: &str) -> bool {
        let candidate = candidate.trim();
        if slot.is_some() || candidate.is_empty() {
            return false;
        }
        *slot = Some(candidate.to_string());
        true
    }

    /// Insert a test value, returning the value it replaced.
    pub fn insert_test(&mut self, code: impl Into<String>, value: TestValue) -> Option<TestValue> {
        self.tests.insert(code.into(), value)
    }

    #[must_use]
    pub fn test(&self, code: &str) -> Option<&TestValue> {
        self.tests.get(code)
    }

    /// Whether a sample id was recovered. Results without one are never
    /// delivered.
    #[must_use]
    pub fn has_identity(&self) -> bool {
        self.sample_id.is_some()
    }

    /// Stamp the arrival time.
    #[must_use]
    pub fn finalize(mut self, at: DateTime<Utc>) -> Self {
        self.received_at = Some(at);
        self
    }
}

impl fmt::Display for SampleResult {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Sample[{}]",
            self.sample_id.as_deref().unwrap_or("<unknown>")
        )?;
        for (code, value) in &self.tests {
            write!(f, " {code}={value}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_first_sample_id_wins() {
        let mut result = SampleResult::new();
        assert!(!result.offer_sample_id("   "));
        assert!(result.offer_sample_id("S100"));
        assert!(!result.offer_sample_id("S200"));
        assert_eq!(result.sample_id.as_deref(), Some("S100"));
    }

    #[test]
    fn test_last_test_value_wins() {
        let mut result = SampleResult::new();
        assert!(result.insert_test("Na", TestValue::new("140")).is_none());
        let replaced = result.insert_test("Na", TestValue::new("138"));

        assert_eq!(replaced.unwrap().value, "140");
        assert_eq!(result.test("Na").unwrap().value, "138");
        assert_eq!(result.tests.len(), 1);
    }

    #[test]
    fn test_identity_missing() {
        let mut result = SampleResult::new();
        result.insert_test("K", TestValue::new("4.0"));
        assert!(!result.has_identity());
    }

    #[rstest]
    #[case("140", Some(140.0))]
    #[case(" 4.0 ", Some(4.0))]
    #[case("-1.5", Some(-1.5))]
    #[case("***", None)]
    #[case("", None)]
    #[case("NaN", None)]
    fn test_numeric_view(#[case] raw: &str, #[case] expected: Option<f64>) {
        assert_eq!(TestValue::new(raw).as_f64(), expected);
    }

    #[test]
    fn test_blank_unit_is_absent() {
        assert_eq!(TestValue::new("1").with_unit("  ").unit, None);
        assert_eq!(
            TestValue::new("1").with_unit("mmol/L").unit.as_deref(),
            Some("mmol/L")
        );
    }

    #[test]
    fn test_display() {
        let mut result = SampleResult::new();
        result.offer_sample_id("S1");
        result.insert_test(
            "K",
            TestValue::new("4.0")
                .with_unit("mmol/L")
                .with_interpretation(Interpretation::Normal),
        );
        assert_eq!(result.to_string(), "Sample[S1] K=4.0 mmol/L [Normal]");
    }

    #[test]
    fn test_interpretation_parse() {
        assert_eq!("HIGH".parse::<Interpretation>().unwrap(), Interpretation::High);
        assert!("critical".parse::<Interpretation>().is_err());
    }

    #[test]
    fn test_interpretation_serializes_lowercase() {
        let value = TestValue::new("150").with_interpretation(Interpretation::High);
        let json = serde_json::to_string(&value).unwrap();
        assert!(json.contains("\"high\""));
    }
}
