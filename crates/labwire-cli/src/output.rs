use clap::ValueEnum;
use labwire_core::{ReferenceTable, ResultSink, SampleResult, SinkError};
use labwire_storage::SqliteSampleSink;
use std::fmt::Write as _;
use std::sync::Arc;

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One block per sample with test names
    Text,
    /// One JSON object per line
    Json,
}

/// Renders delivered results for stdout.
#[derive(Debug, Clone)]
pub struct ResultPrinter {
    format: OutputFormat,
    table: Arc<ReferenceTable>,
}

impl ResultPrinter {
    pub fn new(format: OutputFormat, table: Arc<ReferenceTable>) -> Self {
        Self { format, table }
    }

    pub fn render(&self, result: &SampleResult) -> serde_json::Result<String> {
        match self.format {
            OutputFormat::Json => serde_json::to_string(result),
            OutputFormat::Text => Ok(self.render_text(result)),
        }
    }

    fn render_text(&self, result: &SampleResult) -> String {
        let mut out = format!(
            "Sample {}",
            result.sample_id.as_deref().unwrap_or("<unknown>")
        );
        if let Some(name) = &result.patient_name {
            let _ = write!(out, " ({name})");
        }
        for (code, value) in &result.tests {
            let _ = write!(out, "\n  {:<10} {value}", self.table.display_name(code));
        }
        out
    }
}

/// Sink used by the listen commands: prints every result and stores it
/// when a database is configured.
pub struct CliSink {
    printer: ResultPrinter,
    store: Option<SqliteSampleSink>,
}

impl CliSink {
    pub fn new(printer: ResultPrinter, store: Option<SqliteSampleSink>) -> Self {
        Self { printer, store }
    }
}

impl ResultSink for CliSink {
    async fn deliver(&self, result: SampleResult) -> Result<(), SinkError> {
        let rendered = self
            .printer
            .render(&result)
            .map_err(|e| SinkError::Rejected(e.to_string()))?;
        println!("{rendered}");

        if let Some(store) = &self.store {
            store.deliver(result).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use labwire_core::{Interpretation, TestValue};

    fn sample() -> SampleResult {
        let mut result = SampleResult::new();
        result.offer_sample_id("S100");
        result.offer_patient_name("DOE JANE");
        result.insert_test(
            "Na",
            TestValue::new("150")
                .with_unit("mmol/L")
                .with_interpretation(Interpretation::High),
        );
        result.insert_test("XY", TestValue::new("7"));
        result
    }

    #[test]
    fn test_text_uses_display_names() {
        let printer = ResultPrinter::new(OutputFormat::Text, Arc::new(ReferenceTable::default()));
        let text = printer.render(&sample()).unwrap();

        assert_eq!(
            text,
            "Sample S100 (DOE JANE)\n  Sodium     150 mmol/L [High]\n  XY         7"
        );
    }

    #[test]
    fn test_json_is_single_line() {
        let printer = ResultPrinter::new(OutputFormat::Json, Arc::new(ReferenceTable::default()));
        let json = printer.render(&sample()).unwrap();

        assert!(!json.contains('\n'));
        let parsed: SampleResult = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, sample());
    }
}
