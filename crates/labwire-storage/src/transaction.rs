//! Statements that run inside a caller-owned transaction.
//!
//! A sample and its test values are written together or not at all:
//!
//! ```no_run
//! use labwire_core::{SampleResult, TestValue};
//! use labwire_storage::{Database, transaction};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = Database::in_memory().await?;
//!
//! let mut result = SampleResult::new();
//! result.offer_sample_id("S100");
//! result.insert_test("Na", TestValue::new("140"));
//!
//! let mut tx = db.pool().begin().await?;
//! let row_id = transaction::insert_sample(&mut tx, "2f1c...", &result).await?;
//! for (code, value) in &result.tests {
//!     transaction::insert_test_value(&mut tx, row_id, code, value).await?;
//! }
//! tx.commit().await?;
//! # Ok(())
//! # }
//! ```
//!
//! Dropping the transaction without `commit()` rolls everything back.

use crate::error::{StorageError, StorageResult};
use chrono::Utc;
use labwire_core::{SampleResult, TestValue};
use sqlx::{Sqlite, Transaction};

/// Insert the `samples` row for `result`.
///
/// `received_at` falls back to now for results that were never finalized.
///
/// # Returns
///
/// The auto-generated row id.
///
/// # Errors
///
/// Returns error if:
/// - The result carries no sample id (`StorageError::Validation`)
/// - `record_id` is already taken
/// - The payload cannot be serialized
pub async fn insert_sample(
    tx: &mut Transaction<'_, Sqlite>,
    record_id: &str,
    result: &SampleResult,
) -> StorageResult<i64> {
    let sample_id = result
        .sample_id
        .as_deref()
        .ok_or_else(|| StorageError::Validation("Result has no sample id".to_string()))?;
    let payload = serde_json::to_string(result)?;

    let row = sqlx::query(
        r#"
        INSERT INTO samples (record_id, sample_id, patient_name, received_at, payload)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(record_id)
    .bind(sample_id)
    .bind(&result.patient_name)
    .bind(result.received_at.unwrap_or_else(Utc::now))
    .bind(payload)
    .execute(&mut **tx)
    .await?;

    Ok(row.last_insert_rowid())
}

/// Insert one test value of the sample stored at `sample_row_id`.
///
/// # Errors
///
/// Returns error if the code is already stored for this sample or the
/// sample row does not exist.
pub async fn insert_test_value(
    tx: &mut Transaction<'_, Sqlite>,
    sample_row_id: i64,
    code: &str,
    value: &TestValue,
) -> StorageResult<i64> {
    let row = sqlx::query(
        r#"
        INSERT INTO test_values (
            sample_row_id, code, value, numeric_value, unit, interpretation
        )
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(sample_row_id)
    .bind(code)
    .bind(&value.value)
    .bind(value.as_f64())
    .bind(&value.unit)
    .bind(value.interpretation.map(|i| i.as_str()))
    .execute(&mut **tx)
    .await?;

    Ok(row.last_insert_rowid())
}
