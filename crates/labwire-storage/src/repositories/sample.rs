#![allow(async_fn_in_trait)]

use crate::error::StorageResult;
use crate::models::{StoredSample, StoredTestValue};
use crate::transaction;
use chrono::{DateTime, Utc};
use labwire_core::SampleResult;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

/// Data access for stored samples.
///
/// Uses native async trait methods, no `async-trait` crate.
pub trait SampleRepository: Send + Sync {
    /// Store a result with all of its test values in one transaction.
    async fn insert(&self, result: &SampleResult) -> StorageResult<StoredSample>;

    async fn find_by_id(&self, id: i64) -> StorageResult<Option<StoredSample>>;

    async fn find_by_record_id(&self, record_id: &str) -> StorageResult<Option<StoredSample>>;

    /// Every stored transmission for a sample id, newest first.
    async fn find_by_sample_id(&self, sample_id: &str) -> StorageResult<Vec<StoredSample>>;

    async fn find_recent(&self, limit: i64) -> StorageResult<Vec<StoredSample>>;

    async fn find_by_time_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StorageResult<Vec<StoredSample>>;

    /// Test values of one stored sample, ordered by code.
    async fn test_values(&self, sample_row_id: i64) -> StorageResult<Vec<StoredTestValue>>;

    /// Rebuild the domain result from the relational columns.
    async fn load_result(&self, id: i64) -> StorageResult<Option<SampleResult>>;

    async fn count(&self) -> StorageResult<i64>;
}

const SAMPLE_COLUMNS: &str =
    "id, record_id, sample_id, patient_name, received_at, payload, created_at";

/// SQLite implementation of [`SampleRepository`]
#[derive(Debug, Clone)]
pub struct SqliteSampleRepository {
    pool: SqlitePool,
}

impl SqliteSampleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl SampleRepository for SqliteSampleRepository {
    async fn insert(&self, result: &SampleResult) -> StorageResult<StoredSample> {
        let record_id = Uuid::new_v4().to_string();

        let mut tx = self.pool.begin().await?;
        let row_id = transaction::insert_sample(&mut tx, &record_id, result).await?;
        for (code, value) in &result.tests {
            transaction::insert_test_value(&mut tx, row_id, code, value).await?;
        }

        let stored = sqlx::query_as::<_, StoredSample>(&format!(
            "SELECT {SAMPLE_COLUMNS} FROM samples WHERE id = ?"
        ))
        .bind(row_id)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        debug!(
            row_id,
            record_id = %record_id,
            sample_id = %stored.sample_id,
            tests = result.tests.len(),
            "Sample stored"
        );
        Ok(stored)
    }

    async fn find_by_id(&self, id: i64) -> StorageResult<Option<StoredSample>> {
        let sample = sqlx::query_as::<_, StoredSample>(&format!(
            "SELECT {SAMPLE_COLUMNS} FROM samples WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(sample)
    }

    async fn find_by_record_id(&self, record_id: &str) -> StorageResult<Option<StoredSample>> {
        let sample = sqlx::query_as::<_, StoredSample>(&format!(
            "SELECT {SAMPLE_COLUMNS} FROM samples WHERE record_id = ?"
        ))
        .bind(record_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(sample)
    }

    async fn find_by_sample_id(&self, sample_id: &str) -> StorageResult<Vec<StoredSample>> {
        let samples = sqlx::query_as::<_, StoredSample>(&format!(
            "SELECT {SAMPLE_COLUMNS} FROM samples WHERE sample_id = ? \
             ORDER BY received_at DESC, id DESC"
        ))
        .bind(sample_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(samples)
    }

    async fn find_recent(&self, limit: i64) -> StorageResult<Vec<StoredSample>> {
        let samples = sqlx::query_as::<_, StoredSample>(&format!(
            "SELECT {SAMPLE_COLUMNS} FROM samples ORDER BY received_at DESC, id DESC LIMIT ?"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(samples)
    }

    async fn find_by_time_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StorageResult<Vec<StoredSample>> {
        let samples = sqlx::query_as::<_, StoredSample>(&format!(
            "SELECT {SAMPLE_COLUMNS} FROM samples \
             WHERE received_at >= ? AND received_at <= ? \
             ORDER BY received_at ASC, id ASC"
        ))
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        Ok(samples)
    }

    async fn test_values(&self, sample_row_id: i64) -> StorageResult<Vec<StoredTestValue>> {
        let values = sqlx::query_as::<_, StoredTestValue>(
            r#"
            SELECT id, sample_row_id, code, value, numeric_value, unit, interpretation
            FROM test_values
            WHERE sample_row_id = ?
            ORDER BY code
            "#,
        )
        .bind(sample_row_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(values)
    }

    async fn load_result(&self, id: i64) -> StorageResult<Option<SampleResult>> {
        let Some(sample) = self.find_by_id(id).await? else {
            return Ok(None);
        };

        let mut result = SampleResult::new();
        result.sample_id = Some(sample.sample_id);
        result.patient_name = sample.patient_name;
        result.received_at = Some(sample.received_at);
        for row in self.test_values(id).await? {
            result.insert_test(row.code.clone(), row.to_test_value());
        }

        Ok(Some(result))
    }

    async fn count(&self) -> StorageResult<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM samples")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Database;
    use crate::error::StorageError;
    use chrono::{Duration, TimeZone};
    use labwire_core::{Interpretation, TestValue};

    async fn setup() -> SqliteSampleRepository {
        let db = Database::in_memory().await.unwrap();
        SqliteSampleRepository::new(db.pool().clone())
    }

    fn electrolytes(sample_id: &str, received_at: DateTime<Utc>) -> SampleResult {
        let mut result = SampleResult::new();
        result.offer_sample_id(sample_id);
        result.offer_patient_name("DOE JANE");
        result.insert_test(
            "Na",
            TestValue::new("140")
                .with_unit("mmol/L")
                .with_interpretation(Interpretation::Normal),
        );
        result.insert_test(
            "K",
            TestValue::new("5.6")
                .with_unit("mmol/L")
                .with_interpretation(Interpretation::High),
        );
        result.finalize(received_at)
    }

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, hour, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_find() {
        let repo = setup().await;

        let stored = repo.insert(&electrolytes("S100", at(9))).await.unwrap();
        assert!(stored.id > 0);
        assert!(stored.record_uuid().is_some());
        assert_eq!(stored.sample_id, "S100");
        assert_eq!(stored.patient_name.as_deref(), Some("DOE JANE"));
        assert_eq!(stored.received_at, at(9));

        let by_id = repo.find_by_id(stored.id).await.unwrap().unwrap();
        assert_eq!(by_id.record_id, stored.record_id);

        let by_record = repo
            .find_by_record_id(&stored.record_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_record.id, stored.id);
    }

    #[tokio::test]
    async fn test_load_result_matches_payload() {
        let repo = setup().await;
        let original = electrolytes("S100", at(9));

        let stored = repo.insert(&original).await.unwrap();
        let loaded = repo.load_result(stored.id).await.unwrap().unwrap();

        assert_eq!(loaded, original);
        assert_eq!(stored.payload_result().unwrap(), original);
    }

    #[tokio::test]
    async fn test_values_ordered_by_code() {
        let repo = setup().await;
        let stored = repo.insert(&electrolytes("S100", at(9))).await.unwrap();

        let values = repo.test_values(stored.id).await.unwrap();
        let codes: Vec<&str> = values.iter().map(|v| v.code.as_str()).collect();
        assert_eq!(codes, vec!["K", "Na"]);
        assert_eq!(values[0].numeric_value, Some(5.6));
        assert_eq!(values[0].get_interpretation(), Some(Interpretation::High));
    }

    #[tokio::test]
    async fn test_same_sample_stored_twice() {
        let repo = setup().await;
        repo.insert(&electrolytes("S100", at(9))).await.unwrap();
        repo.insert(&electrolytes("S100", at(10))).await.unwrap();
        repo.insert(&electrolytes("S200", at(11))).await.unwrap();

        let rows = repo.find_by_sample_id("S100").await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].received_at, at(10));
        assert_eq!(repo.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_find_recent_and_range() {
        let repo = setup().await;
        for (id, hour) in [("S1", 8), ("S2", 9), ("S3", 10)] {
            repo.insert(&electrolytes(id, at(hour))).await.unwrap();
        }

        let recent = repo.find_recent(2).await.unwrap();
        let ids: Vec<&str> = recent.iter().map(|s| s.sample_id.as_str()).collect();
        assert_eq!(ids, vec!["S3", "S2"]);

        let range = repo
            .find_by_time_range(at(9) - Duration::minutes(1), at(10))
            .await
            .unwrap();
        let ids: Vec<&str> = range.iter().map(|s| s.sample_id.as_str()).collect();
        assert_eq!(ids, vec!["S2", "S3"]);
    }

    #[tokio::test]
    async fn test_result_without_identity_not_stored() {
        let repo = setup().await;

        let err = repo.insert(&SampleResult::new()).await.unwrap_err();
        assert!(matches!(err, StorageError::Validation(_)));
        assert_eq!(repo.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_missing_row() {
        let repo = setup().await;
        assert!(repo.find_by_id(42).await.unwrap().is_none());
        assert!(repo.load_result(42).await.unwrap().is_none());
    }
}
