//! [`ResultSink`] backed by the sample store.

use crate::repositories::{SampleRepository, SqliteSampleRepository};
use labwire_core::{ResultSink, SampleResult, SinkError};
use sqlx::SqlitePool;
use tracing::info;

/// Persists every delivered result.
///
/// Cloning is cheap, clones share the connection pool. Concurrent links may
/// deliver at the same time; SQLite serializes the writes.
#[derive(Debug, Clone)]
pub struct SqliteSampleSink {
    repository: SqliteSampleRepository,
}

impl SqliteSampleSink {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            repository: SqliteSampleRepository::new(pool),
        }
    }

    pub fn repository(&self) -> &SqliteSampleRepository {
        &self.repository
    }
}

impl ResultSink for SqliteSampleSink {
    async fn deliver(&self, result: SampleResult) -> Result<(), SinkError> {
        let stored = self.repository.insert(&result).await?;
        info!(
            row_id = stored.id,
            sample_id = %stored.sample_id,
            "Result persisted"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Database;
    use labwire_core::TestValue;

    #[tokio::test]
    async fn test_deliver_persists() {
        let db = Database::in_memory().await.unwrap();
        let sink = SqliteSampleSink::new(db.pool().clone());

        let mut result = SampleResult::new();
        result.offer_sample_id("S100");
        result.insert_test("Cl", TestValue::new("102"));
        sink.deliver(result).await.unwrap();

        let rows = sink.repository().find_by_sample_id("S100").await.unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn test_result_without_identity_rejected() {
        let db = Database::in_memory().await.unwrap();
        let sink = SqliteSampleSink::new(db.pool().clone());

        let err = sink.deliver(SampleResult::new()).await.unwrap_err();
        assert!(matches!(err, SinkError::Rejected(_)));
    }

    #[tokio::test]
    async fn test_closed_pool_is_unavailable() {
        let db = Database::in_memory().await.unwrap();
        let sink = SqliteSampleSink::new(db.pool().clone());
        db.close().await;

        let mut result = SampleResult::new();
        result.offer_sample_id("S100");
        let err = sink.deliver(result).await.unwrap_err();
        assert!(matches!(err, SinkError::Unavailable(_)));
    }
}
