use crate::error::StorageResult;
use chrono::{DateTime, Utc};
use labwire_core::SampleResult;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One completed transmission as stored in the `samples` table.
///
/// The test values live in `test_values`; `payload` additionally keeps the
/// whole [`SampleResult`] as JSON exactly as it was delivered, so a row can
/// be re-exported even if the column layout changes later.
///
/// # Fields
///
/// * `id` - Auto-increment primary key
/// * `record_id` - Random UUID handed out at insert, stable across exports
/// * `sample_id` - Sample identifier recovered from the transmission
/// * `patient_name` - Patient name, if the analyzer sent one
/// * `received_at` - When the transmission was finalized
/// * `payload` - JSON serialized `SampleResult`
/// * `created_at` - When the row was written
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct StoredSample {
    pub id: i64,
    pub record_id: String,
    pub sample_id: String,
    pub patient_name: Option<String>,
    pub received_at: DateTime<Utc>,
    pub payload: String,
    pub created_at: DateTime<Utc>,
}

impl StoredSample {
    /// Parsed `record_id`, `None` if the column was edited by hand.
    pub fn record_uuid(&self) -> Option<Uuid> {
        Uuid::parse_str(&self.record_id).ok()
    }

    /// Decode the delivered result from `payload`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if the payload is not a valid
    /// serialized `SampleResult`.
    pub fn payload_result(&self) -> StorageResult<SampleResult> {
        Ok(serde_json::from_str(&self.payload)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StorageError;

    fn stored(payload: &str) -> StoredSample {
        StoredSample {
            id: 1,
            record_id: Uuid::new_v4().to_string(),
            sample_id: "S100".to_string(),
            patient_name: None,
            received_at: Utc::now(),
            payload: payload.to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_payload_round_trip() {
        let mut result = SampleResult::new();
        result.offer_sample_id("S100");
        let row = stored(&serde_json::to_string(&result).unwrap());

        assert_eq!(row.payload_result().unwrap(), result);
        assert!(row.record_uuid().is_some());
    }

    #[test]
    fn test_corrupt_payload() {
        let mut row = stored("{not json");
        row.record_id = "manual".to_string();

        assert!(matches!(
            row.payload_result(),
            Err(StorageError::Serialization(_))
        ));
        assert_eq!(row.record_uuid(), None);
    }
}
