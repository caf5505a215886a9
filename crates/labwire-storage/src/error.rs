use labwire_core::SinkError;
use thiserror::Error;

/// Errors raised by the sample store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Database connection or query execution failed
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration execution failed
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Result cannot be stored as given
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Stored payload or column could not be converted
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

/// Database trouble is worth retrying later, bad input is not.
impl From<StorageError> for SinkError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Validation(_) | StorageError::Serialization(_) => {
                SinkError::Rejected(err.to_string())
            }
            StorageError::Database(_)
            | StorageError::Migration(_)
            | StorageError::Configuration(_) => SinkError::Unavailable(err.to_string()),
        }
    }
}

/// Specialized result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_is_rejected() {
        let err: SinkError = StorageError::Validation("no sample id".into()).into();
        assert_eq!(
            err,
            SinkError::Rejected("Validation error: no sample id".into())
        );
    }

    #[test]
    fn test_database_is_unavailable() {
        let err: SinkError = StorageError::Database(sqlx::Error::PoolTimedOut).into();
        assert!(matches!(err, SinkError::Unavailable(_)));
    }
}
