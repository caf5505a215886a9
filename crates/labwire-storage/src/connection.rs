use crate::error::{StorageError, StorageResult};
use sqlx::ConnectOptions;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// Where and how the sample store is opened.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub database_path: PathBuf,

    /// Pool size. Every analyzer link writes through this pool.
    pub max_connections: u32,
    pub min_connections: u32,

    /// Connections older than this are recycled
    pub max_lifetime: Duration,
    pub acquire_timeout: Duration,

    /// How long a writer waits on a locked database
    pub busy_timeout: Duration,

    pub create_if_missing: bool,

    /// Apply pending migrations when opening
    pub auto_migrate: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("labwire.db"),
            max_connections: 8,
            min_connections: 1,
            max_lifetime: Duration::from_secs(30 * 60),
            acquire_timeout: Duration::from_secs(30),
            busy_timeout: Duration::from_secs(10),
            create_if_missing: true,
            auto_migrate: true,
        }
    }
}

impl DatabaseConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            database_path: path.into(),
            ..Self::default()
        }
    }

    pub fn max_connections(mut self, n: u32) -> Self {
        self.max_connections = n;
        self
    }

    pub fn min_connections(mut self, n: u32) -> Self {
        self.min_connections = n;
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn create_if_missing(mut self, enabled: bool) -> Self {
        self.create_if_missing = enabled;
        self
    }

    pub fn auto_migrate(mut self, enabled: bool) -> Self {
        self.auto_migrate = enabled;
        self
    }

    /// WAL journal so concurrent links can write while others read.
    fn connect_options(&self) -> SqliteConnectOptions {
        SqliteConnectOptions::new()
            .filename(&self.database_path)
            .create_if_missing(self.create_if_missing)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(self.busy_timeout)
            .disable_statement_logging()
    }

    fn pool_options(&self) -> SqlitePoolOptions {
        SqlitePoolOptions::new()
            .max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .max_lifetime(Some(self.max_lifetime))
            .acquire_timeout(self.acquire_timeout)
    }
}

/// Pooled SQLite database
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (and by default create and migrate) the database.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use labwire_storage::{Database, DatabaseConfig};
    ///
    /// # async fn example() -> Result<(), labwire_storage::StorageError> {
    /// let db = Database::new(DatabaseConfig::new("data/labwire.db").max_connections(4)).await?;
    /// db.health_check().await?;
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    ///
    /// `StorageError::Configuration` if the parent directory cannot be
    /// created, `Database` if SQLite refuses the file, `Migration` if the
    /// schema cannot be applied.
    pub async fn new(config: DatabaseConfig) -> StorageResult<Self> {
        if config.create_if_missing
            && let Some(dir) = config.database_path.parent()
            && !dir.as_os_str().is_empty()
        {
            std::fs::create_dir_all(dir).map_err(|e| {
                StorageError::Configuration(format!("Cannot create {}: {e}", dir.display()))
            })?;
        }

        let pool = config
            .pool_options()
            .connect_with(config.connect_options())
            .await?;
        let db = Self { pool };

        if config.auto_migrate {
            db.migrate().await?;
        }

        info!(path = %config.database_path.display(), "Sample database ready");
        Ok(db)
    }

    /// In-memory database with the schema applied.
    ///
    /// Limited to one connection that is never recycled: each SQLite
    /// connection would otherwise open its own empty database.
    pub async fn in_memory() -> StorageResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    /// Apply the migrations embedded at build time. Already applied ones
    /// are skipped.
    pub async fn migrate(&self) -> StorageResult<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Wait for checked out connections and close the pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    pub async fn health_check(&self) -> StorageResult<()> {
        sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DatabaseConfig::default();

        assert_eq!(config.database_path, PathBuf::from("labwire.db"));
        assert_eq!(config.max_connections, 8);
        assert_eq!(config.min_connections, 1);
        assert_eq!(config.busy_timeout, Duration::from_secs(10));
        assert!(config.create_if_missing && config.auto_migrate);
    }

    #[test]
    fn test_setters() {
        let config = DatabaseConfig::new("results.db")
            .max_connections(2)
            .min_connections(0)
            .busy_timeout(Duration::from_secs(1))
            .create_if_missing(false)
            .auto_migrate(false);

        assert_eq!(config.database_path, PathBuf::from("results.db"));
        assert_eq!((config.max_connections, config.min_connections), (2, 0));
        assert_eq!(config.busy_timeout, Duration::from_secs(1));
        assert!(!config.create_if_missing);
        assert!(!config.auto_migrate);
    }

    #[tokio::test]
    async fn test_file_database_created_in_subdirectory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("labwire.db");

        let db = Database::new(DatabaseConfig::new(&path)).await.unwrap();
        db.health_check().await.unwrap();
        db.close().await;

        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_in_memory_connection_never_recycled() {
        let db = Database::in_memory().await.unwrap();
        let options = db.pool().options();

        assert_eq!(options.get_max_connections(), 1);
        assert_eq!(options.get_idle_timeout(), None);
        assert_eq!(options.get_max_lifetime(), None);
        db.close().await;
    }

    #[tokio::test]
    async fn test_missing_file_without_create() {
        let dir = tempfile::tempdir().unwrap();
        let config = DatabaseConfig::new(dir.path().join("absent.db")).create_if_missing(false);

        let result = Database::new(config).await;
        assert!(matches!(result, Err(StorageError::Database(_))));
    }
}
