//! SQLite persistence for analyzer results.
//!
//! # Architecture
//!
//! - [`Database`] - Connection pool with embedded migrations
//! - [`SampleRepository`] - Data access trait, [`SqliteSampleRepository`]
//!   implements it
//! - [`SqliteSampleSink`] - [`ResultSink`](labwire_core::ResultSink) that
//!   stores every delivered result
//! - [`transaction`] - Insert statements running inside a caller's
//!   transaction
//!
//! # Schema
//!
//! One `samples` row per completed transmission, keyed by an auto-increment
//! id and a random `record_id`. The same sample id may appear several times
//! when a sample is measured again. Test values go to `test_values`, one row
//! per code, with the numeric value and interpretation broken out for
//! querying.
//!
//! # Example
//!
//! ```no_run
//! use labwire_core::{ResultSink, SampleResult};
//! use labwire_storage::{Database, DatabaseConfig, SqliteSampleSink};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = Database::new(DatabaseConfig::new("labwire.db")).await?;
//! let sink = SqliteSampleSink::new(db.pool().clone());
//!
//! let mut result = SampleResult::new();
//! result.offer_sample_id("S100");
//! sink.deliver(result).await?;
//! # Ok(())
//! # }
//! ```

pub mod connection;
pub mod error;
pub mod models;
pub mod repositories;
pub mod sink;
pub mod transaction;

pub use connection::{Database, DatabaseConfig};
pub use error::{StorageError, StorageResult};
pub use models::{StoredSample, StoredTestValue};
pub use repositories::{SampleRepository, SqliteSampleRepository};
pub use sink::SqliteSampleSink;
