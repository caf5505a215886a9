pub mod sample;

pub use sample::{SampleRepository, SqliteSampleRepository};
