//! Row types of the sample store.

pub mod sample;
pub mod test_value;

pub use sample::StoredSample;
pub use test_value::StoredTestValue;
