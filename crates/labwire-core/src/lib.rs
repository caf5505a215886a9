pub mod constants;
pub mod error;
pub mod reference;
pub mod sink;
pub mod types;

pub use error::{Error, Result, SinkError};
pub use reference::{ReferenceRange, ReferenceTable};
pub use sink::ResultSink;
pub use types::*;

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
