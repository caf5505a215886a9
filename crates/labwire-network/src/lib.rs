//! Transport layer for analyzer links.
//!
//! This crate moves bytes between an analyzer and a
//! [`Session`](labwire_protocol::Session): it writes the acknowledgments the
//! session asks for and hands finished results to a
//! [`ResultSink`](labwire_core::ResultSink).
//!
//! # Components
//!
//! - **AnalyzerListener**: TCP listener, one session per connection
//! - **serve_serial**: blocking RS-232 link
//! - **serve_link / serve_blocking**: driver loops for any transport
//! - **AnalyzerClient**: instrument simulator
//!
//! # Example
//!
//! ```no_run
//! use labwire_core::{ResultSink, SampleResult, SinkError};
//! use labwire_network::{AnalyzerListener, TcpListenerConfig};
//!
//! struct Print;
//!
//! impl ResultSink for Print {
//!     async fn deliver(&self, result: SampleResult) -> Result<(), SinkError> {
//!         println!("{result}");
//!         Ok(())
//!     }
//! }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let listener = AnalyzerListener::bind(TcpListenerConfig::default()).await?;
//! let summary = listener.serve_once(&Print).await?;
//! println!("{} results delivered", summary.delivered);
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
mod link;
mod serial;
mod tcp;

pub use client::{AnalyzerClient, AnalyzerClientConfig, TransmissionReport};
pub use error::LinkError;
pub use link::{LinkConfig, LinkSummary, serve_blocking, serve_link};
pub use serial::{SerialConfig, open_port, serve_serial};
pub use tcp::{AnalyzerListener, TcpListenerConfig};
