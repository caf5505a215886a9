//! Delivery interface for finalized sample results.
//!
//! The session hands a [`SampleResult`] to a [`ResultSink`] at most once per
//! completed transmission. Sinks own their consistency: independent links may
//! deliver concurrently, the protocol layer takes no lock on their behalf.

use crate::{SampleResult, SinkError};
use std::future::Future;
use std::sync::Arc;

/// Receiver of finalized sample results.
///
/// Implementors may write `async fn deliver`; the returned future must be
/// `Send` so a link can run on a multi-threaded runtime.
///
/// # Example
///
/// ```
/// use labwire_core::{ResultSink, SampleResult, SinkError};
///
/// struct Discard;
///
/// impl ResultSink for Discard {
///     async fn deliver(&self, _result: SampleResult) -> Result<(), SinkError> {
///         Ok(())
///     }
/// }
/// ```
pub trait ResultSink: Send + Sync {
    /// Deliver one result. Failures are reported, never retried by the caller.
    fn deliver(
        &self,
        result: SampleResult,
    ) -> impl Future<Output = Result<(), SinkError>> + Send;
}

impl<S: ResultSink + ?Sized> ResultSink for Arc<S> {
    fn deliver(
        &self,
        result: SampleResult,
    ) -> impl Future<Output = Result<(), SinkError>> + Send {
        (**self).deliver(result)
    }
}

impl<S: ResultSink + ?Sized> ResultSink for &S {
    fn deliver(
        &self,
        result: SampleResult,
    ) -> impl Future<Output = Result<(), SinkError>> + Send {
        (**self).deliver(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Collecting {
        results: Mutex<Vec<SampleResult>>,
    }

    impl ResultSink for Collecting {
        async fn deliver(&self, result: SampleResult) -> Result<(), SinkError> {
            self.results.lock().unwrap().push(result);
            Ok(())
        }
    }

    struct Refusing;

    impl ResultSink for Refusing {
        async fn deliver(&self, _result: SampleResult) -> Result<(), SinkError> {
            Err(SinkError::Rejected("read-only".to_string()))
        }
    }

    #[tokio::test]
    async fn test_shared_sink_delivers_through_arc() {
        let sink = Arc::new(Collecting::default());
        let shared = Arc::clone(&sink);

        let mut result = SampleResult::new();
        result.offer_sample_id("S1");
        shared.deliver(result).await.unwrap();

        assert_eq!(sink.results.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failure_is_reported() {
        let err = Refusing.deliver(SampleResult::new()).await.unwrap_err();
        assert_eq!(err, SinkError::Rejected("read-only".to_string()));
    }
}
