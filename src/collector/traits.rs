//! Core producer trait and error type.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

use crate::source::SourceError;
use crate::storage::StorageError;

/// Minimum allowed loop interval (1 second).
pub const MIN_INTERVAL: Duration = Duration::from_secs(1);

/// Errors that can occur during collection.
#[derive(Debug, Error)]
pub enum CollectorError {
    /// Upstream request or response handling failed.
    #[error("source error: {0}")]
    Source(#[from] SourceError),

    /// Failed to persist the sample.
    #[error("failed to store sample: {0}")]
    Storage(#[from] StorageError),

    /// Producer did not finish within the call timeout.
    #[error("timeout elapsed after {0:?}")]
    Timeout(Duration),

    /// Producer returned NaN or an infinite value.
    #[error("non-finite value: {0}")]
    InvalidValue(f64),

    /// Producer panicked while producing a value.
    #[error("producer panicked: {0}")]
    Panicked(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),
}

/// A named source of one scalar metric value per call.
///
/// The loop calls [`produce`](Producer::produce) once per cycle and stores the
/// result under [`source`](Producer::source). Errors and panics are logged by
/// the loop as failures of this producer and never stop it.
#[async_trait::async_trait]
pub trait Producer: Send + Sync + 'static {
    /// Label stored as the sample's `source`.
    fn source(&self) -> &str;

    /// Fetch the current value.
    async fn produce(&self) -> Result<f64, CollectorError>;
}

/// [`Producer`] backed by an async closure.
pub struct FnProducer<F> {
    label: String,
    f: F,
}

impl<F> FnProducer<F> {
    pub fn new(label: impl Into<String>, f: F) -> Self {
        Self {
            label: label.into(),
            f,
        }
    }
}

impl<F> std::fmt::Debug for FnProducer<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnProducer")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl<F, Fut> Producer for FnProducer<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<f64, CollectorError>> + Send + 'static,
{
    fn source(&self) -> &str {
        &self.label
    }

    async fn produce(&self) -> Result<f64, CollectorError> {
        (self.f)().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fn_producer() {
        let producer = FnProducer::new("answer", || async { Ok::<_, CollectorError>(42.0) });
        assert_eq!(producer.source(), "answer");
        assert_eq!(producer.produce().await.unwrap(), 42.0);
    }

    #[tokio::test]
    async fn test_fn_producer_error() {
        let producer = FnProducer::new("broken", || async {
            Err::<f64, _>(CollectorError::Config("no upstream".to_string()))
        });
        let err = producer.produce().await.unwrap_err();
        assert!(err.to_string().contains("no upstream"));
    }

    #[test]
    fn test_error_display() {
        let err = CollectorError::Timeout(Duration::from_secs(10));
        assert_eq!(err.to_string(), "timeout elapsed after 10s");
        assert!(CollectorError::InvalidValue(f64::NAN).to_string().contains("NaN"));
        assert_eq!(
            CollectorError::Panicked("boom".to_string()).to_string(),
            "producer panicked: boom"
        );
    }
}
