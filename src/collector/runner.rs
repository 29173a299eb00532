//! Recurring collector loop.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::collector::{CollectorError, FnProducer, MIN_INTERVAL, Producer};
use crate::storage::{MetricSample, StorageWriter};

/// Default time between cycles (5 minutes).
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(300);

/// Default bound on a single producer call.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(10);

/// Outcome of one pass over all producers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleReport {
    /// Labels whose value was stored, in call order.
    pub succeeded: Vec<String>,
    /// Labels that failed, with the error message, in call order.
    pub failed: Vec<(String, String)>,
}

impl CycleReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Polls every registered producer, stores each value, sleeps, repeats.
///
/// A failing producer never affects the others or the schedule: its error is
/// logged and the loop moves on.
pub struct CollectorLoop {
    writer: StorageWriter,
    interval: Duration,
    call_timeout: Duration,
    producers: Vec<Arc<dyn Producer>>,
}

impl std::fmt::Debug for CollectorLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectorLoop")
            .field("interval", &self.interval)
            .field("call_timeout", &self.call_timeout)
            .field("producers", &self.labels())
            .finish_non_exhaustive()
    }
}

impl CollectorLoop {
    /// Create a loop writing to `writer` every `interval`.
    ///
    /// Interval is clamped to a minimum of 1 second.
    pub fn new(writer: StorageWriter, interval: Duration) -> Self {
        let interval = if interval < MIN_INTERVAL {
            tracing::warn!(min_interval = ?MIN_INTERVAL,
                "Interval duration is less than minimum allowed. Using minimum duration."
            );
            MIN_INTERVAL
        } else {
            interval
        };

        Self {
            writer,
            interval,
            call_timeout: DEFAULT_CALL_TIMEOUT,
            producers: Vec::new(),
        }
    }

    /// Set the per-producer call timeout.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Add a producer. Producers run in registration order.
    ///
    /// # Errors
    /// Returns `CollectorError::Config` if the label is empty or already registered.
    pub fn register(&mut self, producer: impl Producer) -> Result<(), CollectorError> {
        let label = producer.source();
        if label.trim().is_empty() {
            return Err(CollectorError::Config("producer label is empty".to_string()));
        }
        if self.producers.iter().any(|p| p.source() == label) {
            return Err(CollectorError::Config(format!(
                "producer '{label}' is already registered"
            )));
        }

        tracing::info!(source = label, "Producer registered");
        self.producers.push(Arc::new(producer));
        Ok(())
    }

    /// Add an async closure as a producer.
    pub fn register_fn<F, Fut>(&mut self, label: impl Into<String>, f: F) -> Result<(), CollectorError>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<f64, CollectorError>> + Send + 'static,
    {
        self.register(FnProducer::new(label, f))
    }

    /// Registered labels in call order.
    pub fn labels(&self) -> Vec<&str> {
        self.producers.iter().map(|p| p.source()).collect()
    }

    /// Call every producer once and store each successful value.
    pub async fn run_cycle(&self) -> CycleReport {
        let mut report = CycleReport::default();

        for producer in &self.producers {
            let label = producer.source();
            match self.collect_one(producer).await {
                Ok(value) => {
                    tracing::info!(source = label, value, "Sample stored");
                    report.succeeded.push(label.to_string());
                }
                Err(e) => {
                    tracing::error!(source = label, error = %e, "Producer failed");
                    report.failed.push((label.to_string(), e.to_string()));
                }
            }
        }

        tracing::debug!(
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            "Collection cycle finished"
        );
        report
    }

    async fn collect_one(&self, producer: &Arc<dyn Producer>) -> Result<f64, CollectorError> {
        // Own task per call, so a panic surfaces as a JoinError here.
        let mut call = AbortOnDrop(tokio::spawn({
            let producer = Arc::clone(producer);
            async move { producer.produce().await }
        }));
        let value = match tokio::time::timeout(self.call_timeout, &mut call.0).await {
            Ok(Ok(result)) => result?,
            Ok(Err(e)) => return Err(CollectorError::Panicked(e.to_string())),
            Err(_) => return Err(CollectorError::Timeout(self.call_timeout)),
        };
        if !value.is_finite() {
            return Err(CollectorError::InvalidValue(value));
        }

        self.writer
            .insert_sample(MetricSample::new(producer.source(), value))
            .await?;
        Ok(value)
    }

    /// Run forever: one cycle, then a full interval of sleep.
    pub async fn run(&self) {
        tracing::info!(
            interval = ?self.interval,
            producers = self.producers.len(),
            "Collector loop started"
        );
        loop {
            self.run_cycle().await;
            tokio::time::sleep(self.interval).await;
        }
    }

    /// Run the loop on a tokio task.
    pub fn spawn(self) -> CollectorHandle {
        let task = tokio::spawn(async move { self.run().await });
        CollectorHandle { task }
    }
}

/// Aborts the wrapped task when dropped (timeout or loop shutdown).
struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Handle to a spawned [`CollectorLoop`].
#[derive(Debug)]
pub struct CollectorHandle {
    task: JoinHandle<()>,
}

impl CollectorHandle {
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop the loop at its next suspension point and wait for it.
    ///
    /// Each sample is a single-row insert, so no partial write is left behind.
    pub async fn shutdown(self) {
        self.task.abort();
        match self.task.await {
            Ok(()) => {}
            Err(e) if e.is_cancelled() => {}
            Err(e) => tracing::error!(error = %e, "Collector task failed"),
        }
        tracing::info!("Collector loop stopped");
    }
}
