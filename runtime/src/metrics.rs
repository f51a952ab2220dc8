//! Prometheus metrics for observability and monitoring.
//!
//! The runtime records `store.*` counters and histograms from the Store and
//! `retry_*` counters from the retry helpers. Applications describe their own
//! metrics and install a recorder once at startup through [`MetricsExporter`].
//!
//! # Example
//!
//! ```rust,no_run
//! use seatflow_runtime::metrics::MetricsExporter;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut exporter = MetricsExporter::new();
//! exporter.install()?;
//!
//! // ... run the application ...
//!
//! if let Some(snapshot) = exporter.render() {
//!     println!("{snapshot}");
//! }
//! # Ok(())
//! # }
//! ```

use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use thiserror::Error;

// Re-export metrics macros for use in other modules
pub use metrics::{counter, gauge, histogram};

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Prometheus recorder plus the handle used to render a text snapshot.
#[derive(Default)]
pub struct MetricsExporter {
    handle: Option<PrometheusHandle>,
}

impl MetricsExporter {
    /// Create an exporter that has not been installed yet.
    #[must_use]
    pub const fn new() -> Self {
        Self { handle: None }
    }

    /// Describe the runtime metrics and install the Prometheus recorder.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError`] if the exporter cannot be built or installed.
    /// A recorder that is already installed (as in tests) is not an error;
    /// the exporter then has nothing to render.
    pub fn install(&mut self) -> Result<(), MetricsError> {
        describe_runtime_metrics();

        let builder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Suffix("seconds".to_string()),
                &[0.001, 0.01, 0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?;

        match builder.install_recorder() {
            Ok(handle) => {
                self.handle = Some(handle);
                tracing::info!("Prometheus metrics recorder installed");
                Ok(())
            },
            Err(e) => {
                let err_msg = e.to_string();
                if err_msg.contains("already") {
                    tracing::warn!("Metrics recorder already initialized, skipping");
                    Ok(())
                } else {
                    Err(MetricsError::Install(err_msg))
                }
            },
        }
    }

    /// Get the metrics handle for rendering.
    #[must_use]
    pub const fn handle(&self) -> Option<&PrometheusHandle> {
        self.handle.as_ref()
    }

    /// Render current metrics in Prometheus text format.
    ///
    /// Returns `None` if this exporter did not install the recorder.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

/// Describe the metrics emitted by the runtime itself.
pub fn describe_runtime_metrics() {
    describe_counter!("store.commands.total", "Actions processed by the store");
    describe_histogram!(
        "store.reducer.duration_seconds",
        "Time spent inside the reducer while holding the state lock"
    );
    describe_histogram!("store.effects.count", "Effects returned per reducer step");
    describe_counter!("store.effects.executed", "Effects started, by type");
    describe_counter!(
        "store.shutdown.rejected_actions",
        "Actions rejected because the store was shutting down"
    );

    describe_counter!("retry_attempts_total", "Total number of retry attempts");
    describe_counter!("retry_successes_total", "Operations that succeeded after retrying");
    describe_counter!(
        "retry_exhausted_total",
        "Operations that failed after exhausting their retry budget"
    );
}

/// Retry metrics recorder.
pub struct RetryMetrics;

impl RetryMetrics {
    /// Record a retry attempt.
    pub fn record_attempt() {
        counter!("retry_attempts_total").increment(1);
    }

    /// Record a successful retry.
    pub fn record_success() {
        counter!("retry_successes_total").increment(1);
    }

    /// Record exhausted retries.
    pub fn record_exhausted() {
        counter!("retry_exhausted_total").increment(1);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_exporter_starts_uninstalled() {
        let exporter = MetricsExporter::new();
        assert!(exporter.handle().is_none());
        assert!(exporter.render().is_none());
    }

    #[test]
    fn test_exporter_renders_retry_metrics() {
        let mut exporter = MetricsExporter::new();
        exporter.install().unwrap();

        RetryMetrics::record_attempt();
        RetryMetrics::record_exhausted();

        // Another test may have installed the global recorder first
        if let Some(rendered) = exporter.render() {
            assert!(rendered.contains("retry_attempts_total"));
            assert!(rendered.contains("retry_exhausted_total"));
        }
    }
}
