//! Prometheus metrics for observability and monitoring.
//!
//! Stores record through the `metrics` facade whether or not a recorder is
//! installed; without one the calls are no-ops. [`MetricsRecorder`] installs a
//! Prometheus recorder and renders the collected metrics as text, leaving the
//! choice of transport to the embedding application.
//!
//! Every metric carries a `store` label with the store's configured name.
//!
//! # Example
//!
//! ```rust,no_run
//! use action_store_runtime::metrics::MetricsRecorder;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut recorder = MetricsRecorder::new();
//! recorder.install()?;
//!
//! // ... dispatch some actions ...
//!
//! if let Some(text) = recorder.render() {
//!     println!("{text}");
//! }
//! # Ok(())
//! # }
//! ```

use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;
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

/// Prometheus metrics recorder.
///
/// Installs a global Prometheus recorder and renders its contents on demand.
#[derive(Default)]
pub struct MetricsRecorder {
    handle: Option<PrometheusHandle>,
}

impl MetricsRecorder {
    /// Create a recorder that has not been installed yet.
    #[must_use]
    pub const fn new() -> Self {
        Self { handle: None }
    }

    /// Describe the store metrics and install the Prometheus recorder.
    ///
    /// # Errors
    ///
    /// Returns error if the exporter cannot be built or installed.
    ///
    /// # Note
    ///
    /// If a recorder is already installed (e.g., by another test), this
    /// returns `Ok(())` without a handle, and [`MetricsRecorder::render`]
    /// returns `None`.
    pub fn install(&mut self) -> Result<(), MetricsError> {
        register_metrics();

        let builder = PrometheusBuilder::new()
            // Handler latencies range from in-memory arithmetic to network calls
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[
                    0.000_01, 0.000_1, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 5.0,
                ],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?;

        match builder.install_recorder() {
            Ok(handle) => {
                self.handle = Some(handle);
                tracing::info!("Prometheus metrics recorder installed");
                Ok(())
            }
            Err(e) => {
                let err_msg = e.to_string();
                if err_msg.contains("already initialized") {
                    tracing::warn!("Metrics recorder already initialized, skipping re-initialization");
                    Ok(())
                } else {
                    Err(MetricsError::Install(err_msg))
                }
            }
        }
    }

    /// Get the metrics handle for rendering.
    #[must_use]
    pub const fn handle(&self) -> Option<&PrometheusHandle> {
        self.handle.as_ref()
    }

    /// Render current metrics in Prometheus text format.
    ///
    /// Returns `None` if this recorder was never installed.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

/// Register all metric descriptions.
fn register_metrics() {
    describe_counter!(
        "store_dispatch_total",
        "Total number of actions dispatched to stores"
    );
    describe_counter!(
        "store_dispatch_unknown_type_total",
        "Total number of dispatches whose action type had no handler"
    );
    describe_counter!(
        "store_handler_failures_total",
        "Total number of handler invocations that failed"
    );
    describe_histogram!(
        "store_handler_duration_seconds",
        "Time from handler invocation to handler completion"
    );
    describe_counter!(
        "store_publish_total",
        "Total number of states published to subscribers"
    );
    describe_gauge!(
        "store_subscribers",
        "Number of callbacks notified by the last publication"
    );
}

/// Store metrics recorder.
pub struct StoreMetrics;

impl StoreMetrics {
    /// Record a dispatch call.
    pub fn record_dispatch(store: &str) {
        counter!("store_dispatch_total", "store" => store.to_owned()).increment(1);
    }

    /// Record a dispatch rejected for an unknown action type.
    pub fn record_unknown_action_type(store: &str) {
        counter!("store_dispatch_unknown_type_total", "store" => store.to_owned()).increment(1);
    }

    /// Record a completed handler invocation.
    pub fn record_handler(store: &str, duration: Duration, succeeded: bool) {
        histogram!("store_handler_duration_seconds", "store" => store.to_owned())
            .record(duration.as_secs_f64());
        if !succeeded {
            counter!("store_handler_failures_total", "store" => store.to_owned()).increment(1);
        }
    }

    /// Record a state publication.
    pub fn record_publish(store: &str, subscribers: usize) {
        counter!("store_publish_total", "store" => store.to_owned()).increment(1);
        // Note: Precision loss acceptable for metrics (subscriber counts < 2^52)
        #[allow(clippy::cast_precision_loss)]
        gauge!("store_subscribers", "store" => store.to_owned()).set(subscribers as f64);
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn recorder_starts_uninstalled() {
        let recorder = MetricsRecorder::new();
        assert!(recorder.handle().is_none());
        assert!(recorder.render().is_none());
    }

    #[test]
    fn recording_without_a_recorder_is_a_no_op() {
        StoreMetrics::record_dispatch("orphan");
        StoreMetrics::record_handler("orphan", Duration::from_millis(1), false);
        StoreMetrics::record_publish("orphan", 3);
    }

    #[test]
    fn install_and_render() {
        let mut recorder = MetricsRecorder::new();
        recorder.install().unwrap();

        StoreMetrics::record_dispatch("rendered");
        StoreMetrics::record_unknown_action_type("rendered");
        StoreMetrics::record_publish("rendered", 2);

        // If another test already installed the recorder, handle is None.
        // That's OK - metrics are still being recorded.
        if let Some(rendered) = recorder.render() {
            assert!(rendered.contains("store_dispatch_total"));
            assert!(rendered.contains("store_dispatch_unknown_type_total"));
            assert!(rendered.contains("store=\"rendered\""));
        }
    }
}
