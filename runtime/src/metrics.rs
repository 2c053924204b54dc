//! Prometheus metrics for observability and monitoring.
//!
//! The Store records counters and histograms through the `metrics` facade on
//! every action and effect. Installing a [`MetricsExporter`] routes them to a
//! Prometheus recorder whose text exposition can be rendered on demand.
//!
//! # Example
//!
//! ```rust,no_run
//! use classbook_runtime::metrics::MetricsExporter;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let exporter = MetricsExporter::install()?;
//! // ... run the workflow ...
//! if let Some(text) = exporter.render() {
//!     println!("{text}");
//! }
//! # Ok(())
//! # }
//! ```

use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use thiserror::Error;

// Re-export metrics macros for use in other crates
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

/// Prometheus recorder installed as the global metrics sink.
#[derive(Default)]
pub struct MetricsExporter {
    handle: Option<PrometheusHandle>,
}

impl MetricsExporter {
    /// Describe the store metrics and install the Prometheus recorder.
    ///
    /// If a recorder is already installed (for example by another test in the
    /// same process) the exporter is returned without a handle and
    /// [`MetricsExporter::render`] yields `None`.
    ///
    /// # Errors
    ///
    /// Returns error if the exporter cannot be built or installed.
    pub fn install() -> Result<Self, MetricsError> {
        let builder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?;

        match builder.install_recorder() {
            Ok(handle) => {
                describe_store_metrics();
                tracing::info!("Prometheus metrics recorder installed");
                Ok(Self {
                    handle: Some(handle),
                })
            },
            Err(e) => {
                let err_msg = e.to_string();
                if err_msg.contains("already") {
                    tracing::warn!("Metrics recorder already initialized, skipping re-initialization");
                    Ok(Self { handle: None })
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

/// Register descriptions for the metrics the Store records.
pub fn describe_store_metrics() {
    describe_counter!("store.commands.total", "Total number of actions sent to stores");
    describe_histogram!(
        "store.reducer.duration_seconds",
        "Time spent inside reducers per action"
    );
    describe_histogram!("store.effects.count", "Number of effects returned per action");
    describe_counter!("store.effects.executed", "Effects executed, labelled by type");
    describe_counter!(
        "store.effects.cancelled",
        "In-flight effect tasks aborted by cancellation id"
    );
    describe_counter!("store.shutdown.initiated", "Graceful shutdowns started");
    describe_counter!("store.shutdown.completed", "Graceful shutdowns that drained in time");
    describe_counter!("store.shutdown.timeout", "Graceful shutdowns that timed out");
    describe_counter!(
        "store.shutdown.rejected_actions",
        "Actions rejected because the store was shutting down"
    );
}
