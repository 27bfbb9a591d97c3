//! Prometheus metrics for observability and monitoring.
//!
//! Sessions record through the `metrics` facade, so nothing is collected until the
//! host installs a recorder. [`install_recorder`] installs the Prometheus one and
//! describes every metric this crate emits:
//!
//! - `xhr_sessions_started_total`: sessions activated by a first subscriber
//! - `xhr_sessions_completed_total`: sessions that reached their completion event
//! - `xhr_sessions_aborted_total`: sessions cancelled before completion
//! - `xhr_snapshots_emitted_total{source}`: snapshots emitted, by event source
//!
//! # Example
//!
//! ```rust,no_run
//! use reactive_xhr_runtime::metrics::install_recorder;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let handle = install_recorder()?;
//!
//! // ... run sessions ...
//!
//! println!("{}", handle.render());
//! # Ok(())
//! # }
//! ```

use metrics::describe_counter;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use thiserror::Error;

// Re-export metrics macros for use in other modules
pub use metrics::counter;

/// Sessions activated
pub const SESSIONS_STARTED: &str = "xhr_sessions_started_total";
/// Sessions that completed
pub const SESSIONS_COMPLETED: &str = "xhr_sessions_completed_total";
/// Sessions cancelled before completion
pub const SESSIONS_ABORTED: &str = "xhr_sessions_aborted_total";
/// Snapshots emitted
pub const SNAPSHOTS_EMITTED: &str = "xhr_snapshots_emitted_total";

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Install the Prometheus recorder globally and describe all metrics.
///
/// # Errors
///
/// Returns [`MetricsError::Install`] if a recorder is already installed.
pub fn install_recorder() -> Result<PrometheusHandle, MetricsError> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| MetricsError::Install(e.to_string()))?;
    register_metrics();
    tracing::info!("Prometheus metrics recorder installed");
    Ok(handle)
}

/// Register all metric descriptions with the current recorder.
pub fn register_metrics() {
    describe_counter!(
        SESSIONS_STARTED,
        "Total number of sessions activated by a first subscriber"
    );
    describe_counter!(
        SESSIONS_COMPLETED,
        "Total number of sessions that reached their completion event"
    );
    describe_counter!(
        SESSIONS_ABORTED,
        "Total number of sessions cancelled before completion"
    );
    describe_counter!(
        SNAPSHOTS_EMITTED,
        "Total number of snapshots emitted, labelled by event source"
    );
}

/// Which event produced a snapshot.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SnapshotSource {
    /// Upload channel lifecycle event
    Upload,
    /// Download channel lifecycle event
    Download,
    /// Ready-state change
    ReadyState,
    /// Completion event
    Completion,
}

impl SnapshotSource {
    /// Label value for the `source` label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Upload => "upload",
            Self::Download => "download",
            Self::ReadyState => "ready_state",
            Self::Completion => "completion",
        }
    }
}

/// Session metrics recorder.
pub struct SessionMetrics;

impl SessionMetrics {
    /// Record a session activation.
    pub fn record_started() {
        counter!(SESSIONS_STARTED).increment(1);
    }

    /// Record a session completion.
    pub fn record_completed() {
        counter!(SESSIONS_COMPLETED).increment(1);
    }

    /// Record a cancelled session.
    pub fn record_aborted() {
        counter!(SESSIONS_ABORTED).increment(1);
    }

    /// Record an emitted snapshot.
    pub fn record_snapshot(source: SnapshotSource) {
        counter!(SNAPSHOTS_EMITTED, "source" => source.as_str()).increment(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_metrics_render() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            register_metrics();
            SessionMetrics::record_started();
            SessionMetrics::record_snapshot(SnapshotSource::Download);
            SessionMetrics::record_snapshot(SnapshotSource::Completion);
            SessionMetrics::record_completed();
        });

        let rendered = handle.render();
        assert!(rendered.contains(SESSIONS_STARTED));
        assert!(rendered.contains(SESSIONS_COMPLETED));
        assert!(rendered.contains(r#"source="download""#));
        assert!(rendered.contains(r#"source="completion""#));
    }

    #[test]
    fn test_snapshot_source_labels() {
        assert_eq!(SnapshotSource::Upload.as_str(), "upload");
        assert_eq!(SnapshotSource::ReadyState.as_str(), "ready_state");
    }
}
