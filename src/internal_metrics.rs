//! # Internal Metrics Module
//!
//! Counters and histograms describing notification invocations, recorded
//! through the `metrics` facade. When enabled, a Prometheus recorder is
//! installed globally and its handle is rendered at `GET /metrics`.
//!
//! When disabled no recorder is installed and every update is a no-op.

use crate::config::MetricsConfig;
use metrics::{Counter, Histogram, Unit};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use tracing::error;

/// The public API for the metrics system.
///
/// This struct holds cloneable handles to the metrics collectors.
#[derive(Clone)]
pub struct Metrics {
    pub events_received_total: Counter,
    pub recipients_resolved: Histogram,
    pub dispatch_duration_seconds: Histogram,
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics").finish_non_exhaustive()
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    /// Creates a new `Metrics` instance and registers descriptions for all
    /// supported metrics with the global recorder.
    pub fn new() -> Self {
        metrics::describe_counter!("events_received_total", Unit::Count, "Total number of inbound event payloads received.");
        metrics::describe_counter!("notifications_total", Unit::Count, "Total number of completed invocations, labeled by outcome.");
        metrics::describe_counter!("notification_errors_total", Unit::Count, "Total number of failed invocations, labeled by error kind.");
        metrics::describe_histogram!("recipients_resolved", Unit::Count, "Number of usable recipient addresses resolved per invocation.");
        metrics::describe_histogram!("dispatch_duration_seconds", Unit::Seconds, "Time spent submitting the alert to the delivery provider.");

        Self {
            events_received_total: metrics::counter!("events_received_total"),
            recipients_resolved: metrics::histogram!("recipients_resolved"),
            dispatch_duration_seconds: metrics::histogram!("dispatch_duration_seconds"),
        }
    }

    /// Increments the counter for a terminal outcome ("delivered", "no_recipients", "failed").
    pub fn increment_outcome(&self, outcome: &'static str) {
        metrics::counter!("notifications_total", "outcome" => outcome).increment(1);
    }

    /// Increments the counter for a specific error kind.
    pub fn increment_error(&self, kind: &'static str) {
        metrics::counter!("notification_errors_total", "kind" => kind).increment(1);
    }
}

/// Builder for the metrics system.
///
/// Installs the Prometheus recorder when enabled and hands back the handle
/// used to render the scrape endpoint.
pub struct MetricsBuilder {
    config: MetricsConfig,
}

impl MetricsBuilder {
    pub fn new(config: MetricsConfig) -> Self {
        Self { config }
    }

    /// Returns the `Metrics` handle and, when enabled and installed, the
    /// Prometheus handle. Installation failures are logged and degrade to
    /// running without an exporter.
    pub fn build(self) -> (Metrics, Option<PrometheusHandle>) {
        if !self.config.enabled {
            return (Metrics::new(), None);
        }

        let builder = match PrometheusBuilder::new().set_buckets_for_metric(
            Matcher::Suffix("duration_seconds".to_string()),
            &[0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0],
        ) {
            Ok(builder) => builder,
            Err(e) => {
                error!("Failed to configure Prometheus buckets: {}", e);
                return (Metrics::new(), None);
            }
        };

        let recorder = builder.build_recorder();
        let handle = recorder.handle();
        if let Err(e) = metrics::set_global_recorder(recorder) {
            error!("Failed to install Prometheus recorder: {}", e);
            return (Metrics::new(), None);
        }

        (Metrics::new(), Some(handle))
    }
}
