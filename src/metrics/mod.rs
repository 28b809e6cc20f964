// Metrics module - Prometheus metrics for URL minting and delivery
//
// Provides:
// - Dispatch outcome counters by status code
// - Rejection counters by reason (missing param, bad signature, expired, ...)
// - Generation duration histogram and failure counters
// - Coalesced generation waits
// - Issued URL counters (restricted vs public)

use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, Encoder, Histogram,
    IntCounter, IntCounterVec, TextEncoder,
};
use std::sync::OnceLock;

/// Global metrics registry for the delivery layer
pub struct DeliveryMetrics {
    /// Dispatches by final HTTP status
    pub dispatch_outcomes: IntCounterVec,

    /// Rejected dispatches by reason
    pub rejections: IntCounterVec,

    /// Generator run duration (in seconds)
    pub generation_duration: Histogram,

    /// Generator failures by kind (spawn, exit, timeout)
    pub generation_failures: IntCounterVec,

    /// Requests that waited on another request's generation
    pub coalesced_waits: IntCounter,

    /// URLs minted, by access type
    pub urls_issued: IntCounterVec,

    /// Cache files removed by invalidation
    pub invalidated_files: IntCounter,
}

/// Global singleton instance of metrics
static METRICS: OnceLock<DeliveryMetrics> = OnceLock::new();

impl DeliveryMetrics {
    /// Initialize and return the global metrics instance
    ///
    /// Subsequent calls return the same instance.
    pub fn global() -> &'static Self {
        METRICS.get_or_init(|| {
            let dispatch_outcomes = register_int_counter_vec!(
                "kagami_dispatch_total",
                "Total number of dispatched delivery requests by status",
                &["status"] // 200, 403, 404, 412
            )
            .expect("Failed to register dispatch_total metric");

            let rejections = register_int_counter_vec!(
                "kagami_dispatch_rejections_total",
                "Total number of rejected delivery requests by reason",
                &["reason"]
            )
            .expect("Failed to register dispatch_rejections_total metric");

            let generation_duration = register_histogram!(
                "kagami_generation_duration_seconds",
                "Duration of variant generation in seconds",
                vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0] // 10ms to 30s
            )
            .expect("Failed to register generation_duration_seconds metric");

            let generation_failures = register_int_counter_vec!(
                "kagami_generation_failures_total",
                "Total number of failed variant generations by kind",
                &["kind"]
            )
            .expect("Failed to register generation_failures_total metric");

            let coalesced_waits = register_int_counter!(
                "kagami_generation_coalesced_total",
                "Total number of requests that waited for an in-flight generation"
            )
            .expect("Failed to register generation_coalesced_total metric");

            let urls_issued = register_int_counter_vec!(
                "kagami_urls_issued_total",
                "Total number of URLs built by access type",
                &["access"] // restricted, public
            )
            .expect("Failed to register urls_issued_total metric");

            let invalidated_files = register_int_counter!(
                "kagami_cache_invalidated_files_total",
                "Total number of cache files removed by invalidation"
            )
            .expect("Failed to register cache_invalidated_files_total metric");

            DeliveryMetrics {
                dispatch_outcomes,
                rejections,
                generation_duration,
                generation_failures,
                coalesced_waits,
                urls_issued,
                invalidated_files,
            }
        })
    }

    pub fn record_dispatch(&self, status: u16) {
        self.dispatch_outcomes
            .with_label_values(&[&status.to_string()])
            .inc();
    }

    pub fn record_rejection(&self, reason: &str) {
        self.rejections.with_label_values(&[reason]).inc();
    }

    pub fn record_url(&self, restricted: bool) {
        let access = if restricted { "restricted" } else { "public" };
        self.urls_issued.with_label_values(&[access]).inc();
    }

    pub fn record_generation_failure(&self, kind: &str) {
        self.generation_failures.with_label_values(&[kind]).inc();
    }

    /// Export all registered metrics in the Prometheus text format
    pub fn render() -> String {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
            tracing::warn!(error = %e, "Failed to encode metrics");
            return String::new();
        }
        String::from_utf8_lossy(&buffer).into_owned()
    }
}
