//! Prometheus metrics for rift-line.
//!
//! Tracks dispatch outcomes, applied response delays, script evaluation and
//! lifecycle transitions.
use lazy_static::lazy_static;
use prometheus::{
    register_counter, register_counter_vec, register_histogram, register_histogram_vec, Counter,
    CounterVec, Encoder, Histogram, HistogramVec, TextEncoder,
};
use tracing::warn;

lazy_static! {
    /// Total number of requests dispatched
    pub static ref REQUESTS_TOTAL: CounterVec = register_counter_vec!(
        "rift_line_requests_total",
        "Total number of requests dispatched by the stub engine",
        &["outcome"]  // matched|not_found|no_scenario|no_testcase|failed
    )
    .unwrap();

    /// Render/script/write failures swallowed during dispatch
    pub static ref RENDER_FAILURES_TOTAL: Counter = register_counter!(
        "rift_line_render_failures_total",
        "Total number of requests whose response could not be produced"
    )
    .unwrap();

    /// Configured response delay actually applied
    pub static ref RESPONSE_DELAY_MS: Histogram = register_histogram!(
        "rift_line_response_delay_ms",
        "Histogram of applied response delays in milliseconds",
        vec![10.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0]
    )
    .unwrap();

    /// Script evaluation duration
    pub static ref SCRIPT_EVALUATION_DURATION_MS: HistogramVec = register_histogram_vec!(
        "rift_line_script_evaluation_duration_ms",
        "Histogram of script evaluation time in milliseconds",
        &["result"],  // success|error
        vec![0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 25.0, 50.0, 100.0]
    )
    .unwrap();

    /// Scenario and test case transitions
    pub static ref LIFECYCLE_EVENTS_TOTAL: CounterVec = register_counter_vec!(
        "rift_line_lifecycle_events_total",
        "Total number of scenario and test case lifecycle events",
        &["event"]
    )
    .unwrap();
}

/// Collect and return all metrics in Prometheus text format
pub fn collect_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        warn!("Failed to encode metrics: {}", e);
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Helper to record a dispatch outcome
pub fn record_request(outcome: &str) {
    REQUESTS_TOTAL.with_label_values(&[outcome]).inc();
}

pub fn record_render_failure() {
    RENDER_FAILURES_TOTAL.inc();
}

/// Helper to record an applied response delay
pub fn record_response_delay(duration_ms: u64) {
    RESPONSE_DELAY_MS.observe(duration_ms as f64);
}

/// Helper to record script evaluation
pub fn record_script_evaluation(duration_ms: f64, result: &str) {
    SCRIPT_EVALUATION_DURATION_MS
        .with_label_values(&[result])
        .observe(duration_ms);
}

pub fn record_lifecycle_event(event: &str) {
    LIFECYCLE_EVENTS_TOTAL.with_label_values(&[event]).inc();
}
