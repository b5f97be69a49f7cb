//! Prometheus metrics collection for buzzd.
//!
//! Tracks request throughput through the kernel, fan-out behaviour and
//! store size. Exposed over HTTP by [`crate::http`].
//!
//! - `buzzd_request_total{request}` - Kernel requests processed by kind
//! - `buzzd_request_duration_seconds{request}` - Time spent applying a request
//! - `buzzd_request_errors_total{request,error}` - Rejected requests
//! - `buzzd_fanout_recipients` - Clients a single notification was queued for
//! - `buzzd_clients_evicted_total` - Clients evicted for overflowing their queue

use crate::kernel::FanoutReport;
use crate::state::StoreStats;
use prometheus::{
    Encoder, Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts,
    Registry, TextEncoder,
};
use std::sync::OnceLock;

/// Global Prometheus registry for all metrics.
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

pub fn registry() -> &'static Registry {
    REGISTRY.get_or_init(Registry::new)
}

// ========================================================================
// Counters (monotonic increasing)
// ========================================================================

/// Requests processed by kind.
pub static REQUEST_COUNTER: OnceLock<IntCounterVec> = OnceLock::new();

/// Rejected requests by kind and error code.
pub static REQUEST_ERRORS: OnceLock<IntCounterVec> = OnceLock::new();

/// Clients evicted because their notification queue was full.
pub static CLIENTS_EVICTED: OnceLock<IntCounter> = OnceLock::new();

/// Deliveries that failed inside a client callback.
pub static DELIVERY_FAILURES: OnceLock<IntCounterVec> = OnceLock::new();

// ========================================================================
// Gauges (can increase/decrease)
// ========================================================================

/// Registered users.
pub static USERS: OnceLock<IntGauge> = OnceLock::new();

/// Stored messages.
pub static MESSAGES: OnceLock<IntGauge> = OnceLock::new();

/// Logged-in client registrations.
pub static LISTENERS: OnceLock<IntGauge> = OnceLock::new();

/// Open WebSocket connections.
pub static CONNECTED_CLIENTS: OnceLock<IntGauge> = OnceLock::new();

// ========================================================================
// Histograms
// ========================================================================

/// Request processing latency by kind.
pub static REQUEST_LATENCY: OnceLock<HistogramVec> = OnceLock::new();

/// Recipients per fan-out.
pub static FANOUT_RECIPIENTS: OnceLock<Histogram> = OnceLock::new();

/// Initialize the Prometheus metrics registry.
///
/// Call once at startup before any metrics are recorded. Metrics recorded
/// before `init` are silently ignored.
pub fn init() {
    let r = registry();

    macro_rules! register {
        ($metric:ident, $init:expr) => {
            match $init {
                Ok(m) => {
                    if let Err(e) = r.register(Box::new(m.clone())) {
                        tracing::warn!(error = %e, concat!("Failed to register metric ", stringify!($metric)));
                    }
                    let _ = $metric.set(m);
                }
                Err(e) => {
                    tracing::error!(error = %e, concat!("Failed to create metric ", stringify!($metric)));
                }
            }
        };
    }

    register!(REQUEST_COUNTER, IntCounterVec::new(Opts::new("buzzd_request_total", "Kernel requests processed by kind"), &["request"]));
    register!(REQUEST_ERRORS, IntCounterVec::new(Opts::new("buzzd_request_errors_total", "Kernel requests rejected by kind and error"), &["request", "error"]));
    register!(CLIENTS_EVICTED, IntCounter::new("buzzd_clients_evicted_total", "Clients evicted for overflowing their queue"));
    register!(DELIVERY_FAILURES, IntCounterVec::new(Opts::new("buzzd_delivery_failures_total", "Client deliveries that failed"), &["error"]));
    register!(USERS, IntGauge::new("buzzd_users", "Registered users"));
    register!(MESSAGES, IntGauge::new("buzzd_messages", "Stored messages"));
    register!(LISTENERS, IntGauge::new("buzzd_listeners", "Logged-in client registrations"));
    register!(CONNECTED_CLIENTS, IntGauge::new("buzzd_connected_clients", "Open WebSocket connections"));
    register!(REQUEST_LATENCY, HistogramVec::new(
        HistogramOpts::new("buzzd_request_duration_seconds", "Kernel request latency by kind")
            .buckets(vec![0.00001, 0.00005, 0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05]),
        &["request"]));
    register!(FANOUT_RECIPIENTS, Histogram::with_opts(
        HistogramOpts::new("buzzd_fanout_recipients", "Clients a notification was queued for")
            .buckets(vec![0.0, 1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 1000.0])));
}

/// Gather all metrics and encode them in Prometheus text format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = registry().gather();
    let mut buffer = vec![];
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode Prometheus metrics");
        return String::new();
    }
    match String::from_utf8(buffer) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Prometheus metrics were not valid UTF-8");
            String::new()
        }
    }
}

// ============================================================================
// Helper functions for metric updates
// ============================================================================

/// Record a processed request with latency.
#[inline]
pub fn record_request(request: &str, duration_secs: f64) {
    if let Some(c) = REQUEST_COUNTER.get() {
        c.with_label_values(&[request]).inc();
    }
    if let Some(h) = REQUEST_LATENCY.get() {
        h.with_label_values(&[request]).observe(duration_secs);
    }
}

/// Record a rejected request.
#[inline]
pub fn record_request_error(request: &str, error: &str) {
    if let Some(c) = REQUEST_ERRORS.get() {
        c.with_label_values(&[request, error]).inc();
    }
}

/// Record the outcome of one fan-out pass.
#[inline]
pub fn record_fanout(report: &FanoutReport) {
    if let Some(h) = FANOUT_RECIPIENTS.get() {
        h.observe(report.queued as f64);
    }
    if report.evicted > 0
        && let Some(c) = CLIENTS_EVICTED.get()
    {
        c.inc_by(report.evicted as u64);
    }
}

/// Record a failed delivery to a client.
#[inline]
pub fn record_delivery_failure(error: &str) {
    if let Some(c) = DELIVERY_FAILURES.get() {
        c.with_label_values(&[error]).inc();
    }
}

/// Mirror the store size gauges.
#[inline]
pub fn set_store_stats(stats: &StoreStats) {
    if let Some(g) = USERS.get() {
        g.set(stats.users as i64);
    }
    if let Some(g) = MESSAGES.get() {
        g.set(stats.messages as i64);
    }
    if let Some(g) = LISTENERS.get() {
        g.set(stats.listeners as i64);
    }
}

/// Track an opened (`+1`) or closed (`-1`) connection.
#[inline]
pub fn add_connected_clients(delta: i64) {
    if let Some(g) = CONNECTED_CLIENTS.get() {
        g.add(delta);
    }
}
