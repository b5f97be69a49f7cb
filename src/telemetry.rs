//! Telemetry utilities for request timing and span naming.

use std::time::Instant;

/// Guard for timing request handling and recording metrics.
///
/// Records request latency when dropped.
pub struct RequestTimer {
    request: &'static str,
    start: Instant,
}

impl RequestTimer {
    /// Start timing a request.
    pub fn new(request: &'static str) -> Self {
        Self {
            request,
            start: Instant::now(),
        }
    }
}

impl Drop for RequestTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        crate::metrics::record_request(self.request, duration);
    }
}

/// Standardized span constructors.
pub mod spans {
    use tracing::{Span, debug_span, info_span};

    /// Create a span for a client connection.
    pub fn connection(client: &str, addr: &str) -> Span {
        info_span!("connection", client = %client, addr = %addr)
    }

    /// Create a span for a kernel request.
    pub fn request(kind: &'static str) -> Span {
        debug_span!("request", kind = kind)
    }

    /// Create a span for a simulated actor.
    pub fn actor(name: &str) -> Span {
        info_span!("actor", name = %name)
    }
}
