//! Timing helpers for the blocking steps of the bridge.
//!
//! ```rust
//! use nxbridge_tracing::performance::{record_transfer, PerformanceSpan};
//!
//! let span = PerformanceSpan::new("invoke", Some(100));
//! // ... blocking work ...
//! drop(span); // logs only if it took at least 100μs
//!
//! record_transfer(4096, "D2H", 25);
//! ```

use std::time::Instant;

/// RAII timer that logs its duration on drop, optionally above a threshold.
pub struct PerformanceSpan {
    threshold_us: Option<u64>,
    start_time: Instant,
    span: tracing::Span,
}

impl PerformanceSpan {
    /// Start timing `span_name`. `threshold_us = None` always logs.
    pub fn new(span_name: &str, threshold_us: Option<u64>) -> Self {
        Self {
            threshold_us,
            start_time: Instant::now(),
            span: tracing::debug_span!("perf", name = %span_name),
        }
    }

    /// Time under an already-built span, e.g. one carrying extra fields.
    pub fn with_span(span: tracing::Span, threshold_us: Option<u64>) -> Self {
        Self {
            threshold_us,
            start_time: Instant::now(),
            span,
        }
    }

    /// The span the completion event is logged under.
    pub fn span(&self) -> &tracing::Span {
        &self.span
    }

    /// Microseconds since the span was created.
    pub fn elapsed_us(&self) -> u64 {
        self.start_time.elapsed().as_micros() as u64
    }

    /// Enter the span so nested events are attributed to it.
    pub fn enter(&self) -> tracing::span::Entered<'_> {
        self.span.enter()
    }
}

impl Drop for PerformanceSpan {
    fn drop(&mut self) {
        let elapsed_us = self.elapsed_us();
        if self.threshold_us.is_none_or(|t| elapsed_us >= t) {
            let _entered = self.span.enter();
            tracing::debug!(
                duration_us = elapsed_us,
                duration_ms = elapsed_us as f64 / 1000.0,
                "performance_span_complete"
            );
        }
    }
}

/// Record a host/device transfer with its effective bandwidth.
///
/// `direction` is `"H2D"` or `"D2H"`.
pub fn record_transfer(bytes: usize, direction: &str, duration_us: u64) {
    let bandwidth_mbps = if duration_us > 0 {
        (bytes as f64 / duration_us as f64) * 1_000_000.0 / (1024.0 * 1024.0)
    } else {
        0.0
    };

    tracing::debug!(
        event = "transfer",
        bytes = bytes,
        direction = direction,
        duration_us = duration_us,
        bandwidth_mbps = bandwidth_mbps,
        "data_transfer"
    );
}

/// Record one synchronous invocation of a VM function.
pub fn record_invocation(function: &str, arguments: usize, results: usize, duration_us: u64) {
    tracing::debug!(
        event = "invocation",
        function = function,
        arguments = arguments,
        results = results,
        duration_us = duration_us,
        duration_ms = duration_us as f64 / 1000.0,
        "vm_invocation"
    );
}
