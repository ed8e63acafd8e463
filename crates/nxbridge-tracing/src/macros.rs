//! Shorthand for [`crate::performance::PerformanceSpan`].

/// Create a performance span. Extra fields are recorded on the span itself,
/// so they wrap its completion event and whatever runs while it is entered.
///
/// ```rust
/// use nxbridge_tracing::perf_span;
///
/// {
///     let _span = perf_span!("invoke", function = "module.main", arguments = 2);
///     // ... blocking work ...
/// }
/// ```
#[macro_export]
macro_rules! perf_span {
    ($name:expr) => {{
        $crate::performance::PerformanceSpan::new($name, None)
    }};
    ($name:expr, $($field:tt = $value:expr),+ $(,)?) => {{
        $crate::performance::PerformanceSpan::with_span(
            tracing::debug_span!("perf", name = %$name, $($field = $value),+),
            None,
        )
    }};
}

/// Like [`perf_span!`] but only logs when the span lasts at least
/// `threshold_us` microseconds.
#[macro_export]
macro_rules! perf_span_threshold {
    ($name:expr, $threshold:expr) => {{
        $crate::performance::PerformanceSpan::new($name, $threshold)
    }};
}
