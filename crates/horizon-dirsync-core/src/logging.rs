//! Logging facilities for Horizon DirSync.
//!
//! Horizon DirSync uses the `tracing` crate for instrumentation. The
//! libraries never install a subscriber; applications do:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("horizon_dirsync=debug")
//!     .init();
//! ```

/// Span names used for tracing.
pub mod span_names {
    /// Event loop turn.
    pub const EVENT_LOOP: &str = "horizon_dirsync::event_loop";
    /// Full reconcile pass.
    pub const RECONCILE: &str = "horizon_dirsync::reconcile";
    /// Periodic consistency sweep.
    pub const SWEEP: &str = "horizon_dirsync::sweep";
}

/// Target names for log filtering.
pub mod targets {
    /// Event loop target.
    pub const EVENT_LOOP: &str = "horizon_dirsync_core::event_loop";
    /// Scheduler target.
    pub const SCHEDULER: &str = "horizon_dirsync_core::scheduler";
    /// Deferred task queue target.
    pub const TASK: &str = "horizon_dirsync_core::task";
    /// Signal target.
    pub const SIGNAL: &str = "horizon_dirsync_core::signal";
    /// Reconcile and applier target.
    pub const RECONCILE: &str = "horizon_dirsync::reconcile";
    /// Language attribute observer target.
    pub const OBSERVER: &str = "horizon_dirsync::observer";
    /// Consistency sweep target.
    pub const SWEEP: &str = "horizon_dirsync::sweep";
    /// Third-party widget watch target.
    pub const WIDGET: &str = "horizon_dirsync::widget";
    /// Manual language switcher target.
    pub const SWITCHER: &str = "horizon_dirsync::switcher";
    /// Translation hook target.
    pub const TRANSLATION: &str = "horizon_dirsync::translation";
    /// Document model target.
    pub const DOCUMENT: &str = "horizon_dirsync::document";
    /// Controller lifecycle target.
    pub const CONTROLLER: &str = "horizon_dirsync::controller";
}

/// A guard that keeps a tracing span entered until dropped.
///
/// Useful for timing an operation in a profiler or in `tracing` output.
#[derive(Debug)]
pub struct PerfSpan {
    _span: tracing::span::EnteredSpan,
}

impl PerfSpan {
    /// Enter a new performance span named `name`.
    pub fn new(name: &'static str) -> Self {
        let span = tracing::debug_span!(target: "horizon_dirsync::perf", "perf", operation = name);
        Self {
            _span: span.entered(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perf_span() {
        // No subscriber installed; entering and dropping must still be fine.
        let _span = PerfSpan::new(span_names::RECONCILE);
    }
}
