//! User-facing run messages.

use std::sync::Arc;

/// Tracing target for run events.
const RUN_TARGET: &str = "winhome_engine::run";

/// Leveled sink for the messages a run produces.
pub trait Reporter: Send + Sync {
    /// Progress information.
    fn info(&self, message: &str);

    /// A step completed successfully.
    fn success(&self, message: &str);

    /// A tolerable problem.
    fn warning(&self, message: &str);

    /// An item-level or fatal failure.
    fn error(&self, message: &str);
}

impl<T> Reporter for Arc<T>
where
    T: Reporter + ?Sized,
{
    fn info(&self, message: &str) {
        (**self).info(message);
    }

    fn success(&self, message: &str) {
        (**self).success(message);
    }

    fn warning(&self, message: &str) {
        (**self).warning(message);
    }

    fn error(&self, message: &str) {
        (**self).error(message);
    }
}

/// Reporter that emits `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn info(&self, message: &str) {
        tracing::info!(target: RUN_TARGET, "{message}");
    }

    fn success(&self, message: &str) {
        tracing::info!(target: RUN_TARGET, outcome = "success", "{message}");
    }

    fn warning(&self, message: &str) {
        tracing::warn!(target: RUN_TARGET, "{message}");
    }

    fn error(&self, message: &str) {
        tracing::error!(target: RUN_TARGET, "{message}");
    }
}
