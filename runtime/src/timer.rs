//! Deferred failure - a cancelable one-shot timer.
//!
//! Under the delayed failure policy the unmatched trace is held back for a
//! grace window before it is reported. Dropping the handle does not cancel
//! the timer; only [`DeferredFailure::cancel`] does.

use crate::signal::Resolver;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracewalk_core::UnmatchedTrace;

#[derive(Debug)]
pub struct DeferredFailure {
    handle: JoinHandle<()>,
    window: Duration,
}

impl DeferredFailure {
    /// Spawn the timer on `runtime`.
    pub fn arm(
        runtime: &Handle,
        window: Duration,
        resolver: Resolver,
        unmatched: UnmatchedTrace,
    ) -> Self {
        let handle = runtime.spawn(async move {
            tokio::time::sleep(window).await;
            tracing::warn!(
                trace = %unmatched.trace,
                window_ms = window.as_millis() as u64,
                "Grace window elapsed; reporting unmatched trace"
            );
            resolver.fail(unmatched);
        });
        Self { handle, window }
    }

    /// Cancel the timer. Returns `false` if it already fired.
    ///
    /// A cancelled timer drops its resolver, so the completion resolves as
    /// abandoned.
    pub fn cancel(&mut self) -> bool {
        if self.handle.is_finished() {
            return false;
        }
        self.handle.abort();
        true
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}
