//! A minimal scoped-thread background dispatcher with cooperative
//! cancellation (§11).
//!
//! An embedder with its own task system is expected to call
//! [`crate::controller::Controller::update`] directly from its own
//! scheduler instead of reaching for this type.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

/// A shared cancellation flag, checked at every upstream fetch and at every
/// `TraversalTask` entry.
#[derive(Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    #[must_use]
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Returns `Err(Error::Cancelled)` if this token has been cancelled,
    /// else `Ok(())`. Callers pepper this at upstream fetch points.
    pub fn check(&self) -> crate::error::Result<()> {
        if self.is_cancelled() {
            Err(crate::error::Error::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// One in-flight background pass: one OS thread, one cancellation token.
pub struct BackgroundTask {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl BackgroundTask {
    /// Spawns `f` on a new thread, handing it a fresh [`CancellationToken`].
    pub fn spawn<F>(f: F) -> Self
    where
        F: FnOnce(CancellationToken) + Send + 'static,
    {
        let token = CancellationToken::new();
        let thread_token = token.clone();
        let handle = std::thread::spawn(move || f(thread_token));
        Self { token, handle }
    }

    #[must_use]
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Sets the cancellation flag, then blocks until the thread unwinds.
    /// This is what `Controller`'s setters call before mutating state shared
    /// with an in-flight pass (§5).
    pub fn cancel_and_join(self) {
        self.token.cancel();
        // A panicking background thread must not poison the control thread;
        // the pass already reports its own failures through the progress
        // callback before unwinding.
        let _ = self.handle.join();
    }

    /// Blocks until the thread finishes on its own, without requesting
    /// cancellation.
    pub fn join(self) {
        let _ = self.handle.join();
    }
}
