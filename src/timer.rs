//! Cancellable delayed task.
//!
//! [`DelayedTask`] runs a closure on its own thread after a fixed delay
//! unless cancelled first. Dropping the handle also cancels, so the usual
//! cancel-then-replace pattern is a plain slot assignment: storing a fresh
//! task in an `Option<DelayedTask>` drops (and thereby cancels) the pending
//! one, and two live timers for the same purpose cannot overlap.

use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, RecvTimeoutError, Sender};

/// One-shot timer handle. The closure fires after `delay` unless the handle
/// is cancelled or dropped first.
pub struct DelayedTask {
    cancel: Sender<()>,
}

impl DelayedTask {
    pub fn schedule<F>(delay: Duration, task: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let (cancel, cancelled) = bounded::<()>(1);
        thread::spawn(move || {
            // Timeout means the delay elapsed uncancelled; a message or a
            // disconnect (handle dropped) means cancel.
            if matches!(cancelled.recv_timeout(delay), Err(RecvTimeoutError::Timeout)) {
                task();
            }
        });
        Self { cancel }
    }

    /// Cancels the task if it has not fired yet. Idempotent.
    pub fn cancel(&self) {
        let _ = self.cancel.try_send(());
    }
}
