//! Progress reporting and cooperative cancellation.
//!
//! The pipeline is single-threaded; hosts observe it through a
//! [`ProgressSink`] they pass in, and interrupt it through a [`CancelToken`]
//! checked between files and between resolver phases. The CLI implements the
//! sink with indicatif; tests use [`NoopProgress`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Capability for receiving build progress.
pub trait ProgressSink {
    /// Report a human-readable step plus how many work units it completed.
    fn report(&self, message: &str, increment: u64);
}

/// Sink that discards all progress.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn report(&self, _message: &str, _increment: u64) {}
}

/// Shared cancellation flag. Cloning hands out another view of the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}
