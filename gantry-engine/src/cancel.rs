//! Cancellation handle for in-flight evaluations

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cancellation handle shared between a caller and one `evaluate` call.
///
/// Cloning yields handles to the same underlying flag. The sandbox watchdog
/// polls the flag between instruction batches, so cancellation takes effect
/// within one hook interval.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Idempotent.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    pub(crate) fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }
}
