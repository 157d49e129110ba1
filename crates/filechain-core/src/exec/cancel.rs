use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative cancellation signal shared between a caller and an executor.
///
/// Once raised it stays raised until `reset`. The executor stops
/// dispatching new user function invocations; invocations already running
/// finish and their output is discarded.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Lower the signal so later materializations can run again.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}
