//! Cooperative cancellation (component H): a plain atomic flag the caller
//! can hold onto and set from any thread, in place of a callback whose
//! return value workers would otherwise have to poll.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A cheaply cloneable, thread-safe cancellation flag.
///
/// `cancel()` is non-blocking. Workers observe it at task boundaries and
/// between the input reads and the write step, never mid-write.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        CancelToken(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
