//! Cooperative run cancellation
//!
//! Cancellation is checked between nodes, never inside a node's own I/O
//! wait: a node's timeout bounds its worst-case latency, and the signal
//! takes effect at the next node boundary.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Caller-held handle for cancelling a run between nodes
#[derive(Debug, Clone, Default)]
pub struct CancelSignal {
    cancelled: Arc<AtomicBool>,
}

impl CancelSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; takes effect at the next node boundary
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}
