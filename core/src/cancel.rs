//! Cooperative cancellation.
//!
//! One [`CancelFlag`] is shared by a whole batch run: set once, never
//! cleared, safe for concurrent reads. Long-running scans check it at fixed
//! intervals rather than every iteration.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// How many cells/rows a scan walks between cancellation checks.
pub(crate) const CANCEL_CHECK_INTERVAL: usize = 64;

#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> CancelFlag {
        CancelFlag::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}
