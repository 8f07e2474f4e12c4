use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Non-reentrant guard for periodic sweeps. A tick that finds the previous
/// run still in progress gets `None` and skips.
#[derive(Clone, Default)]
pub struct SweepGuard {
    running: Arc<AtomicBool>,
}

/// Held for the duration of one sweep; clears the flag on drop, including
/// when the sweep future panics or is dropped early.
pub struct SweepPermit {
    running: Arc<AtomicBool>,
}

impl SweepGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_acquire(&self) -> Option<SweepPermit> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| SweepPermit {
                running: self.running.clone(),
            })
    }
}

impl Drop for SweepPermit {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
    }
}
