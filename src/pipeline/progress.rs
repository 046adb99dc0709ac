//! Lock-free run counters shared with the progress display.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Live counters for the current run.
///
/// Updated by the orchestrator, polled by the CLI spinner.
#[derive(Debug, Default)]
pub struct RunProgress {
    total: AtomicUsize,
    current: AtomicUsize,
    exported: AtomicUsize,
    degraded: AtomicUsize,
    skipped: AtomicUsize,
    failed: AtomicUsize,
}

impl RunProgress {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of discovered items; zero until discovery finishes.
    #[must_use]
    pub fn total(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }

    /// Rank of the item being processed.
    #[must_use]
    pub fn current(&self) -> usize {
        self.current.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn exported(&self) -> usize {
        self.exported.load(Ordering::SeqCst)
    }

    /// Exported through a fallback strategy or font. Included in `exported`.
    #[must_use]
    pub fn degraded(&self) -> usize {
        self.degraded.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn skipped(&self) -> usize {
        self.skipped.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::SeqCst)
    }

    /// Items with a final outcome.
    #[must_use]
    pub fn finished(&self) -> usize {
        self.exported() + self.skipped() + self.failed()
    }

    pub(crate) fn set_total(&self, total: usize) {
        self.total.store(total, Ordering::SeqCst);
    }

    pub(crate) fn start_item(&self, rank: usize) {
        self.current.store(rank, Ordering::SeqCst);
    }

    pub(crate) fn record_exported(&self, degraded: bool) {
        self.exported.fetch_add(1, Ordering::SeqCst);
        if degraded {
            self.degraded.fetch_add(1, Ordering::SeqCst);
        }
    }

    pub(crate) fn record_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::SeqCst);
    }
}
