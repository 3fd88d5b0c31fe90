//! Dispatcher metrics for observability

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use serde::Serialize;

/// Live counters of one dispatcher.
///
/// Queue and slot gauges are written only by the dispatcher actor.
#[derive(Debug, Default)]
pub struct DispatcherMetrics {
    /// Jobs waiting for a slot
    queue_len: AtomicUsize,
    /// Execution units currently running
    active: AtomicUsize,
    /// Highest `active` ever observed
    peak_active: AtomicUsize,
    /// Total jobs accepted by `submit`
    submitted: AtomicU64,
    /// Total jobs handed to a worker
    dispatched: AtomicU64,
    /// Total jobs settled with a report
    succeeded: AtomicU64,
    /// Total jobs settled with an error
    failed: AtomicU64,
}

impl DispatcherMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_len(&self) -> usize {
        self.queue_len.load(Ordering::Relaxed)
    }

    pub fn set_queue_len(&self, len: usize) {
        self.queue_len.store(len, Ordering::Relaxed);
    }

    pub fn active(&self) -> usize {
        self.active.load(Ordering::Relaxed)
    }

    /// Set active count and raise the high-water mark
    pub fn set_active(&self, active: usize) {
        self.active.store(active, Ordering::Relaxed);
        self.peak_active.fetch_max(active, Ordering::Relaxed);
    }

    pub fn peak_active(&self) -> usize {
        self.peak_active.load(Ordering::Relaxed)
    }

    pub fn inc_submitted(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
    }

    /// Roll back a submission the actor never received
    pub fn dec_submitted(&self) {
        self.submitted.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn inc_dispatched(&self) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_succeeded(&self) {
        self.succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            queue_len: self.queue_len(),
            active: self.active(),
            peak_active: self.peak_active(),
            submitted: self.submitted.load(Ordering::Relaxed),
            dispatched: self.dispatched.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of dispatcher metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub queue_len: usize,
    pub active: usize,
    pub peak_active: usize,
    pub submitted: u64,
    pub dispatched: u64,
    pub succeeded: u64,
    pub failed: u64,
}

impl MetricsSnapshot {
    /// Jobs settled either way
    pub fn settled(&self) -> u64 {
        self.succeeded + self.failed
    }
}
