//! Global atomic counters for pipeline observability.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single
//! `tracing::info!` event (e.g. at the end of a push).

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

/// Lightweight atomic counters; no allocations, no locking.
pub struct Metrics {
    runs_started: AtomicU64,
    runs_rejected: AtomicU64,
    validators_executed: AtomicU64,
    listeners_failed: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            runs_started: AtomicU64::new(0),
            runs_rejected: AtomicU64::new(0),
            validators_executed: AtomicU64::new(0),
            listeners_failed: AtomicU64::new(0),
        }
    }

    pub fn inc_runs_started(&self) {
        self.runs_started.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "runs_started", "counter incremented");
    }

    pub fn inc_runs_rejected(&self) {
        self.runs_rejected.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "runs_rejected", "counter incremented");
    }

    pub fn inc_validators_executed(&self) {
        self.validators_executed.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "validators_executed", "counter incremented");
    }

    pub fn inc_listeners_failed(&self) {
        self.listeners_failed.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "listeners_failed", "counter incremented");
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            runs_started = self.runs_started(),
            runs_rejected = self.runs_rejected(),
            validators_executed = self.validators_executed(),
            listeners_failed = self.listeners_failed(),
        );
    }

    pub fn runs_started(&self) -> u64 {
        self.runs_started.load(Ordering::Relaxed)
    }

    pub fn runs_rejected(&self) -> u64 {
        self.runs_rejected.load(Ordering::Relaxed)
    }

    pub fn validators_executed(&self) -> u64 {
        self.validators_executed.load(Ordering::Relaxed)
    }

    pub fn listeners_failed(&self) -> u64 {
        self.listeners_failed.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        self.runs_started.store(0, Ordering::Relaxed);
        self.runs_rejected.store(0, Ordering::Relaxed);
        self.validators_executed.store(0, Ordering::Relaxed);
        self.listeners_failed.store(0, Ordering::Relaxed);
    }
}
