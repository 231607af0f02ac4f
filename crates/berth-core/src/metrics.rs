//! Global atomic counters for berth observability.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single
//! `tracing::info!` event (e.g. after an orchestration finishes).

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

/// Lightweight atomic counters — no allocations, no locking.
pub struct Metrics {
    deploys_started: AtomicU64,
    attempts_executed: AtomicU64,
    repairs_requested: AtomicU64,
    deploys_succeeded: AtomicU64,
    deploys_exhausted: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            deploys_started: AtomicU64::new(0),
            attempts_executed: AtomicU64::new(0),
            repairs_requested: AtomicU64::new(0),
            deploys_succeeded: AtomicU64::new(0),
            deploys_exhausted: AtomicU64::new(0),
        }
    }

    pub fn inc_deploys_started(&self) {
        self.deploys_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_attempts_executed(&self) {
        self.attempts_executed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_repairs_requested(&self) {
        self.repairs_requested.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_deploys_succeeded(&self) {
        self.deploys_succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_deploys_exhausted(&self) {
        self.deploys_exhausted.fetch_add(1, Ordering::Relaxed);
    }

    /// Emit all current counter values as a single `info!` event.
    ///
    /// Call this at natural boundaries (end of a CLI invocation, daemon
    /// tick) rather than on every increment.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            deploys_started = self.deploys_started(),
            attempts_executed = self.attempts_executed(),
            repairs_requested = self.repairs_requested(),
            deploys_succeeded = self.deploys_succeeded(),
            deploys_exhausted = self.deploys_exhausted(),
        );
    }

    pub fn deploys_started(&self) -> u64 {
        self.deploys_started.load(Ordering::Relaxed)
    }

    pub fn attempts_executed(&self) -> u64 {
        self.attempts_executed.load(Ordering::Relaxed)
    }

    pub fn repairs_requested(&self) -> u64 {
        self.repairs_requested.load(Ordering::Relaxed)
    }

    pub fn deploys_succeeded(&self) -> u64 {
        self.deploys_succeeded.load(Ordering::Relaxed)
    }

    pub fn deploys_exhausted(&self) -> u64 {
        self.deploys_exhausted.load(Ordering::Relaxed)
    }
}
