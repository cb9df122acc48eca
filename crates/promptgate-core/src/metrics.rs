//! Global atomic counters for promptgate.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single
//! `tracing::info!` event (e.g. at the end of an evaluation).

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

/// Lightweight atomic counters, no allocations, no locking.
pub struct Metrics {
    samples_scored: AtomicU64,
    sample_errors: AtomicU64,
    evaluations_run: AtomicU64,
    drafts_generated: AtomicU64,
    reports_published: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            samples_scored: AtomicU64::new(0),
            sample_errors: AtomicU64::new(0),
            evaluations_run: AtomicU64::new(0),
            drafts_generated: AtomicU64::new(0),
            reports_published: AtomicU64::new(0),
        }
    }

    pub fn inc_samples_scored(&self) {
        self.samples_scored.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "samples_scored", "counter incremented");
    }

    pub fn inc_sample_errors(&self) {
        self.sample_errors.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "sample_errors", "counter incremented");
    }

    pub fn inc_evaluations(&self) {
        self.evaluations_run.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "evaluations_run", "counter incremented");
    }

    pub fn inc_drafts_generated(&self) {
        self.drafts_generated.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "drafts_generated", "counter incremented");
    }

    pub fn inc_reports_published(&self) {
        self.reports_published.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "reports_published", "counter incremented");
    }

    /// Emit all current counter values as a single `info!` event.
    ///
    /// Call this at natural boundaries (end of an evaluation, daemon tick)
    /// rather than on every increment.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            samples_scored = self.samples_scored(),
            sample_errors = self.sample_errors(),
            evaluations_run = self.evaluations_run(),
            drafts_generated = self.drafts_generated(),
            reports_published = self.reports_published(),
        );
    }

    pub fn samples_scored(&self) -> u64 {
        self.samples_scored.load(Ordering::Relaxed)
    }

    pub fn sample_errors(&self) -> u64 {
        self.sample_errors.load(Ordering::Relaxed)
    }

    pub fn evaluations_run(&self) -> u64 {
        self.evaluations_run.load(Ordering::Relaxed)
    }

    pub fn drafts_generated(&self) -> u64 {
        self.drafts_generated.load(Ordering::Relaxed)
    }

    pub fn reports_published(&self) -> u64 {
        self.reports_published.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        self.samples_scored.store(0, Ordering::Relaxed);
        self.sample_errors.store(0, Ordering::Relaxed);
        self.evaluations_run.store(0, Ordering::Relaxed);
        self.drafts_generated.store(0, Ordering::Relaxed);
        self.reports_published.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_increment() {
        let m = Metrics::new();
        m.inc_samples_scored();
        m.inc_samples_scored();
        m.inc_sample_errors();
        m.inc_evaluations();
        m.inc_drafts_generated();
        m.inc_drafts_generated();
        m.inc_drafts_generated();
        m.inc_reports_published();

        assert_eq!(m.samples_scored(), 2);
        assert_eq!(m.sample_errors(), 1);
        assert_eq!(m.evaluations_run(), 1);
        assert_eq!(m.drafts_generated(), 3);
        assert_eq!(m.reports_published(), 1);
    }

    #[test]
    fn reset_zeroes_all() {
        let m = Metrics::new();
        m.inc_samples_scored();
        m.inc_evaluations();
        m.inc_reports_published();
        m.reset();
        assert_eq!(m.samples_scored(), 0);
        assert_eq!(m.evaluations_run(), 0);
        assert_eq!(m.reports_published(), 0);
    }
}
