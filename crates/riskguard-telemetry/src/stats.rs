//! Process-wide enforcement statistics.
//!
//! Plain atomic counters, summarized periodically (and once at shutdown)
//! through the log. Counters only ever increase for the process lifetime.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use tracing::info;

/// Counters for one daemon run.
#[derive(Debug)]
pub struct EnforcementStats {
    started_at: DateTime<Utc>,
    ticks: AtomicU64,
    skipped_ticks: AtomicU64,
    closes_accepted: AtomicU64,
    closes_failed: AtomicU64,
    switch_arms: AtomicU64,
    reenables: AtomicU64,
    news_batches: AtomicU64,
}

impl EnforcementStats {
    /// Create a zeroed counter set stamped with the start time.
    #[must_use]
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            ticks: AtomicU64::new(0),
            skipped_ticks: AtomicU64::new(0),
            closes_accepted: AtomicU64::new(0),
            closes_failed: AtomicU64::new(0),
            switch_arms: AtomicU64::new(0),
            reenables: AtomicU64::new(0),
            news_batches: AtomicU64::new(0),
        }
    }

    /// A tick ran to completion.
    pub fn record_tick(&self) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
    }

    /// A tick was skipped (engine unreachable or mid-tick error).
    pub fn record_skipped_tick(&self) {
        self.skipped_ticks.fetch_add(1, Ordering::Relaxed);
    }

    /// Close attempts from one report.
    pub fn record_closes(&self, accepted: u64, failed: u64) {
        self.closes_accepted.fetch_add(accepted, Ordering::Relaxed);
        self.closes_failed.fetch_add(failed, Ordering::Relaxed);
    }

    /// The kill switch was armed.
    pub fn record_switch_arm(&self) {
        self.switch_arms.fetch_add(1, Ordering::Relaxed);
    }

    /// Automated trading was re-enabled after an expiry.
    pub fn record_reenable(&self) {
        self.reenables.fetch_add(1, Ordering::Relaxed);
    }

    /// An event-window batch affected at least one position.
    pub fn record_news_batch(&self) {
        self.news_batches.fetch_add(1, Ordering::Relaxed);
    }

    /// Ticks run so far.
    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    /// Emit the summary line.
    pub fn output_summary(&self) {
        info!(
            started_at = %self.started_at,
            ticks = self.ticks.load(Ordering::Relaxed),
            skipped_ticks = self.skipped_ticks.load(Ordering::Relaxed),
            closes_accepted = self.closes_accepted.load(Ordering::Relaxed),
            closes_failed = self.closes_failed.load(Ordering::Relaxed),
            switch_arms = self.switch_arms.load(Ordering::Relaxed),
            reenables = self.reenables.load(Ordering::Relaxed),
            news_batches = self.news_batches.load(Ordering::Relaxed),
            "Enforcement summary"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let stats = EnforcementStats::new(Utc::now());
        stats.record_tick();
        stats.record_tick();
        stats.record_closes(2, 1);
        stats.record_switch_arm();

        assert_eq!(stats.ticks(), 2);
        assert_eq!(stats.closes_accepted.load(Ordering::Relaxed), 2);
        assert_eq!(stats.closes_failed.load(Ordering::Relaxed), 1);
        assert_eq!(stats.switch_arms.load(Ordering::Relaxed), 1);
    }
}
