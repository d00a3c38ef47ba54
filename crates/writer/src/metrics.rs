//! Writer metrics

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for one ingestion writer
#[derive(Debug, Default)]
pub struct WriterMetrics {
    persisted: AtomicU64,
    failed: AtomicU64,
    retries: AtomicU64,
    journaled: AtomicU64,
    journal_errors: AtomicU64,
}

impl WriterMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_persisted(&self) {
        self.persisted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_retries(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_journaled(&self) {
        self.journaled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_journal_errors(&self) {
        self.journal_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> WriterSnapshot {
        WriterSnapshot {
            persisted: self.persisted.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            journaled: self.journaled.load(Ordering::Relaxed),
            journal_errors: self.journal_errors.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of writer metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriterSnapshot {
    pub persisted: u64,
    pub failed: u64,
    pub retries: u64,
    pub journaled: u64,
    pub journal_errors: u64,
}
