//! Ingestion metrics

use std::sync::atomic::{AtomicU64, Ordering};

/// Line-level counters kept by the supervisor
#[derive(Debug, Default)]
pub struct IngestionMetrics {
    /// Lines pulled from the source
    pub lines_received: AtomicU64,

    /// Transport faults observed
    pub transport_faults: AtomicU64,

    /// Successful reconnects
    pub reconnects: AtomicU64,

    /// Lines that could not be written to the capture file
    pub capture_errors: AtomicU64,
}

impl IngestionMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Record line received
    pub fn record_line(&self) {
        self.lines_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Record transport fault
    pub fn record_transport_fault(&self) {
        self.transport_faults.fetch_add(1, Ordering::Relaxed);
    }

    /// Record successful reconnect
    pub fn record_reconnect(&self) {
        self.reconnects.fetch_add(1, Ordering::Relaxed);
    }

    /// Record capture write failure
    pub fn record_capture_error(&self) {
        self.capture_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot
    pub fn snapshot(&self) -> IngestionSnapshot {
        IngestionSnapshot {
            lines_received: self.lines_received.load(Ordering::Relaxed),
            transport_faults: self.transport_faults.load(Ordering::Relaxed),
            reconnects: self.reconnects.load(Ordering::Relaxed),
            capture_errors: self.capture_errors.load(Ordering::Relaxed),
        }
    }
}

/// Metrics snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestionSnapshot {
    pub lines_received: u64,
    pub transport_faults: u64,
    pub reconnects: u64,
    pub capture_errors: u64,
}
