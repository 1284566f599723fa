//! Delivery accounting.
//!
//! Counts collection cycles and their delivery outcomes for the current
//! session. Completion handlers record here instead of touching controller
//! state. Nothing is persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Delivery statistics for the current session.
#[derive(Debug)]
pub struct DeliveryLog {
    /// Collection cycles that handed a payload to the transport
    collections: AtomicU64,
    /// Deliveries acknowledged by the sink
    delivered: AtomicU64,
    /// Deliveries that failed (network, status, malformed response)
    failed: AtomicU64,
    /// `collect` calls ignored because the collector was not initialized
    skipped: AtomicU64,
    /// Session start time
    session_start: DateTime<Utc>,
}

impl DeliveryLog {
    /// Create a new delivery log.
    pub fn new() -> Self {
        Self {
            collections: AtomicU64::new(0),
            delivered: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            skipped: AtomicU64::new(0),
            session_start: Utc::now(),
        }
    }

    /// Record a payload handed to the transport.
    pub fn record_collection(&self) {
        self.collections.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an acknowledged delivery.
    pub fn record_delivered(&self) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed delivery.
    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a `collect` call made before `init`.
    pub fn record_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    /// Deliveries issued but not yet completed.
    pub fn pending(&self) -> u64 {
        let stats = self.stats();
        stats
            .collections
            .saturating_sub(stats.delivered + stats.failed)
    }

    /// Get the current statistics.
    pub fn stats(&self) -> DeliveryStats {
        DeliveryStats {
            collections: self.collections.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            session_start: self.session_start,
            session_duration_secs: (Utc::now() - self.session_start).num_seconds().max(0) as u64,
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let stats = self.stats();
        format!(
            "Session Statistics:\n\
             - Collections sent: {}\n\
             - Deliveries acknowledged: {}\n\
             - Deliveries failed: {}\n\
             - Calls before init: {}\n\
             - Session duration: {} seconds",
            stats.collections,
            stats.delivered,
            stats.failed,
            stats.skipped,
            stats.session_duration_secs
        )
    }

    /// Reset all counters.
    pub fn reset(&self) {
        self.collections.store(0, Ordering::Relaxed);
        self.delivered.store(0, Ordering::Relaxed);
        self.failed.store(0, Ordering::Relaxed);
        self.skipped.store(0, Ordering::Relaxed);
    }
}

impl Default for DeliveryLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of delivery statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryStats {
    pub collections: u64,
    pub delivered: u64,
    pub failed: u64,
    pub skipped: u64,
    pub session_start: DateTime<Utc>,
    pub session_duration_secs: u64,
}

/// Thread-safe shared delivery log.
pub type SharedDeliveryLog = Arc<DeliveryLog>;

/// Create a new shared delivery log.
pub fn create_shared_log() -> SharedDeliveryLog {
    Arc::new(DeliveryLog::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delivery_log_counting() {
        let log = DeliveryLog::new();

        log.record_collection();
        log.record_collection();
        log.record_delivered();
        log.record_skipped();

        let stats = log.stats();
        assert_eq!(stats.collections, 2);
        assert_eq!(stats.delivered, 1);
        assert_eq!(stats.failed, 0);
        assert_eq!(stats.skipped, 1);
        assert_eq!(log.pending(), 1);

        log.record_failed();
        assert_eq!(log.pending(), 0);
    }

    #[test]
    fn test_delivery_log_reset() {
        let log = DeliveryLog::new();

        log.record_collection();
        log.record_failed();
        log.reset();

        let stats = log.stats();
        assert_eq!(stats.collections, 0);
        assert_eq!(stats.failed, 0);
    }

    #[test]
    fn test_summary_format() {
        let log = DeliveryLog::new();
        let summary = log.summary();

        assert!(summary.contains("Collections sent"));
        assert!(summary.contains("Deliveries acknowledged"));
        assert!(summary.contains("Deliveries failed"));
    }
}
