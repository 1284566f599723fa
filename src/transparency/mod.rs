//! Transparency module for the Analytics Collector.
//!
//! Tracks what the collector has sent and how each delivery ended, so
//! operators can audit collection activity.

pub mod log;

// Re-export commonly used types
pub use log::{create_shared_log, DeliveryLog, DeliveryStats, SharedDeliveryLog};
