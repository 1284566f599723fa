//! Analytics Collector - embeddable environment telemetry.
//!
//! This library gathers a snapshot of the host environment (browser
//! identity, OS, display, locale, hardware, network, page context,
//! capabilities), derives best-effort fingerprints from it and delivers
//! the snapshot as JSON to a collection endpoint, once or on an interval.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     Analytics Collector                      │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐         │
//! │  │ Environment │──▶│   Probes    │──▶│  Snapshot   │         │
//! │  │  (facets)   │   │ + fingerpr. │   │             │         │
//! │  └─────────────┘   └─────────────┘   └─────────────┘         │
//! │         ▲                                   │                │
//! │  ┌─────────────┐                     ┌─────────────┐         │
//! │  │   Pointer   │                     │ Controller  │──timer  │
//! │  │  Listener   │                     │  (collect)  │         │
//! │  └─────────────┘                     └─────────────┘         │
//! │                                             ▼                │
//! │                                      ┌─────────────┐         │
//! │                                      │  Transport  │──▶ HTTP │
//! │                                      │fetch/legacy │         │
//! │                                      └─────────────┘         │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use analytics_collector::{AnalyticsCollector, ConfigOverrides, HostEnvironment, PointerPosition};
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), analytics_collector::CollectorError> {
//! let collector = AnalyticsCollector::new(Arc::new(HostEnvironment::new()), PointerPosition::new())?;
//! collector.init(ConfigOverrides {
//!     server: Some("https://yourserver.com".into()),
//!     interval: Some(30_000),
//!     ..Default::default()
//! });
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod controller;
pub mod environment;
pub mod pointer;
pub mod probe;
pub mod transparency;
pub mod transport;

// Re-export key types at crate root for convenience
pub use config::{Bootstrap, BootstrapSource, CollectorConfig, ConfigError, ConfigOverrides};
pub use controller::{build_payload, AnalyticsCollector, CollectorError, COLLECTOR_TYPE};
pub use environment::{Environment, HostEnvironment, ProbeError, ProfileEnvironment};
pub use pointer::{PointerEvent, PointerListener, PointerPosition};
pub use probe::{gather, Snapshot, SNAPSHOT_KEYS};
pub use transparency::{DeliveryLog, DeliveryStats, SharedDeliveryLog};
pub use transport::{target_url, Acknowledgement, Transport, TransportError, TransportKind};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
