//! Collection controller.
//!
//! Owns the configuration, the one-way initialization flag and the repeating
//! timer, and drives collection cycles: gather a snapshot, merge caller
//! extras and a timestamp, then hand the payload to the transport without
//! awaiting it. Misuse and delivery failures are logged (when `debug` is
//! set) and never surface as errors.

use crate::config::{Bootstrap, CollectorConfig, ConfigOverrides};
use crate::environment::Environment;
use crate::pointer::PointerPosition;
use crate::probe::{self, Snapshot};
use crate::transparency::{create_shared_log, DeliveryStats, SharedDeliveryLog};
use crate::transport::{Transport, TransportError, TransportKind};
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use uuid::Uuid;

/// Discriminator marking payloads produced by this collector.
pub const COLLECTOR_TYPE: &str = "embed_script";

/// Errors constructing a collector.
#[derive(Debug, Error)]
pub enum CollectorError {
    #[error("collector must be created inside a tokio runtime")]
    NoRuntime,
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Merge a snapshot, caller extras, the timestamp and the discriminator.
///
/// Later layers win on key collisions: extras override snapshot fields, and
/// `timestamp`/`collector_type` override both.
pub fn build_payload(snapshot: Snapshot, extra: Map<String, Value>, at: DateTime<Utc>) -> Value {
    let mut payload = snapshot.into_map();
    payload.extend(extra);
    payload.insert(
        "timestamp".to_string(),
        Value::String(at.to_rfc3339_opts(SecondsFormat::Millis, true)),
    );
    payload.insert(
        "collector_type".to_string(),
        Value::String(COLLECTOR_TYPE.to_string()),
    );
    Value::Object(payload)
}

#[derive(Default)]
struct State {
    config: CollectorConfig,
    initialized: bool,
    timer: Option<JoinHandle<()>>,
}

struct Inner {
    environment: Arc<dyn Environment>,
    pointer: PointerPosition,
    transport: Arc<Transport>,
    delivery_log: SharedDeliveryLog,
    runtime: Handle,
    instance_id: Uuid,
    state: Mutex<State>,
}

/// The collector instance exposed to the host.
///
/// Cloning yields another handle to the same collector.
#[derive(Clone)]
pub struct AnalyticsCollector {
    inner: Arc<Inner>,
}

impl AnalyticsCollector {
    /// Create a collector bound to the current tokio runtime.
    ///
    /// The transport mechanism is selected here, once, from the
    /// environment's capabilities.
    pub fn new(
        environment: Arc<dyn Environment>,
        pointer: PointerPosition,
    ) -> Result<Self, CollectorError> {
        let runtime = Handle::try_current().map_err(|_| CollectorError::NoRuntime)?;
        let transport = Transport::detect(environment.as_ref())?;

        Ok(Self {
            inner: Arc::new(Inner {
                environment,
                pointer,
                transport: Arc::new(transport),
                delivery_log: create_shared_log(),
                runtime,
                instance_id: Uuid::new_v4(),
                state: Mutex::new(State::default()),
            }),
        })
    }

    /// Initialize with caller overrides on top of the defaults.
    ///
    /// A second call is a logged no-op. With `auto` set, one collection runs
    /// immediately and, for a positive interval, the repeating timer is armed.
    pub fn init(&self, overrides: ConfigOverrides) {
        self.inner.init(overrides);
    }

    /// Initialize from a bootstrap configuration, if one was found.
    ///
    /// Returns whether initialization was attempted.
    pub fn auto_init(&self, bootstrap: Option<Bootstrap>) -> bool {
        match bootstrap {
            Some(bootstrap) => {
                self.init(bootstrap.overrides);
                true
            }
            None => false,
        }
    }

    /// Run one collection cycle with extra fields merged into the payload.
    pub fn collect(&self, extra: Map<String, Value>) {
        self.inner.collect(extra);
    }

    /// Cancel the repeating timer, if any. In-flight requests are not aborted.
    pub fn stop(&self) {
        self.inner.stop();
    }

    /// Stop, then re-arm the timer from the current configuration.
    pub fn restart(&self) {
        self.inner.restart();
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.lock().initialized
    }

    /// Whether a repeating collection is scheduled.
    pub fn is_running(&self) -> bool {
        self.inner.lock().timer.is_some()
    }

    /// The active configuration (defaults before `init`).
    pub fn config(&self) -> CollectorConfig {
        self.inner.lock().config.clone()
    }

    pub fn transport_kind(&self) -> TransportKind {
        self.inner.transport.kind()
    }

    pub fn instance_id(&self) -> Uuid {
        self.inner.instance_id
    }

    /// Gather a snapshot without sending it.
    pub fn snapshot(&self) -> Snapshot {
        probe::gather(self.inner.environment.as_ref(), &self.inner.pointer)
    }

    pub fn stats(&self) -> DeliveryStats {
        self.inner.delivery_log.stats()
    }

    pub fn delivery_log(&self) -> SharedDeliveryLog {
        self.inner.delivery_log.clone()
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn init(self: &Arc<Self>, overrides: ConfigOverrides) {
        let config = {
            let mut state = self.lock();
            if state.initialized {
                if state.config.debug {
                    tracing::info!("Analytics Collector already initialized");
                }
                return;
            }

            state.config = overrides.apply_to(&CollectorConfig::default());
            state.initialized = true;
            state.config.clone()
        };

        if config.debug {
            tracing::info!(
                instance = %self.instance_id,
                server = %config.server,
                endpoint = %config.endpoint,
                interval_ms = config.interval,
                auto = config.auto,
                transport = %self.transport.kind(),
                "Analytics Collector initialized"
            );
        }

        if config.auto {
            self.collect(Map::new());

            if let Some(period) = config.period() {
                self.install_timer(self.arm_timer(period));
            }
        }
    }

    fn collect(&self, extra: Map<String, Value>) {
        let config = {
            let state = self.lock();
            if !state.initialized {
                if state.config.debug {
                    tracing::info!("Analytics Collector not initialized. Call init() first.");
                }
                self.delivery_log.record_skipped();
                return;
            }
            state.config.clone()
        };

        let snapshot = probe::gather(self.environment.as_ref(), &self.pointer);
        let payload = build_payload(snapshot, extra, Utc::now());
        let url = config.target_url();
        let debug = config.debug;

        self.delivery_log.record_collection();

        let transport = self.transport.clone();
        let delivery_log = self.delivery_log.clone();
        self.runtime.spawn(async move {
            match transport.send(&url, &payload).await {
                Ok(ack) => {
                    delivery_log.record_delivered();
                    if debug {
                        tracing::info!(url = %url, response = %ack.0, "Data sent successfully");
                    }
                }
                Err(e) => {
                    delivery_log.record_failed();
                    if debug {
                        tracing::warn!(url = %url, error = %e, "Error sending data");
                    }
                }
            }
        });
    }

    /// Free-running timer; the first tick fires one period after arming.
    fn arm_timer(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let weak: Weak<Inner> = Arc::downgrade(self);
        self.runtime.spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match weak.upgrade() {
                    Some(inner) => inner.collect(Map::new()),
                    None => break,
                }
            }
        })
    }

    /// Store `timer` as the active one, aborting any timer it displaces.
    fn install_timer(&self, timer: JoinHandle<()>) {
        let mut state = self.lock();
        if let Some(previous) = state.timer.replace(timer) {
            previous.abort();
        }
    }

    fn stop(&self) {
        let mut state = self.lock();
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
        if state.config.debug {
            tracing::info!("Analytics Collector stopped");
        }
    }

    fn restart(self: &Arc<Self>) {
        self.stop();

        let config = self.lock().config.clone();
        if let Some(period) = config.period() {
            self.install_timer(self.arm_timer(period));
        }
        if config.debug {
            tracing::info!("Analytics Collector restarted");
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(|e| e.into_inner());
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
    }
}
