//! Integration tests for the collector against a local collection sink

use analytics_collector::{
    AnalyticsCollector, ConfigOverrides, PointerPosition, ProfileEnvironment, TransportKind,
    COLLECTOR_TYPE, SNAPSHOT_KEYS,
};
use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde_json::{json, Map, Value};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::time::Instant;

#[derive(Clone, Default)]
struct Sink {
    received: Arc<Mutex<Vec<Value>>>,
    arrivals: Arc<Mutex<Vec<Instant>>>,
}

impl Sink {
    fn count(&self) -> usize {
        self.received.lock().unwrap().len()
    }

    fn payload(&self, index: usize) -> Value {
        self.received.lock().unwrap()[index].clone()
    }

    fn arrivals(&self) -> Vec<Instant> {
        self.arrivals.lock().unwrap().clone()
    }
}

async fn accept(State(sink): State<Sink>, Json(body): Json<Value>) -> Json<Value> {
    sink.received.lock().unwrap().push(body);
    Json(json!({"status": "success", "session_id": "test-session"}))
}

/// Holds the first request for two seconds, answers later ones at once.
async fn slow_first(State(sink): State<Sink>, Json(body): Json<Value>) -> Json<Value> {
    let first = {
        let mut arrivals = sink.arrivals.lock().unwrap();
        arrivals.push(Instant::now());
        arrivals.len() == 1
    };
    if first {
        tokio::time::sleep(Duration::from_secs(2)).await;
    }
    sink.received.lock().unwrap().push(body);
    Json(json!({"status": "success"}))
}

async fn reject(State(sink): State<Sink>, Json(body): Json<Value>) -> StatusCode {
    sink.received.lock().unwrap().push(body);
    StatusCode::INTERNAL_SERVER_ERROR
}

async fn start_sink() -> (SocketAddr, Sink) {
    let sink = Sink::default();
    let app = Router::new()
        .route("/collect", post(accept))
        .route("/reject", post(reject))
        .route("/slow", post(slow_first))
        .with_state(sink.clone());

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind sink");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (addr, sink)
}

async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..250 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}

/// Stop the collector and wait for requests already in flight.
async fn stop_and_settle(collector: &AnalyticsCollector) {
    collector.stop();
    let log = collector.delivery_log();
    assert!(wait_until(|| log.pending() == 0).await);
}

fn collector_for(env: ProfileEnvironment) -> AnalyticsCollector {
    AnalyticsCollector::new(Arc::new(env), PointerPosition::new()).expect("Failed to build collector")
}

fn overrides(addr: SocketAddr) -> ConfigOverrides {
    ConfigOverrides {
        // trailing slash must be stripped before the endpoint is appended
        server: Some(format!("http://{addr}/")),
        debug: Some(true),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_second_init_has_no_side_effects() {
    let (addr, sink) = start_sink().await;
    let collector = collector_for(ProfileEnvironment::desktop_chrome());

    collector.init(overrides(addr));
    assert!(wait_until(|| sink.count() == 1).await);

    collector.init(overrides(addr));
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(sink.count(), 1);
    assert_eq!(collector.stats().collections, 1);
}

#[tokio::test]
async fn test_collect_before_init_sends_nothing() {
    let (_addr, sink) = start_sink().await;
    let collector = collector_for(ProfileEnvironment::desktop_chrome());

    collector.collect(Map::new());
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(sink.count(), 0);
    assert_eq!(collector.stats().skipped, 1);
}

#[tokio::test]
async fn test_auto_interval_sends_immediately_then_per_period() {
    let (addr, sink) = start_sink().await;
    let collector = collector_for(ProfileEnvironment::desktop_chrome());

    collector.init(ConfigOverrides {
        interval: Some(400),
        ..overrides(addr)
    });
    assert!(collector.is_running());

    // the immediate collection lands before the first tick is due
    assert!(wait_until(|| sink.count() >= 1).await);
    let first = sink.payload(0);
    assert_eq!(first["collector_type"], COLLECTOR_TYPE);
    let timestamp = first["timestamp"].as_str().unwrap();
    assert!(chrono::DateTime::parse_from_rfc3339(timestamp).is_ok());

    assert!(wait_until(|| sink.count() >= 2).await);

    stop_and_settle(&collector).await;
    assert!(!collector.is_running());
    let settled = sink.count();
    tokio::time::sleep(Duration::from_millis(1_000)).await;
    assert_eq!(sink.count(), settled);
}

#[tokio::test]
async fn test_extras_merged_alongside_standard_fields() {
    let (addr, sink) = start_sink().await;
    let collector = collector_for(ProfileEnvironment::desktop_chrome());

    collector.init(ConfigOverrides {
        auto: Some(false),
        ..overrides(addr)
    });
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(sink.count(), 0);

    let mut extra = Map::new();
    extra.insert("foo".to_string(), json!("bar"));
    collector.collect(extra);

    assert!(wait_until(|| sink.count() == 1).await);
    let payload = sink.payload(0);
    assert_eq!(payload["foo"], "bar");
    assert_eq!(payload["browser"], "Chrome");
    for key in SNAPSHOT_KEYS {
        assert!(payload.get(key).is_some(), "missing key {key}");
    }
}

#[tokio::test]
async fn test_degraded_environment_payload_is_schema_complete() {
    let (addr, sink) = start_sink().await;
    let collector = collector_for(ProfileEnvironment {
        fetch: true,
        ..Default::default()
    });

    collector.init(overrides(addr));
    assert!(wait_until(|| sink.count() == 1).await);

    let payload = sink.payload(0);
    for key in SNAPSHOT_KEYS {
        assert!(payload.get(key).is_some(), "missing key {key}");
    }
    assert_eq!(payload["browser"], "Unknown");
    assert_eq!(payload["canvas_fingerprint"], "unavailable");
    assert!(payload["screen_resolution"].is_null());
}

#[tokio::test]
async fn test_legacy_transport_delivers() {
    let (addr, sink) = start_sink().await;
    let mut env = ProfileEnvironment::desktop_chrome();
    env.fetch = false;
    let collector = collector_for(env);
    assert_eq!(collector.transport_kind(), TransportKind::Legacy);

    collector.init(overrides(addr));
    assert!(wait_until(|| sink.count() == 1).await);
    assert!(wait_until(|| collector.stats().delivered == 1).await);
    assert_eq!(sink.payload(0)["collector_type"], COLLECTOR_TYPE);
}

#[tokio::test]
async fn test_failures_counted_and_interval_continues() {
    let (addr, sink) = start_sink().await;
    let collector = collector_for(ProfileEnvironment::desktop_chrome());

    collector.init(ConfigOverrides {
        endpoint: Some("/reject".to_string()),
        interval: Some(150),
        ..overrides(addr)
    });

    assert!(wait_until(|| sink.count() >= 3).await);
    stop_and_settle(&collector).await;

    let stats = collector.stats();
    assert_eq!(stats.delivered, 0);
    assert_eq!(stats.failed, stats.collections);
}

#[tokio::test]
async fn test_restart_rearms_single_timer() {
    let (addr, sink) = start_sink().await;
    let collector = collector_for(ProfileEnvironment::desktop_chrome());

    collector.init(ConfigOverrides {
        auto: Some(false),
        interval: Some(300),
        ..overrides(addr)
    });
    assert!(!collector.is_running());

    collector.stop();
    collector.restart();
    collector.restart();
    assert!(collector.is_running());

    assert!(wait_until(|| sink.count() >= 1).await);
    // a second timer would have ticked at the same instant
    stop_and_settle(&collector).await;
    assert_eq!(collector.stats().collections, 1);
    assert_eq!(sink.count(), 1);

    collector.stop();
    assert!(!collector.is_running());
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(sink.count(), 1);
}

#[tokio::test]
async fn test_legacy_slow_response_does_not_delay_next_request() {
    let (addr, sink) = start_sink().await;
    let mut env = ProfileEnvironment::desktop_chrome();
    env.fetch = false;
    let collector = collector_for(env);

    collector.init(ConfigOverrides {
        auto: Some(false),
        endpoint: Some("/slow".to_string()),
        ..overrides(addr)
    });

    collector.collect(Map::new());
    tokio::time::sleep(Duration::from_millis(100)).await;
    collector.collect(Map::new());

    assert!(wait_until(|| sink.arrivals().len() == 2).await);
    let arrivals = sink.arrivals();
    assert!(arrivals[1] - arrivals[0] < Duration::from_secs(1));

    // the second answer is in while the first is still held
    assert!(wait_until(|| collector.stats().delivered >= 1).await);
    assert_eq!(sink.count(), 1);

    assert!(wait_until(|| collector.stats().delivered == 2).await);
}
