//! Schema-complete snapshot of the environment.
//!
//! Every field serializes on every snapshot; capability gaps show up as
//! sentinel values (`null`, `"Unknown"`, `"unavailable"`, `false`), never as
//! missing keys, so the receiving schema stays stable across hosts.

use super::{fingerprint, read, PerformanceData};
use crate::environment::{ConnectionInfo, Environment, Position};
use crate::pointer::PointerPosition;
use serde::{Deserialize, Serialize};

/// Field names of a serialized [`Snapshot`], in serialization order.
pub const SNAPSHOT_KEYS: [&str; 30] = [
    "browser",
    "user_agent",
    "os",
    "platform",
    "screen_resolution",
    "viewport",
    "color_depth",
    "pixel_ratio",
    "timezone",
    "language",
    "languages",
    "cookies_enabled",
    "do_not_track",
    "java_enabled",
    "hardware_concurrency",
    "memory",
    "connection",
    "fingerprint",
    "canvas_fingerprint",
    "webgl_fingerprint",
    "url",
    "referrer",
    "title",
    "performance",
    "mouse_position",
    "scroll_position",
    "webrtc_support",
    "websocket_support",
    "local_storage",
    "session_storage",
];

/// One point-in-time observation of the environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    // Browser
    pub browser: String,
    pub user_agent: Option<String>,

    // System
    pub os: String,
    pub platform: Option<String>,

    // Display
    pub screen_resolution: Option<String>,
    pub viewport: Option<String>,
    pub color_depth: Option<u32>,
    pub pixel_ratio: Option<f64>,

    // Locale and time
    pub timezone: String,
    pub language: Option<String>,
    pub languages: Option<Vec<String>>,

    // Capabilities
    pub cookies_enabled: bool,
    pub do_not_track: Option<String>,
    pub java_enabled: bool,

    // Hardware
    pub hardware_concurrency: Option<u32>,
    pub memory: Option<f64>,

    pub connection: Option<ConnectionInfo>,

    // Fingerprints
    pub fingerprint: String,
    pub canvas_fingerprint: String,
    pub webgl_fingerprint: String,

    // Page
    pub url: Option<String>,
    pub referrer: Option<String>,
    pub title: Option<String>,

    pub performance: Option<PerformanceData>,

    // Interaction
    pub mouse_position: Position,
    pub scroll_position: Position,

    // Features
    pub webrtc_support: bool,
    pub websocket_support: bool,
    pub local_storage: bool,
    pub session_storage: bool,
}

/// Run every probe against `env` and assemble a snapshot.
///
/// The pointer position is read from the shared cell written by the
/// pointer listener; it reflects the last move event, not a live query.
pub fn gather(env: &dyn Environment, pointer: &PointerPosition) -> Snapshot {
    let user_agent = read(env.user_agent());
    let platform = read(env.platform());
    let screen = read(env.screen());
    let page = read(env.page()).unwrap_or_default();

    Snapshot {
        browser: super::browser(env),
        user_agent,

        os: super::os(env),
        platform,

        screen_resolution: screen.map(|s| format!("{}x{}", s.width, s.height)),
        viewport: read(env.viewport()).map(|v| format!("{}x{}", v.width, v.height)),
        color_depth: screen.and_then(|s| s.color_depth),
        pixel_ratio: read(env.device_pixel_ratio()),

        timezone: super::timezone(env),
        language: read(env.language()),
        languages: read(env.languages()),

        cookies_enabled: read(env.cookie_enabled()).unwrap_or(false),
        do_not_track: read(env.do_not_track()).flatten(),
        java_enabled: read(env.java_enabled()).unwrap_or(false),

        hardware_concurrency: read(env.hardware_concurrency()),
        memory: read(env.device_memory()),

        connection: super::connection_info(env),

        fingerprint: fingerprint::composite_fingerprint(env),
        canvas_fingerprint: fingerprint::canvas_fingerprint(env),
        webgl_fingerprint: fingerprint::webgl_fingerprint(env),

        url: page.url,
        referrer: page.referrer,
        title: page.title,

        performance: super::performance_data(env),

        mouse_position: pointer.last_known(),
        scroll_position: super::scroll_position(env),

        webrtc_support: super::has_webrtc(env),
        websocket_support: super::has_websocket(env),
        local_storage: super::has_local_storage(env),
        session_storage: super::has_session_storage(env),
    }
}

impl Snapshot {
    /// Serialize into a JSON object map.
    pub fn into_map(self) -> serde_json::Map<String, serde_json::Value> {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => map,
            // a struct of plain fields always serializes to an object
            _ => serde_json::Map::new(),
        }
    }
}
