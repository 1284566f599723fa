//! Probe pipeline: fault-tolerant reads of single environment facets.
//!
//! Every probe returns a value of a fixed shape. When the underlying facet
//! is missing or fails, the probe substitutes its sentinel (`None`,
//! `"Unknown"`, `"unavailable"`, `false`, or a zero position) and logs at
//! debug level. Nothing here returns an error to the caller.

pub mod fingerprint;
pub mod snapshot;

pub use fingerprint::{canvas_fingerprint, composite_fingerprint, webgl_fingerprint};
pub use snapshot::{gather, Snapshot, SNAPSHOT_KEYS};

use crate::environment::{ConnectionInfo, Environment, Position, ProbeResult, TimingMarks};
use serde::{Deserialize, Serialize};

/// Sentinel for names that could not be resolved.
pub const UNKNOWN: &str = "Unknown";

/// Unwrap a facet read, logging and degrading to `None` on failure.
pub(crate) fn read<T>(result: ProbeResult<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::debug!("probe degraded: {e}");
            None
        }
    }
}

/// Browser family from the user agent.
///
/// Case-sensitive substring tests in priority order; each test excludes the
/// families that would otherwise also match.
pub fn browser_name(user_agent: &str) -> &'static str {
    let ua = user_agent;
    if ua.contains("Chrome") && !ua.contains("Edge") {
        "Chrome"
    } else if ua.contains("Firefox") {
        "Firefox"
    } else if ua.contains("Safari") && !ua.contains("Chrome") {
        "Safari"
    } else if ua.contains("Edge") {
        "Edge"
    } else if ua.contains("Opera") {
        "Opera"
    } else if ua.contains("MSIE") || ua.contains("Trident") {
        "Internet Explorer"
    } else {
        UNKNOWN
    }
}

/// Operating system from the platform string, then the user agent.
pub fn operating_system(platform: &str, user_agent: &str) -> &'static str {
    let platform = platform.to_lowercase();
    let ua = user_agent.to_lowercase();

    if platform.contains("win") {
        "Windows"
    } else if platform.contains("mac") {
        "macOS"
    } else if platform.contains("linux") {
        "Linux"
    } else if ua.contains("android") {
        "Android"
    } else if ua.contains("iphone") || ua.contains("ipad") {
        "iOS"
    } else {
        UNKNOWN
    }
}

/// Browser family of the environment, `"Unknown"` without a user agent.
pub fn browser(env: &dyn Environment) -> String {
    read(env.user_agent())
        .map(|ua| browser_name(&ua))
        .unwrap_or(UNKNOWN)
        .to_string()
}

/// Operating system of the environment.
pub fn os(env: &dyn Environment) -> String {
    let platform = read(env.platform()).unwrap_or_default();
    let ua = read(env.user_agent()).unwrap_or_default();
    operating_system(&platform, &ua).to_string()
}

/// IANA timezone name, `"Unknown"` when it cannot be resolved.
pub fn timezone(env: &dyn Environment) -> String {
    read(env.timezone_name()).unwrap_or_else(|| UNKNOWN.to_string())
}

/// Network connection details, `None` without the connection API.
pub fn connection_info(env: &dyn Environment) -> Option<ConnectionInfo> {
    read(env.connection())
}

/// Page load timing in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadTiming {
    pub load_time: i64,
    pub dom_ready: i64,
}

/// Navigation and timing data of the current page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerformanceData {
    pub navigation_type: Option<u32>,
    pub redirect_count: Option<u32>,
    pub timing: Option<LoadTiming>,
}

/// Performance data, `None` without the performance API.
pub fn performance_data(env: &dyn Environment) -> Option<PerformanceData> {
    let perf = read(env.performance())?;
    Some(PerformanceData {
        navigation_type: perf.navigation.map(|n| n.navigation_type),
        redirect_count: perf.navigation.map(|n| n.redirect_count),
        timing: perf.timing.and_then(load_timing),
    })
}

/// Durations relative to navigation start; `None` when the marks overflow.
fn load_timing(t: TimingMarks) -> Option<LoadTiming> {
    let timing = t
        .load_event_end
        .checked_sub(t.navigation_start)
        .zip(t.dom_content_loaded_event_end.checked_sub(t.navigation_start))
        .map(|(load_time, dom_ready)| LoadTiming {
            load_time,
            dom_ready,
        });
    if timing.is_none() {
        tracing::debug!(?t, "timing marks out of range");
    }
    timing
}

/// Document scroll offset, `{0, 0}` when unavailable.
pub fn scroll_position(env: &dyn Environment) -> Position {
    read(env.scroll_offset()).unwrap_or_default()
}

/// Feature-detection flags; absence or failure reads as `false`.
pub fn has_webrtc(env: &dyn Environment) -> bool {
    read(env.has_webrtc()).unwrap_or(false)
}

pub fn has_websocket(env: &dyn Environment) -> bool {
    read(env.has_websocket()).unwrap_or(false)
}

pub fn has_local_storage(env: &dyn Environment) -> bool {
    read(env.has_local_storage()).unwrap_or(false)
}

pub fn has_session_storage(env: &dyn Environment) -> bool {
    read(env.has_session_storage()).unwrap_or(false)
}
