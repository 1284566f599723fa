//! Environment facets read by the probe pipeline.
//!
//! An [`Environment`] stands in for the host page: every accessor reports
//! one facet (navigator, screen, page, rendering, ...) or a [`ProbeError`]
//! when the capability is missing or fails. Default method bodies report
//! the facet as unsupported, so implementations only override what they have.

pub mod host;
pub mod profile;

pub use host::HostEnvironment;
pub use profile::ProfileEnvironment;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result of reading one environment facet.
pub type ProbeResult<T> = Result<T, ProbeError>;

/// Why a facet could not be read.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
    /// The capability does not exist in this environment
    #[error("{0} is not supported")]
    Unsupported(&'static str),
    /// The capability exists but reading it failed
    #[error("{facet} failed: {reason}")]
    Failed { facet: &'static str, reason: String },
    /// A value could not be encoded for fingerprinting
    #[error("encoding failed: {0}")]
    Encoding(String),
}

/// Physical screen properties.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenInfo {
    pub width: u32,
    pub height: u32,
    pub color_depth: Option<u32>,
}

/// Width and height in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Network information as exposed by the connection API.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConnectionInfo {
    pub effective_type: Option<String>,
    pub downlink: Option<f64>,
    pub rtt: Option<u32>,
    pub save_data: Option<bool>,
}

/// Page context of the current document.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PageInfo {
    pub url: Option<String>,
    pub referrer: Option<String>,
    pub title: Option<String>,
}

/// Navigation entry of the performance API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationEntry {
    #[serde(rename = "type")]
    pub navigation_type: u32,
    pub redirect_count: u32,
}

/// Millisecond marks of the performance timing API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingMarks {
    pub navigation_start: i64,
    pub dom_content_loaded_event_end: i64,
    pub load_event_end: i64,
}

/// What the performance API exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PerformanceInfo {
    pub navigation: Option<NavigationEntry>,
    pub timing: Option<TimingMarks>,
}

/// A document scroll offset or pointer coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// GPU identification strings from a WebGL context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlParameters {
    pub vendor: String,
    pub renderer: String,
}

/// Text drawn onto an offscreen canvas for the canvas fingerprint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextRender {
    pub text: &'static str,
    pub font: &'static str,
    pub baseline: &'static str,
    pub x: f64,
    pub y: f64,
}

/// The host the collector runs inside.
///
/// Implementations must be read-only: probing never mutates ambient state.
pub trait Environment: Send + Sync {
    fn user_agent(&self) -> ProbeResult<String> {
        Err(ProbeError::Unsupported("navigator.userAgent"))
    }

    fn platform(&self) -> ProbeResult<String> {
        Err(ProbeError::Unsupported("navigator.platform"))
    }

    fn language(&self) -> ProbeResult<String> {
        Err(ProbeError::Unsupported("navigator.language"))
    }

    fn languages(&self) -> ProbeResult<Vec<String>> {
        Err(ProbeError::Unsupported("navigator.languages"))
    }

    fn screen(&self) -> ProbeResult<ScreenInfo> {
        Err(ProbeError::Unsupported("screen"))
    }

    fn viewport(&self) -> ProbeResult<Dimensions> {
        Err(ProbeError::Unsupported("window.inner size"))
    }

    fn device_pixel_ratio(&self) -> ProbeResult<f64> {
        Err(ProbeError::Unsupported("window.devicePixelRatio"))
    }

    /// IANA timezone name, e.g. `Europe/Berlin`.
    fn timezone_name(&self) -> ProbeResult<String> {
        Err(ProbeError::Unsupported("Intl.DateTimeFormat"))
    }

    /// Minutes to add to local time to reach UTC (positive west of UTC).
    fn timezone_offset_minutes(&self) -> ProbeResult<i32> {
        Err(ProbeError::Unsupported("Date.getTimezoneOffset"))
    }

    fn cookie_enabled(&self) -> ProbeResult<bool> {
        Err(ProbeError::Unsupported("navigator.cookieEnabled"))
    }

    /// Raw do-not-track value; `Ok(None)` means the header is unset.
    fn do_not_track(&self) -> ProbeResult<Option<String>> {
        Err(ProbeError::Unsupported("navigator.doNotTrack"))
    }

    fn java_enabled(&self) -> ProbeResult<bool> {
        Err(ProbeError::Unsupported("navigator.javaEnabled"))
    }

    fn hardware_concurrency(&self) -> ProbeResult<u32> {
        Err(ProbeError::Unsupported("navigator.hardwareConcurrency"))
    }

    /// Approximate device memory in GiB.
    fn device_memory(&self) -> ProbeResult<f64> {
        Err(ProbeError::Unsupported("navigator.deviceMemory"))
    }

    fn connection(&self) -> ProbeResult<ConnectionInfo> {
        Err(ProbeError::Unsupported("navigator.connection"))
    }

    fn page(&self) -> ProbeResult<PageInfo> {
        Err(ProbeError::Unsupported("document"))
    }

    fn performance(&self) -> ProbeResult<PerformanceInfo> {
        Err(ProbeError::Unsupported("window.performance"))
    }

    fn scroll_offset(&self) -> ProbeResult<Position> {
        Err(ProbeError::Unsupported("window.pageOffset"))
    }

    /// Draw `request` onto an offscreen canvas and serialize it as a data URL.
    fn render_text(&self, _request: &TextRender) -> ProbeResult<String> {
        Err(ProbeError::Unsupported("canvas 2d context"))
    }

    fn gl_parameters(&self) -> ProbeResult<GlParameters> {
        Err(ProbeError::Unsupported("webgl context"))
    }

    fn has_webrtc(&self) -> ProbeResult<bool> {
        Err(ProbeError::Unsupported("mediaDevices"))
    }

    fn has_websocket(&self) -> ProbeResult<bool> {
        Err(ProbeError::Unsupported("WebSocket"))
    }

    fn has_local_storage(&self) -> ProbeResult<bool> {
        Err(ProbeError::Unsupported("localStorage"))
    }

    fn has_session_storage(&self) -> ProbeResult<bool> {
        Err(ProbeError::Unsupported("sessionStorage"))
    }

    /// Whether the modern asynchronous fetch mechanism is available.
    fn supports_fetch(&self) -> bool {
        false
    }
}

/// An environment with no capabilities at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct BareEnvironment;

impl Environment for BareEnvironment {}
