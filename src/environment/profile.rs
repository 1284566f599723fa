//! Recorded browser profile replayed as an environment.
//!
//! Every facet is optional; a facet missing from the profile behaves like an
//! API missing from the browser.

use super::{
    ConnectionInfo, Dimensions, Environment, GlParameters, PageInfo, PerformanceInfo, Position,
    ProbeError, ProbeResult, ScreenInfo, TextRender,
};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;

/// Browser environment described by data.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileEnvironment {
    pub user_agent: Option<String>,
    pub platform: Option<String>,
    pub language: Option<String>,
    pub languages: Option<Vec<String>>,
    pub screen: Option<ScreenInfo>,
    pub viewport: Option<Dimensions>,
    pub device_pixel_ratio: Option<f64>,
    pub timezone: Option<String>,
    pub timezone_offset: Option<i32>,
    pub cookie_enabled: Option<bool>,
    /// `null` records an unset header; a missing key an absent API
    #[serde(
        deserialize_with = "present_or_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub do_not_track: Option<Option<String>>,
    pub java_enabled: Option<bool>,
    pub hardware_concurrency: Option<u32>,
    pub device_memory: Option<f64>,
    pub connection: Option<ConnectionInfo>,
    pub page: Option<PageInfo>,
    pub performance: Option<PerformanceInfo>,
    pub scroll: Option<Position>,
    /// Data URL the canvas produces for the fingerprint text
    pub canvas_data_url: Option<String>,
    pub webgl: Option<GlParameters>,
    pub webrtc: Option<bool>,
    pub websocket: Option<bool>,
    pub local_storage: Option<bool>,
    pub session_storage: Option<bool>,
    pub fetch: bool,
}

impl ProfileEnvironment {
    /// Parse a profile from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Load a profile from a JSON file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::from_json(&content)?)
    }

    /// A desktop Chrome on Windows with every capability present.
    pub fn desktop_chrome() -> Self {
        Self {
            user_agent: Some(
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36"
                    .to_string(),
            ),
            platform: Some("Win32".to_string()),
            language: Some("en-US".to_string()),
            languages: Some(vec!["en-US".to_string(), "en".to_string()]),
            screen: Some(ScreenInfo {
                width: 1920,
                height: 1080,
                color_depth: Some(24),
            }),
            viewport: Some(Dimensions {
                width: 1280,
                height: 720,
            }),
            device_pixel_ratio: Some(1.0),
            timezone: Some("America/New_York".to_string()),
            timezone_offset: Some(300),
            cookie_enabled: Some(true),
            do_not_track: Some(None),
            java_enabled: Some(false),
            hardware_concurrency: Some(8),
            device_memory: Some(8.0),
            connection: Some(ConnectionInfo {
                effective_type: Some("4g".to_string()),
                downlink: Some(10.0),
                rtt: Some(50),
                save_data: Some(false),
            }),
            page: Some(PageInfo {
                url: Some("https://example.com/".to_string()),
                referrer: Some(String::new()),
                title: Some("Example Domain".to_string()),
            }),
            performance: Some(PerformanceInfo {
                navigation: Some(super::NavigationEntry {
                    navigation_type: 0,
                    redirect_count: 0,
                }),
                timing: Some(super::TimingMarks {
                    navigation_start: 1_700_000_000_000,
                    dom_content_loaded_event_end: 1_700_000_000_420,
                    load_event_end: 1_700_000_000_910,
                }),
            }),
            scroll: Some(Position::new(0.0, 120.0)),
            canvas_data_url: Some(
                "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAASwAAACWCAYAAABkW7XSAAAAAXNSR0IArs4c6QAAIABJREFUeF7tnXmYFNW5xn9VA=="
                    .to_string(),
            ),
            webgl: Some(GlParameters {
                vendor: "WebKit".to_string(),
                renderer: "WebKit WebGL".to_string(),
            }),
            webrtc: Some(true),
            websocket: Some(true),
            local_storage: Some(true),
            session_storage: Some(true),
            fetch: true,
        }
    }
}

/// Keep an explicit `null` distinct from a missing key.
fn present_or_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn present<T: Clone>(value: &Option<T>, facet: &'static str) -> ProbeResult<T> {
    value.clone().ok_or(ProbeError::Unsupported(facet))
}

impl Environment for ProfileEnvironment {
    fn user_agent(&self) -> ProbeResult<String> {
        present(&self.user_agent, "navigator.userAgent")
    }

    fn platform(&self) -> ProbeResult<String> {
        present(&self.platform, "navigator.platform")
    }

    fn language(&self) -> ProbeResult<String> {
        present(&self.language, "navigator.language")
    }

    fn languages(&self) -> ProbeResult<Vec<String>> {
        present(&self.languages, "navigator.languages")
    }

    fn screen(&self) -> ProbeResult<ScreenInfo> {
        present(&self.screen, "screen")
    }

    fn viewport(&self) -> ProbeResult<Dimensions> {
        present(&self.viewport, "window.inner size")
    }

    fn device_pixel_ratio(&self) -> ProbeResult<f64> {
        present(&self.device_pixel_ratio, "window.devicePixelRatio")
    }

    fn timezone_name(&self) -> ProbeResult<String> {
        present(&self.timezone, "Intl.DateTimeFormat")
    }

    fn timezone_offset_minutes(&self) -> ProbeResult<i32> {
        present(&self.timezone_offset, "Date.getTimezoneOffset")
    }

    fn cookie_enabled(&self) -> ProbeResult<bool> {
        present(&self.cookie_enabled, "navigator.cookieEnabled")
    }

    fn do_not_track(&self) -> ProbeResult<Option<String>> {
        present(&self.do_not_track, "navigator.doNotTrack")
    }

    fn java_enabled(&self) -> ProbeResult<bool> {
        present(&self.java_enabled, "navigator.javaEnabled")
    }

    fn hardware_concurrency(&self) -> ProbeResult<u32> {
        present(&self.hardware_concurrency, "navigator.hardwareConcurrency")
    }

    fn device_memory(&self) -> ProbeResult<f64> {
        present(&self.device_memory, "navigator.deviceMemory")
    }

    fn connection(&self) -> ProbeResult<ConnectionInfo> {
        present(&self.connection, "navigator.connection")
    }

    fn page(&self) -> ProbeResult<PageInfo> {
        present(&self.page, "document")
    }

    fn performance(&self) -> ProbeResult<PerformanceInfo> {
        present(&self.performance, "window.performance")
    }

    fn scroll_offset(&self) -> ProbeResult<Position> {
        present(&self.scroll, "window.pageOffset")
    }

    fn render_text(&self, _request: &TextRender) -> ProbeResult<String> {
        present(&self.canvas_data_url, "canvas 2d context")
    }

    fn gl_parameters(&self) -> ProbeResult<GlParameters> {
        present(&self.webgl, "webgl context")
    }

    fn has_webrtc(&self) -> ProbeResult<bool> {
        present(&self.webrtc, "mediaDevices")
    }

    fn has_websocket(&self) -> ProbeResult<bool> {
        present(&self.websocket, "WebSocket")
    }

    fn has_local_storage(&self) -> ProbeResult<bool> {
        present(&self.local_storage, "localStorage")
    }

    fn has_session_storage(&self) -> ProbeResult<bool> {
        present(&self.session_storage, "sessionStorage")
    }

    fn supports_fetch(&self) -> bool {
        self.fetch
    }
}
