//! Environment backed by the running process.
//!
//! Navigator-style facts are derived from the operating system, locale and
//! clock of the host. There is no display or GPU surface, so screen, canvas
//! and WebGL facets report as unsupported.

use super::{Environment, PageInfo, ProbeError, ProbeResult};
use chrono::{Local, Offset};
use chrono_tz::Tz;
use std::path::Path;

/// Environment describing the local process and machine.
#[derive(Debug, Clone)]
pub struct HostEnvironment {
    page: Option<PageInfo>,
    fetch: bool,
}

impl Default for HostEnvironment {
    fn default() -> Self {
        Self::new()
    }
}

impl HostEnvironment {
    pub fn new() -> Self {
        Self {
            page: None,
            fetch: true,
        }
    }

    /// Attach a page context (url, referrer, title).
    pub fn with_page(mut self, page: PageInfo) -> Self {
        self.page = Some(page);
        self
    }

    /// Report fetch as unavailable, forcing the legacy transport.
    pub fn without_fetch(mut self) -> Self {
        self.fetch = false;
        self
    }
}

/// Human-readable OS name used in the user agent.
fn os_title() -> &'static str {
    match std::env::consts::OS {
        "windows" => "Windows",
        "macos" => "Darwin",
        "linux" => "Linux",
        "android" => "Android",
        "ios" => "iOS",
        other => other,
    }
}

/// Convert a POSIX locale (`en_US.UTF-8`) to a BCP 47 tag (`en-US`).
pub(crate) fn locale_to_tag(locale: &str) -> Option<String> {
    let base = locale.split(['.', '@']).next()?.trim();
    if base.is_empty() || base == "C" || base == "POSIX" {
        return None;
    }
    Some(base.replace('_', "-"))
}

/// Extract an IANA zone name from a zoneinfo path.
pub(crate) fn zone_from_path(path: &Path) -> Option<Tz> {
    let text = path.to_string_lossy();
    let (_, name) = text.split_once("zoneinfo/")?;
    name.parse::<Tz>().ok()
}

impl Environment for HostEnvironment {
    fn user_agent(&self) -> ProbeResult<String> {
        Ok(format!(
            "AnalyticsCollector/{} ({}; {})",
            crate::VERSION,
            os_title(),
            std::env::consts::ARCH
        ))
    }

    fn platform(&self) -> ProbeResult<String> {
        Ok(match std::env::consts::OS {
            "windows" => "Win32".to_string(),
            "macos" => "MacIntel".to_string(),
            "linux" => format!("Linux {}", std::env::consts::ARCH),
            other => other.to_string(),
        })
    }

    fn language(&self) -> ProbeResult<String> {
        ["LC_ALL", "LC_MESSAGES", "LANG"]
            .iter()
            .filter_map(|key| std::env::var(key).ok())
            .find_map(|value| locale_to_tag(&value))
            .ok_or(ProbeError::Unsupported("locale"))
    }

    fn languages(&self) -> ProbeResult<Vec<String>> {
        if let Ok(list) = std::env::var("LANGUAGE") {
            let tags: Vec<String> = list.split(':').filter_map(locale_to_tag).collect();
            if !tags.is_empty() {
                return Ok(tags);
            }
        }
        self.language().map(|tag| vec![tag])
    }

    fn timezone_name(&self) -> ProbeResult<String> {
        if let Ok(tz) = std::env::var("TZ") {
            let name = tz.trim_start_matches(':');
            return name
                .parse::<Tz>()
                .map(|zone| zone.name().to_string())
                .map_err(|e| ProbeError::Failed {
                    facet: "TZ",
                    reason: e.to_string(),
                });
        }

        std::fs::read_link("/etc/localtime")
            .ok()
            .and_then(|target| zone_from_path(&target))
            .map(|zone| zone.name().to_string())
            .ok_or(ProbeError::Unsupported("timezone database"))
    }

    fn timezone_offset_minutes(&self) -> ProbeResult<i32> {
        let offset = Local::now().offset().fix().local_minus_utc();
        Ok(-offset / 60)
    }

    fn do_not_track(&self) -> ProbeResult<Option<String>> {
        Ok(None)
    }

    fn java_enabled(&self) -> ProbeResult<bool> {
        Ok(false)
    }

    fn hardware_concurrency(&self) -> ProbeResult<u32> {
        std::thread::available_parallelism()
            .map(|n| n.get() as u32)
            .map_err(|e| ProbeError::Failed {
                facet: "available_parallelism",
                reason: e.to_string(),
            })
    }

    fn page(&self) -> ProbeResult<PageInfo> {
        self.page.clone().ok_or(ProbeError::Unsupported("document"))
    }

    fn has_local_storage(&self) -> ProbeResult<bool> {
        Ok(dirs::data_local_dir().is_some_and(|dir| dir.exists()))
    }

    fn has_session_storage(&self) -> ProbeResult<bool> {
        Ok(std::env::temp_dir().exists())
    }

    fn supports_fetch(&self) -> bool {
        self.fetch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_locale_to_tag() {
        assert_eq!(locale_to_tag("en_US.UTF-8").as_deref(), Some("en-US"));
        assert_eq!(locale_to_tag("de_DE@euro").as_deref(), Some("de-DE"));
        assert_eq!(locale_to_tag("fr").as_deref(), Some("fr"));
        assert_eq!(locale_to_tag("C"), None);
        assert_eq!(locale_to_tag("POSIX"), None);
        assert_eq!(locale_to_tag(""), None);
    }

    #[test]
    fn test_zone_from_path() {
        let path = PathBuf::from("/usr/share/zoneinfo/Europe/Berlin");
        assert_eq!(zone_from_path(&path), Some(Tz::Europe__Berlin));
        assert_eq!(zone_from_path(Path::new("/etc/localtime")), None);
    }

    #[test]
    fn test_host_reports_identity() {
        let env = HostEnvironment::new();
        let ua = env.user_agent().unwrap();
        assert!(ua.starts_with("AnalyticsCollector/"));
        assert!(!env.platform().unwrap().is_empty());
        assert!(env.hardware_concurrency().unwrap() >= 1);
    }

    #[test]
    fn test_host_has_no_render_surface() {
        let env = HostEnvironment::new();
        assert!(env.screen().is_err());
        assert!(env.gl_parameters().is_err());
    }

    #[test]
    fn test_fetch_toggle() {
        assert!(HostEnvironment::new().supports_fetch());
        assert!(!HostEnvironment::new().without_fetch().supports_fetch());
    }

    #[test]
    fn test_page_context() {
        let env = HostEnvironment::new();
        assert!(env.page().is_err());

        let env = env.with_page(PageInfo {
            url: Some("app://local/".into()),
            referrer: None,
            title: Some("Local".into()),
        });
        assert_eq!(env.page().unwrap().title.as_deref(), Some("Local"));
    }
}
