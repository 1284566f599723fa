//! Derived fingerprint values.
//!
//! Three independent, best-effort correlation strings. They are stable for
//! unchanged inputs but carry no uniqueness or cryptographic guarantee.
//!
//! The composite fingerprint joins, in this order and with `|`:
//!
//! 1. user agent
//! 2. language tag
//! 3. `<width>x<height>` screen resolution
//! 4. timezone offset in minutes
//! 5. platform
//! 6. cookie-enabled flag (`true`/`false`)
//! 7. do-not-track value
//!
//! An absent component contributes an empty string. The joined text is
//! base64-encoded over its Latin-1 bytes and cut to the first 32 characters.
//! Changing the order or delimiter changes every fingerprint ever issued.

use super::read;
use crate::environment::{Environment, ProbeError, TextRender};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Sentinel for fingerprints that could not be derived.
pub const UNAVAILABLE: &str = "unavailable";

/// Component delimiter.
pub const DELIMITER: &str = "|";

/// Number of characters kept from each fingerprint.
pub const FINGERPRINT_LEN: usize = 32;

/// What is drawn onto the offscreen canvas.
pub const CANVAS_PROBE: TextRender = TextRender {
    text: "Canvas fingerprint test 🎨",
    font: "14px Arial",
    baseline: "top",
    x: 2.0,
    y: 2.0,
};

/// Base64 over Latin-1 bytes; characters above U+00FF cannot be encoded.
pub fn latin1_base64(input: &str) -> Result<String, ProbeError> {
    let bytes = input
        .chars()
        .map(|c| {
            u8::try_from(u32::from(c))
                .map_err(|_| ProbeError::Encoding(format!("character {c:?} is outside Latin-1")))
        })
        .collect::<Result<Vec<u8>, _>>()?;
    Ok(STANDARD.encode(bytes))
}

fn head(s: &str, n: usize) -> String {
    s.chars().take(n).collect()
}

fn tail(s: &str, n: usize) -> String {
    let len = s.chars().count();
    s.chars().skip(len.saturating_sub(n)).collect()
}

/// The ordered components of the composite fingerprint.
pub fn composite_components(env: &dyn Environment) -> [String; 7] {
    let flag = |value: Option<bool>| value.map(|b| b.to_string()).unwrap_or_default();

    [
        read(env.user_agent()).unwrap_or_default(),
        read(env.language()).unwrap_or_default(),
        read(env.screen())
            .map(|s| format!("{}x{}", s.width, s.height))
            .unwrap_or_default(),
        read(env.timezone_offset_minutes())
            .map(|m| m.to_string())
            .unwrap_or_default(),
        read(env.platform()).unwrap_or_default(),
        flag(read(env.cookie_enabled())),
        read(env.do_not_track()).flatten().unwrap_or_default(),
    ]
}

/// Lightweight composite fingerprint of navigator and screen facts.
pub fn composite_fingerprint(env: &dyn Environment) -> String {
    let joined = composite_components(env).join(DELIMITER);
    match latin1_base64(&joined) {
        Ok(encoded) => head(&encoded, FINGERPRINT_LEN),
        Err(e) => {
            tracing::debug!("composite fingerprint unavailable: {e}");
            UNAVAILABLE.to_string()
        }
    }
}

/// Trailing characters of the canvas data URL for [`CANVAS_PROBE`].
pub fn canvas_fingerprint(env: &dyn Environment) -> String {
    read(env.render_text(&CANVAS_PROBE))
        .map(|data_url| tail(&data_url, FINGERPRINT_LEN))
        .unwrap_or_else(|| UNAVAILABLE.to_string())
}

/// Trailing characters of the encoded WebGL `vendor|renderer` pair.
pub fn webgl_fingerprint(env: &dyn Environment) -> String {
    read(env.gl_parameters())
        .and_then(|gl| read(latin1_base64(&format!("{}{DELIMITER}{}", gl.vendor, gl.renderer))))
        .map(|encoded| tail(&encoded, FINGERPRINT_LEN))
        .unwrap_or_else(|| UNAVAILABLE.to_string())
}
