//! Delivery of payloads to the collection endpoint.
//!
//! Two mechanisms share one contract: [`Transport::send`] issues exactly one
//! POST with a JSON body and reports an [`Acknowledgement`] on HTTP 200 with
//! a JSON body, or a [`TransportError`] otherwise. The mechanism is chosen
//! once, at construction, from the environment's capabilities.

pub mod fetch;
pub mod legacy;

pub use fetch::FetchTransport;
pub use legacy::{Completion, LegacyRequest, LegacyTransport, ReadyState};

use crate::environment::Environment;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Per-request timeout for both mechanisms.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Build the target URL: `server` without one trailing slash, then `endpoint`.
pub fn target_url(server: &str, endpoint: &str) -> String {
    let base = server.strip_suffix('/').unwrap_or(server);
    format!("{base}{endpoint}")
}

/// The JSON body the sink returned on success; not otherwise interpreted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Acknowledgement(pub serde_json::Value);

/// Why a delivery failed.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The HTTP client could not be created
    #[error("transport setup failed: {0}")]
    Setup(String),
    /// Connection, DNS or timeout failure
    #[error("network error: {0}")]
    Network(String),
    /// The sink answered with a status other than 200
    #[error("server responded with status {0}")]
    Status(u16),
    /// The response body was not JSON
    #[error("malformed response: {0}")]
    Decode(String),
    /// The payload could not be serialized
    #[error("serialization error: {0}")]
    Serialization(String),
    /// The legacy worker is gone
    #[error("request worker unavailable")]
    WorkerGone,
}

/// Which delivery mechanism is in use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    Fetch,
    Legacy,
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportKind::Fetch => write!(f, "fetch"),
            TransportKind::Legacy => write!(f, "legacy"),
        }
    }
}

/// A delivery mechanism.
pub enum Transport {
    Fetch(FetchTransport),
    Legacy(LegacyTransport),
}

impl Transport {
    /// Pick the modern mechanism when available, the legacy one otherwise.
    pub fn detect(env: &dyn Environment) -> Result<Self, TransportError> {
        if env.supports_fetch() {
            Ok(Transport::Fetch(FetchTransport::new()?))
        } else {
            Ok(Transport::Legacy(LegacyTransport::new()))
        }
    }

    pub fn kind(&self) -> TransportKind {
        match self {
            Transport::Fetch(_) => TransportKind::Fetch,
            Transport::Legacy(_) => TransportKind::Legacy,
        }
    }

    /// POST `payload` to `url` and wait for the outcome.
    pub async fn send(
        &self,
        url: &str,
        payload: &serde_json::Value,
    ) -> Result<Acknowledgement, TransportError> {
        match self {
            Transport::Fetch(fetch) => fetch.send(url, payload).await,
            Transport::Legacy(legacy) => legacy.send(url, payload).await,
        }
    }
}

/// Shared success rule: exactly 200 and a JSON body.
pub(crate) fn acknowledge(status: u16, body: &[u8]) -> Result<Acknowledgement, TransportError> {
    if status != 200 {
        return Err(TransportError::Status(status));
    }
    serde_json::from_slice(body)
        .map(Acknowledgement)
        .map_err(|e| TransportError::Decode(e.to_string()))
}
