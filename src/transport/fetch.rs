//! Modern asynchronous delivery over `reqwest`.

use super::{acknowledge, Acknowledgement, TransportError, REQUEST_TIMEOUT};
use reqwest::header::CONTENT_TYPE;

/// Async HTTP delivery.
pub struct FetchTransport {
    client: reqwest::Client,
}

impl FetchTransport {
    pub fn new() -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| TransportError::Setup(e.to_string()))?;
        Ok(Self { client })
    }

    /// POST the payload as JSON and interpret the response.
    pub async fn send(
        &self,
        url: &str,
        payload: &serde_json::Value,
    ) -> Result<Acknowledgement, TransportError> {
        let body =
            serde_json::to_vec(payload).map_err(|e| TransportError::Serialization(e.to_string()))?;

        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        acknowledge(status, &bytes)
    }
}
