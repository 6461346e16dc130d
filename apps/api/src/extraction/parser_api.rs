//! Client for the external structured-parsing service. Strictly best-effort:
//! missing configuration, network failures and malformed responses all map to
//! `None` so the chain falls through to local extraction.

use bytes::Bytes;
use reqwest::Client;
use serde_json::Value;
use tracing::warn;

const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Clone)]
pub struct ParserApiClient {
    client: Client,
    url: String,
    api_key: Option<String>,
}

impl ParserApiClient {
    pub fn new(url: String, api_key: Option<String>) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .build()
                .expect("Failed to build HTTP client"),
            url,
            api_key,
        }
    }

    /// Sends the file bytes and returns the service's nested structured
    /// fields, or `None` on any failure.
    pub async fn parse(&self, bytes: Bytes, file_name: &str) -> Option<Value> {
        let mut request = self
            .client
            .post(&self.url)
            .query(&[("filename", file_name)])
            .header("content-type", "application/octet-stream")
            .body(bytes);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = match request.send().await {
            Ok(r) => r,
            Err(e) => {
                warn!("parser api request failed: {e}");
                return None;
            }
        };

        if !response.status().is_success() {
            warn!("parser api returned status {}", response.status());
            return None;
        }

        match response.json::<Value>().await {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("parser api returned malformed JSON: {e}");
                None
            }
        }
    }
}
