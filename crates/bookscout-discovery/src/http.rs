use std::time::Duration;

use serde_json::Value;

use crate::error::{DiscoveryError, Result};

const USER_AGENT: &str = "bookscout/0.1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

// ─── ApiClient ──────────────────────────────────────────────

/// Thin JSON GET client shared by every source.
///
/// Each request is attempted exactly once; the pipeline has no retry policy.
/// Failures surface as [`DiscoveryError`] for the caller to absorb or
/// propagate.
pub struct ApiClient {
    client: reqwest::Client,
}

impl ApiClient {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .gzip(true)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("failed to build reqwest client");
        Self { client }
    }

    /// GET a URL and parse the body as JSON. Non-success statuses become
    /// [`DiscoveryError::Api`] with the body text attached.
    pub async fn get_json(&self, url: &str) -> Result<Value> {
        tracing::debug!("GET {url}");
        let resp = self.client.get(url).send().await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(DiscoveryError::Api(
                url.to_string(),
                format!("HTTP {status}: {body}"),
            ));
        }

        let text = resp.text().await?;
        serde_json::from_str(&text).map_err(|e| DiscoveryError::Parse(e.to_string()))
    }
}

impl Default for ApiClient {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Tests ──────────────────────────────────────────────────
