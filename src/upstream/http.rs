//! reqwest-backed upstream client

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::{UpstreamClient, UpstreamError};

/// reqwest client bound to one base URL
#[derive(Debug, Clone)]
pub struct HttpUpstream {
    base_url: String,
    client: reqwest::Client,
}

impl HttpUpstream {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, UpstreamError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| UpstreamError::transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            base_url: base_url.into(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[async_trait]
impl UpstreamClient for HttpUpstream {
    async fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<Value, UpstreamError> {
        let response = self
            .client
            .get(self.url(path))
            .query(query)
            .send()
            .await
            .map_err(|e| UpstreamError::transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return response
                .json::<Value>()
                .await
                .map_err(|e| UpstreamError::transport(format!("invalid upstream response: {e}")));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| {
                UpstreamError::transport(format!("failed reading upstream error body: {e}"))
            })?;
        let body = serde_json::from_slice::<Value>(&body).ok().or_else(|| {
            (!body.is_empty()).then(|| Value::String(String::from_utf8_lossy(&body).into_owned()))
        });

        Err(UpstreamError::status(
            status.as_u16(),
            format!("Request failed with status code {}", status.as_u16()),
            body,
        ))
    }

    fn backend_name(&self) -> &'static str {
        "http"
    }
}
