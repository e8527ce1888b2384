//! Outbound HTTP proxy to the companion cache API

mod errors;
mod http;

pub use errors::UpstreamError;
pub use http::HttpUpstream;

use async_trait::async_trait;
use serde_json::Value;

#[async_trait]
pub trait UpstreamClient: Send + Sync {
    /// GET `path` with `query` pairs, returning the decoded JSON body.
    async fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<Value, UpstreamError>;

    fn backend_name(&self) -> &'static str;
}

/// Used when no upstream base URL is configured; every call fails.
#[derive(Debug, Default)]
pub struct UnconfiguredUpstream;

#[async_trait]
impl UpstreamClient for UnconfiguredUpstream {
    async fn get(&self, _path: &str, _query: &[(&str, &str)]) -> Result<Value, UpstreamError> {
        Err(UpstreamError::unconfigured())
    }

    fn backend_name(&self) -> &'static str {
        "unconfigured"
    }
}
