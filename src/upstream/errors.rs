//! Upstream error type
//!
//! Carries the upstream status and body so the proxy can mirror them.

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Failed call to the upstream HTTP service.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[error("{message}")]
pub struct UpstreamError {
    /// Status returned by the upstream, absent for transport failures
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    pub message: String,
    /// Upstream response body, JSON when it parsed as JSON
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl UpstreamError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
            body: None,
        }
    }

    pub fn status(status: u16, message: impl Into<String>, body: Option<Value>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
            body,
        }
    }

    pub fn unconfigured() -> Self {
        Self::transport("upstream API is not configured (set REDIS_API_URL)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_error_serialization() {
        let err = UpstreamError::status(
            404,
            "Request failed with status code 404",
            Some(json!({"message": "missing"})),
        );
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["status"], 404);
        assert_eq!(json["body"]["message"], "missing");
    }

    #[test]
    fn test_transport_error_has_no_status() {
        let json = serde_json::to_value(UpstreamError::transport("connection refused")).unwrap();
        assert!(json.get("status").is_none());
        assert!(json.get("body").is_none());
    }
}
