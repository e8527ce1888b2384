//! Error envelope
//!
//! Every non-2xx response body has the shape
//! `{ "error": { "errors": .., "code": .., "message": .. } }`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

pub const DEFAULT_MESSAGE: &str = "Unknown Error";

/// Human-readable text, or a small object with `action`/`cause` hints
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EnvelopeMessage {
    Text(String),
    Meta(Map<String, Value>),
}

impl EnvelopeMessage {
    pub fn text(message: impl Into<String>) -> Self {
        EnvelopeMessage::Text(message.into())
    }

    /// Builds a metadata message from `(key, value)` pairs, in order.
    pub fn meta<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, String)>,
        K: Into<String>,
    {
        EnvelopeMessage::Meta(
            entries
                .into_iter()
                .map(|(key, value)| (key.into(), Value::String(value)))
                .collect(),
        )
    }
}

impl From<&str> for EnvelopeMessage {
    fn from(message: &str) -> Self {
        EnvelopeMessage::text(message)
    }
}

/// Response body for a failed request.
///
/// Building an envelope consumes the classification, and an envelope is
/// not a `Failure`, so a response is never translated twice.
#[derive(Debug, Clone, PartialEq)]
pub struct FailureEnvelope {
    pub code: u16,
    pub errors: Value,
    pub message: EnvelopeMessage,
}

impl FailureEnvelope {
    pub fn build(status: StatusCode, raw: Value, message: Option<EnvelopeMessage>) -> Self {
        Self {
            code: status.as_u16(),
            errors: raw,
            message: message.unwrap_or_else(|| EnvelopeMessage::text(DEFAULT_MESSAGE)),
        }
    }

    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl Serialize for FailureEnvelope {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Body<'a> {
            errors: &'a Value,
            code: u16,
            message: &'a EnvelopeMessage,
        }

        #[derive(Serialize)]
        struct Wrapped<'a> {
            error: Body<'a>,
        }

        Wrapped {
            error: Body {
                errors: &self.errors,
                code: self.code,
                message: &self.message,
            },
        }
        .serialize(serializer)
    }
}

impl IntoResponse for FailureEnvelope {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}
