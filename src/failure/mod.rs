//! Failure taxonomy and response translation
//!
//! Every stage of a request (body parsing, validation, store, cache,
//! driver and upstream calls) reports a [`Failure`]. Its `IntoResponse`
//! impl is the single place where status codes and response bodies for
//! failures are decided.

mod classify;
mod envelope;

pub use classify::{classify, Classification, ErrorCategory};
pub use envelope::{EnvelopeMessage, FailureEnvelope, DEFAULT_MESSAGE};

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::cache::CacheError;
use crate::driver::DriverError;
use crate::schema::ValidationResult;
use crate::store::{KnownRequestError, QueryValidationError, StoreError};
use crate::upstream::UpstreamError;

/// Request body that is not valid JSON
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{message}")]
pub struct MalformedJson {
    pub message: String,
}

impl MalformedJson {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Failure with no dedicated category
#[derive(Debug, Clone, PartialEq, Error)]
#[error("unclassified failure: {raw}")]
pub struct UnknownFailure {
    /// Status already chosen by the stage that failed
    pub status: Option<StatusCode>,
    pub raw: Value,
}

impl UnknownFailure {
    pub fn new(raw: Value) -> Self {
        Self { status: None, raw }
    }

    pub fn with_status(status: StatusCode, raw: Value) -> Self {
        Self {
            status: Some(status),
            raw,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Failure {
    #[error("malformed JSON: {0}")]
    MalformedJson(#[from] MalformedJson),

    #[error("validation failed: {0}")]
    Validation(#[from] ValidationResult),

    #[error("known request error {}: {}", .0.code, .0.message)]
    Known(#[from] KnownRequestError),

    #[error("invalid query: {0}")]
    InvalidQuery(#[from] QueryValidationError),

    #[error("driver error: {0}")]
    Driver(#[from] DriverError),

    #[error("cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("upstream error: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("{0}")]
    Unknown(#[from] UnknownFailure),
}

impl From<StoreError> for Failure {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Known(err) => Failure::Known(err),
            StoreError::InvalidQuery(err) => Failure::InvalidQuery(err),
            StoreError::Driver(err) => Failure::Driver(err),
        }
    }
}

impl IntoResponse for Failure {
    fn into_response(self) -> Response {
        let classification = classify(self);
        let status = classification.status.as_u16();
        let category = classification.category.name();
        if classification.status.is_server_error() {
            tracing::error!(category, status, errors = %classification.errors, "request failed");
        } else {
            tracing::warn!(category, status, "request rejected");
        }
        classification.into_envelope().into_response()
    }
}
