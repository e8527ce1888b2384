//! Failure classification
//!
//! | Failure        | Status              | Message                         |
//! |----------------|---------------------|---------------------------------|
//! | MalformedJson  | 400                 | "Malformed JSON"                |
//! | Validation     | 422                 | "Validation Error"              |
//! | Known          | 422, 404 for P2025  | `{action}`                      |
//! | InvalidQuery   | 422                 | `{action}`                      |
//! | Driver         | 500                 | `{cause, action}`               |
//! | Upstream       | upstream or 500     | `{cause}`                       |
//! | Cache          | 404 missing, or 500 | `{cause}`                       |
//! | Unknown        | preset or 500       | "Unknown Error"                 |

use axum::http::StatusCode;
use serde::Serialize;
use serde_json::Value;

use super::envelope::{EnvelopeMessage, FailureEnvelope, DEFAULT_MESSAGE};
use super::Failure;
use crate::store::KnownErrorCode;

const KNOWN_ERROR_REFERENCE: &str = "https://www.prisma.io/docs/orm/reference/error-reference";
const QUERY_VALIDATION_REFERENCE: &str =
    "https://www.prisma.io/docs/orm/reference/error-reference#prismaclientvalidationerror";
const DRIVER_ERROR_REFERENCE: &str = "https://www.postgresql.org/docs/current/errcodes-appendix.html";

/// Normalized failure category
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorCategory {
    TransportMalformed,
    ValidationFailure,
    OrmKnownError { code: KnownErrorCode },
    OrmSchemaError,
    DriverError { message: String },
    CacheError { message: String },
    UpstreamHttpError { status: Option<u16>, message: String },
    Unknown,
}

impl ErrorCategory {
    pub fn name(&self) -> &'static str {
        match self {
            ErrorCategory::TransportMalformed => "transport_malformed",
            ErrorCategory::ValidationFailure => "validation_failure",
            ErrorCategory::OrmKnownError { .. } => "orm_known_error",
            ErrorCategory::OrmSchemaError => "orm_schema_error",
            ErrorCategory::DriverError { .. } => "driver_error",
            ErrorCategory::CacheError { .. } => "cache_error",
            ErrorCategory::UpstreamHttpError { .. } => "upstream_http_error",
            ErrorCategory::Unknown => "unknown",
        }
    }
}

/// Outcome of [`classify`]
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub category: ErrorCategory,
    pub status: StatusCode,
    /// Serialized failure
    pub errors: Value,
    pub message: EnvelopeMessage,
}

impl Classification {
    pub fn into_envelope(self) -> FailureEnvelope {
        FailureEnvelope::build(self.status, self.errors, Some(self.message))
    }
}

fn payload<T: Serialize + ToString>(err: &T) -> Value {
    serde_json::to_value(err).unwrap_or_else(|_| Value::String(err.to_string()))
}

fn upstream_status(status: Option<u16>) -> StatusCode {
    status
        .and_then(|code| StatusCode::from_u16(code).ok())
        .filter(|code| code.is_client_error() || code.is_server_error())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

/// Map a failure to its category, status and envelope parts. Total.
pub fn classify(failure: Failure) -> Classification {
    match failure {
        Failure::MalformedJson(err) => Classification {
            category: ErrorCategory::TransportMalformed,
            status: StatusCode::BAD_REQUEST,
            errors: payload(&err),
            message: EnvelopeMessage::text("Malformed JSON"),
        },
        Failure::Validation(result) => Classification {
            category: ErrorCategory::ValidationFailure,
            status: StatusCode::UNPROCESSABLE_ENTITY,
            errors: payload(&result),
            message: EnvelopeMessage::text("Validation Error"),
        },
        Failure::Known(err) => {
            let status = if err.code.is_not_found() {
                StatusCode::NOT_FOUND
            } else {
                StatusCode::UNPROCESSABLE_ENTITY
            };
            Classification {
                category: ErrorCategory::OrmKnownError { code: err.code },
                status,
                message: EnvelopeMessage::meta([(
                    "action",
                    format!("{}#{}", KNOWN_ERROR_REFERENCE, err.code),
                )]),
                errors: payload(&err),
            }
        }
        Failure::InvalidQuery(err) => Classification {
            category: ErrorCategory::OrmSchemaError,
            status: StatusCode::UNPROCESSABLE_ENTITY,
            errors: payload(&err),
            message: EnvelopeMessage::meta([("action", QUERY_VALIDATION_REFERENCE.to_string())]),
        },
        Failure::Driver(err) => Classification {
            category: ErrorCategory::DriverError {
                message: err.message.clone(),
            },
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: EnvelopeMessage::meta([
                ("cause", err.message.clone()),
                ("action", DRIVER_ERROR_REFERENCE.to_string()),
            ]),
            errors: payload(&err),
        },
        Failure::Upstream(err) => Classification {
            category: ErrorCategory::UpstreamHttpError {
                status: err.status,
                message: err.message.clone(),
            },
            status: upstream_status(err.status),
            message: EnvelopeMessage::meta([("cause", err.message.clone())]),
            errors: payload(&err),
        },
        Failure::Cache(err) => {
            let status = if err.is_key_not_found() {
                StatusCode::NOT_FOUND
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            Classification {
                category: ErrorCategory::CacheError {
                    message: err.message.clone(),
                },
                status,
                message: EnvelopeMessage::meta([("cause", err.message.clone())]),
                errors: payload(&err),
            }
        }
        Failure::Unknown(err) => Classification {
            category: ErrorCategory::Unknown,
            status: err.status.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            errors: err.raw,
            message: EnvelopeMessage::text(DEFAULT_MESSAGE),
        },
    }
}
