//! Data-access layer errors
//!
//! Known request errors carry stable codes:
//! - P2002 unique constraint failed (422)
//! - P2003 foreign key constraint failed (422)
//! - P2011 null constraint violation (422)
//! - P2025 record required by the operation not found (404)
//!
//! Malformed query construction is a [`QueryValidationError`]. Faults below
//! the data-access layer are passed through as [`DriverError`].

use std::fmt;

use serde::{Serialize, Serializer};
use serde_json::{json, Value};
use thiserror::Error;

use crate::driver::DriverError;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Known request error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KnownErrorCode {
    UniqueConstraint,
    ForeignKeyConstraint,
    NullConstraint,
    RecordNotFound,
}

impl KnownErrorCode {
    /// Returns the stable string code
    pub fn as_str(&self) -> &'static str {
        match self {
            KnownErrorCode::UniqueConstraint => "P2002",
            KnownErrorCode::ForeignKeyConstraint => "P2003",
            KnownErrorCode::NullConstraint => "P2011",
            KnownErrorCode::RecordNotFound => "P2025",
        }
    }

    /// Returns whether the code means the record to operate on is missing
    pub fn is_not_found(&self) -> bool {
        matches!(self, KnownErrorCode::RecordNotFound)
    }
}

impl fmt::Display for KnownErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for KnownErrorCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Constraint or lookup failure reported by the data-access layer.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[error("{message}")]
#[serde(tag = "name", rename = "KnownRequestError")]
pub struct KnownRequestError {
    pub code: KnownErrorCode,
    pub message: String,
    pub meta: Value,
}

impl KnownRequestError {
    pub fn new(code: KnownErrorCode, message: impl Into<String>, meta: Value) -> Self {
        Self {
            code,
            message: message.into(),
            meta,
        }
    }

    /// P2025: the record an operation depends on does not exist
    pub fn not_found(model: &str, cause: &str) -> Self {
        Self::new(
            KnownErrorCode::RecordNotFound,
            format!(
                "An operation failed because it depends on one or more records that were required but not found. {}",
                cause
            ),
            json!({ "modelName": model, "cause": cause }),
        )
    }

    /// P2002: a unique constraint rejected the write
    pub fn unique_violation(model: &str, target: Vec<String>) -> Self {
        let fields = target
            .iter()
            .map(|field| format!("`{}`", field))
            .collect::<Vec<_>>()
            .join(",");
        Self::new(
            KnownErrorCode::UniqueConstraint,
            format!("Unique constraint failed on the fields: ({})", fields),
            json!({ "modelName": model, "target": target }),
        )
    }

    /// P2003: a foreign key constraint rejected the write
    pub fn foreign_key_violation(model: &str, detail: &str) -> Self {
        Self::new(
            KnownErrorCode::ForeignKeyConstraint,
            format!("Foreign key constraint failed: {}", detail),
            json!({ "modelName": model, "field_name": detail }),
        )
    }

    /// P2011: a required column received NULL
    pub fn null_violation(model: &str, detail: &str) -> Self {
        Self::new(
            KnownErrorCode::NullConstraint,
            format!("Null constraint violation: {}", detail),
            json!({ "modelName": model, "constraint": detail }),
        )
    }
}

/// Malformed or unsupported query construction.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{message}")]
#[serde(tag = "name", rename = "QueryValidationError")]
pub struct QueryValidationError {
    pub message: String,
}

impl QueryValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// An argument value the query cannot express
    pub fn invalid_argument(argument: &str, reason: &str) -> Self {
        Self::new(format!("Invalid value for argument `{}`: {}", argument, reason))
    }
}

/// Store errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    /// Constraint or lookup failure with a known code
    #[error(transparent)]
    Known(#[from] KnownRequestError),

    /// Query could not be constructed
    #[error(transparent)]
    InvalidQuery(#[from] QueryValidationError),

    /// Fault below the data-access layer
    #[error(transparent)]
    Driver(#[from] DriverError),
}

#[cfg(test)]
impl StoreError {
    /// Returns the known code, if any
    pub fn known_code(&self) -> Option<KnownErrorCode> {
        match self {
            StoreError::Known(err) => Some(err.code),
            _ => None,
        }
    }
}
