//! Relational driver faults

use serde::Serialize;
use thiserror::Error;

/// Connection or execution fault below the data-access layer.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{message}")]
pub struct DriverError {
    /// Driver message
    pub message: String,
    /// SQLSTATE or engine error code, when the database returned one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl DriverError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
        }
    }

    pub fn with_code(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: Some(code.into()),
        }
    }

    pub fn unconfigured() -> Self {
        Self::new("relational pool is not configured (set POSTGRES_URL)")
    }
}

impl From<sqlx::Error> for DriverError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) => match db.code() {
                Some(code) => Self::with_code(db.message(), code),
                None => Self::new(db.message()),
            },
            sqlx::Error::PoolTimedOut => Self::new("timed out acquiring a database connection"),
            _ => Self::new(err.to_string()),
        }
    }
}
