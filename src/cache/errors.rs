//! Cache client errors

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Broad class of a cache failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheErrorKind {
    /// Could not reach the server
    Connection,
    /// The call exceeded its deadline
    Timeout,
    /// The server rejected the command
    Command,
    /// The key does not exist or holds no value
    KeyNotFound,
}

impl fmt::Display for CacheErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CacheErrorKind::Connection => "connection",
            CacheErrorKind::Timeout => "timeout",
            CacheErrorKind::Command => "command",
            CacheErrorKind::KeyNotFound => "key_not_found",
        };
        f.write_str(name)
    }
}

/// Failure reported by a [`CacheClient`](super::CacheClient).
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{message}")]
pub struct CacheError {
    pub kind: CacheErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

impl CacheError {
    pub fn new(kind: CacheErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            key: None,
        }
    }

    pub fn key_not_found(key: &str) -> Self {
        Self {
            kind: CacheErrorKind::KeyNotFound,
            message: format!("Key '{}' not found", key),
            key: Some(key.to_string()),
        }
    }

    pub fn timeout(after_ms: u128) -> Self {
        Self::new(
            CacheErrorKind::Timeout,
            format!("cache call timed out after {}ms", after_ms),
        )
    }

    pub fn is_key_not_found(&self) -> bool {
        self.kind == CacheErrorKind::KeyNotFound
    }
}

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        let kind = if err.is_timeout() {
            CacheErrorKind::Timeout
        } else if err.is_io_error() || err.is_connection_refusal() || err.is_connection_dropped() {
            CacheErrorKind::Connection
        } else {
            CacheErrorKind::Command
        };
        Self::new(kind, err.to_string())
    }
}
