//! Raw relational pool
//!
//! Queries issued here bypass the data-access layer; faults surface as
//! [`DriverError`] and are reported with the SQLSTATE reference.

mod errors;
mod postgres;

pub use errors::DriverError;
pub use postgres::PgDriver;

use async_trait::async_trait;
use serde_json::Value;

/// Raw query access to the relational database.
#[async_trait]
pub trait SqlDriver: Send + Sync {
    /// Returns the database clock as result rows, one object per row.
    async fn now(&self) -> Result<Vec<Value>, DriverError>;

    /// Backend name for logs
    fn backend_name(&self) -> &'static str;
}

/// Driver used when no pool URL is configured; every call fails.
#[derive(Debug, Default)]
pub struct UnconfiguredDriver;

#[async_trait]
impl SqlDriver for UnconfiguredDriver {
    async fn now(&self) -> Result<Vec<Value>, DriverError> {
        Err(DriverError::unconfigured())
    }

    fn backend_name(&self) -> &'static str {
        "unconfigured"
    }
}
