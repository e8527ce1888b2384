//! Postgres pool backed by sqlx

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;

use super::{DriverError, SqlDriver};

/// Postgres connection pool, created once at startup.
///
/// The pool connects lazily, so a database that is down at boot surfaces
/// as a driver fault on first use rather than a startup failure.
#[derive(Debug, Clone)]
pub struct PgDriver {
    pool: PgPool,
}

impl PgDriver {
    pub fn connect_lazy(url: &str, acquire_timeout: Duration) -> Result<Self, DriverError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(acquire_timeout)
            .connect_lazy(url)?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl SqlDriver for PgDriver {
    async fn now(&self) -> Result<Vec<Value>, DriverError> {
        let rows = sqlx::query("SELECT NOW() AS now")
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| {
                let now: DateTime<Utc> = row.try_get("now")?;
                Ok(json!({ "now": now }))
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()
            .map_err(DriverError::from)
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
