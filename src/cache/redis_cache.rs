//! Redis-backed cache client

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::FromRedisValue;
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;
use tokio::time::timeout;

use super::{CacheClient, CacheError, CacheResult};

/// How commands obtain a server connection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheConnectMode {
    /// One managed connection, opened on first use and reconnected on failure
    #[default]
    Shared,
    /// A fresh connection for every command
    PerRequest,
}

pub struct RedisCache {
    client: redis::Client,
    mode: CacheConnectMode,
    timeout: Duration,
    shared: OnceCell<ConnectionManager>,
}

impl RedisCache {
    /// Parses `url` without connecting.
    pub fn new(url: &str, mode: CacheConnectMode, timeout: Duration) -> CacheResult<Self> {
        let client = redis::Client::open(url)?;
        Ok(Self {
            client,
            mode,
            timeout,
            shared: OnceCell::new(),
        })
    }

    async fn shared_connection(&self) -> redis::RedisResult<ConnectionManager> {
        let manager = self
            .shared
            .get_or_try_init(|| ConnectionManager::new(self.client.clone()))
            .await?;
        Ok(manager.clone())
    }

    async fn exec<T: FromRedisValue>(&self, cmd: redis::Cmd) -> CacheResult<T> {
        let call = async {
            match self.mode {
                CacheConnectMode::Shared => {
                    let mut conn = self.shared_connection().await?;
                    let reply: redis::RedisResult<T> = cmd.query_async(&mut conn).await;
                    reply
                }
                CacheConnectMode::PerRequest => {
                    let mut conn = self.client.get_multiplexed_async_connection().await?;
                    let reply: redis::RedisResult<T> = cmd.query_async(&mut conn).await;
                    reply
                }
            }
        };

        match timeout(self.timeout, call).await {
            Ok(result) => result.map_err(CacheError::from),
            Err(_) => Err(CacheError::timeout(self.timeout.as_millis())),
        }
    }
}

impl std::fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCache")
            .field("mode", &self.mode)
            .field("timeout", &self.timeout)
            .field("connected", &self.shared.initialized())
            .finish()
    }
}

#[async_trait]
impl CacheClient for RedisCache {
    async fn get(&self, key: &str) -> CacheResult<String> {
        let mut cmd = redis::cmd("GET");
        cmd.arg(key);
        match self.exec::<Option<String>>(cmd).await? {
            Some(value) if !value.is_empty() => Ok(value),
            _ => Err(CacheError::key_not_found(key)),
        }
    }

    async fn set(&self, key: &str, value: &str) -> CacheResult<()> {
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value);
        self.exec::<()>(cmd).await
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        let mut cmd = redis::cmd("DEL");
        cmd.arg(key);
        match self.exec::<i64>(cmd).await? {
            0 => Err(CacheError::key_not_found(key)),
            _ => Ok(()),
        }
    }

    async fn keys(&self) -> CacheResult<Vec<String>> {
        let mut cmd = redis::cmd("KEYS");
        cmd.arg("*");
        let mut keys = self.exec::<Vec<String>>(cmd).await?;
        keys.sort();
        Ok(keys)
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}
