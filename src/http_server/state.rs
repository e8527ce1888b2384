//! Shared handler state
//!
//! Collaborators are created once at startup and shared by every request.

use std::sync::Arc;

use tracing::info;

use super::config::{CacheBackend, ServerConfig, StoreBackend};
use super::server::ServerError;
use crate::cache::{CacheClient, MemoryCache, RedisCache};
use crate::driver::{PgDriver, SqlDriver, UnconfiguredDriver};
use crate::store::{MemoryStore, SqliteStore, Store};
use crate::upstream::{HttpUpstream, UnconfiguredUpstream, UpstreamClient};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub cache: Arc<dyn CacheClient>,
    pub driver: Arc<dyn SqlDriver>,
    pub upstream: Arc<dyn UpstreamClient>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn Store>,
        cache: Arc<dyn CacheClient>,
        driver: Arc<dyn SqlDriver>,
        upstream: Arc<dyn UpstreamClient>,
    ) -> Self {
        Self {
            store,
            cache,
            driver,
            upstream,
        }
    }

    /// In-memory store and cache, no pool, no upstream
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryCache::new()),
            Arc::new(UnconfiguredDriver),
            Arc::new(UnconfiguredUpstream),
        )
    }

    pub fn with_upstream(mut self, upstream: Arc<dyn UpstreamClient>) -> Self {
        self.upstream = upstream;
        self
    }

    pub fn with_driver(mut self, driver: Arc<dyn SqlDriver>) -> Self {
        self.driver = driver;
        self
    }

    /// Build every collaborator named by `config`.
    pub async fn from_config(config: &ServerConfig) -> Result<Self, ServerError> {
        let store: Arc<dyn Store> = match config.store.backend {
            StoreBackend::Memory => Arc::new(MemoryStore::new()),
            StoreBackend::Sqlite => Arc::new(
                SqliteStore::connect(&config.store.url, config.store.acquire_timeout()).await?,
            ),
        };

        let cache = build_cache(config)?;

        let driver: Arc<dyn SqlDriver> = match &config.driver.url {
            Some(url) => Arc::new(PgDriver::connect_lazy(url, config.driver.acquire_timeout())?),
            None => Arc::new(UnconfiguredDriver),
        };

        let upstream: Arc<dyn UpstreamClient> = match &config.upstream.base_url {
            Some(base_url) => Arc::new(HttpUpstream::new(
                base_url.clone(),
                config.upstream.timeout(),
            )?),
            None => Arc::new(UnconfiguredUpstream),
        };

        info!(
            store = store.backend_name(),
            cache = cache.backend_name(),
            driver = driver.backend_name(),
            upstream = upstream.backend_name(),
            "collaborators ready"
        );

        Ok(Self::new(store, cache, driver, upstream))
    }
}

/// Cache client for `config`, shared with the companion service.
pub fn build_cache(config: &ServerConfig) -> Result<Arc<dyn CacheClient>, ServerError> {
    Ok(match config.cache.backend {
        CacheBackend::Memory => Arc::new(MemoryCache::new()),
        CacheBackend::Redis => Arc::new(RedisCache::new(
            &config.cache.url,
            config.cache.connection,
            config.cache.timeout(),
        )?),
    })
}
