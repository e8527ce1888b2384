use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{CacheClient, CacheError, CacheResult};

/// Cache held in process memory
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheClient for MemoryCache {
    async fn get(&self, key: &str) -> CacheResult<String> {
        let entries = self.entries.read().await;
        match entries.get(key) {
            Some(value) if !value.is_empty() => Ok(value.clone()),
            _ => Err(CacheError::key_not_found(key)),
        }
    }

    async fn set(&self, key: &str, value: &str) -> CacheResult<()> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        match self.entries.write().await.remove(key) {
            Some(_) => Ok(()),
            None => Err(CacheError::key_not_found(key)),
        }
    }

    async fn keys(&self) -> CacheResult<Vec<String>> {
        Ok(self.entries.read().await.keys().cloned().collect())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
