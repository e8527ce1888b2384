//! Key-value cache pass-through
//!
//! Values are plain strings. A missing key, or a key holding an empty
//! value, is reported as [`CacheErrorKind::KeyNotFound`].

mod errors;
mod memory;
mod redis_cache;

pub use errors::{CacheError, CacheErrorKind};
pub use memory::MemoryCache;
pub use redis_cache::{CacheConnectMode, RedisCache};

use async_trait::async_trait;

pub type CacheResult<T> = Result<T, CacheError>;

#[async_trait]
pub trait CacheClient: Send + Sync {
    async fn get(&self, key: &str) -> CacheResult<String>;

    async fn set(&self, key: &str, value: &str) -> CacheResult<()>;

    /// Remove `key`; fails with `KeyNotFound` when nothing was removed.
    async fn delete(&self, key: &str) -> CacheResult<()>;

    /// All keys, sorted
    async fn keys(&self) -> CacheResult<Vec<String>>;

    fn backend_name(&self) -> &'static str;
}
