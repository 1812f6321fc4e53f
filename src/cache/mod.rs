//! Cache Store: fast, TTL-bounded key/value storage
//!
//! A read failure is distinct from a miss: `get` returns `Ok(None)` on a miss
//! and `Err` only when the backend itself failed.

use std::time::Duration;

use async_trait::async_trait;

use crate::errors::CacheResult;

pub mod lru_store;

pub use lru_store::LruCacheStore;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    async fn set(&self, key: &str, value: String, ttl: Duration) -> CacheResult<()>;

    async fn delete(&self, key: &str) -> CacheResult<()>;
}
