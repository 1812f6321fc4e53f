//! Cache-aside reads of image records
//!
//! Misses fall through to the Metadata Store and populate the cache with a
//! fixed TTL. A failed cache *read* is fatal (fail-closed); a failed cache
//! *write* is logged and the record is still returned. Concurrent misses on
//! the same id may both populate the cache, which is harmless since they
//! write the same value.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, warn};

use crate::cache::CacheStore;
use crate::config::CacheConfig;
use crate::errors::{AppError, AppResult};
use crate::models::ImageRecord;
use crate::repositories::ImageRepository;

/// Lifetime of a cached record; not configurable
pub const CACHE_ENTRY_TTL: Duration = Duration::from_secs(15 * 60);

pub fn cache_key(image_id: i64) -> String {
    format!("image-{image_id}")
}

pub struct CacheAsideResolver {
    repository: Arc<dyn ImageRepository>,
    cache: Arc<dyn CacheStore>,
    settings: CacheConfig,
}

impl CacheAsideResolver {
    pub fn new(
        repository: Arc<dyn ImageRepository>,
        cache: Arc<dyn CacheStore>,
        settings: CacheConfig,
    ) -> Self {
        Self {
            repository,
            cache,
            settings,
        }
    }

    pub async fn resolve(&self, image_id: i64) -> AppResult<ImageRecord> {
        if !self.settings.enabled {
            return Ok(self.repository.get_by_id(image_id).await?);
        }

        let key = cache_key(image_id);
        let cached = self.cache.get(&key).await.map_err(|e| {
            error!(image_id, error = %e, "cache read failed");
            AppError::from(e)
        })?;

        if let Some(payload) = cached {
            match serde_json::from_str::<ImageRecord>(&payload) {
                Ok(record) => {
                    debug!(image_id, "image record cache hit");
                    return Ok(record);
                }
                Err(e) => warn!(image_id, error = %e, "discarding unreadable cache entry"),
            }
        }

        debug!(image_id, "image record cache miss");
        let record = self.repository.get_by_id(image_id).await?;
        self.store(&key, &record).await;
        Ok(record)
    }

    /// Called after the Metadata Store accepted a new version of `record`.
    ///
    /// With `refresh_on_write` the cache entry is overwritten; otherwise
    /// readers may see the previous version until the TTL lapses.
    pub async fn record_written(&self, record: &ImageRecord) {
        if !self.settings.enabled {
            return;
        }
        if self.settings.refresh_on_write {
            let key = cache_key(record.id);
            if !self.store(&key, record).await {
                // A stale entry must not outlive a failed refresh
                if let Err(e) = self.cache.delete(&key).await {
                    warn!(image_id = record.id, error = %e, "cache evict failed, entry stale until ttl");
                }
            }
        } else {
            debug!(image_id = record.id, ttl = ?CACHE_ENTRY_TTL, "cache left to expire after write");
        }
    }

    /// Best-effort write; `false` when the entry was not stored
    async fn store(&self, key: &str, record: &ImageRecord) -> bool {
        let payload = match serde_json::to_string(record) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(image_id = record.id, error = %e, "failed to serialize record for cache");
                return false;
            }
        };
        match self.cache.set(key, payload, CACHE_ENTRY_TTL).await {
            Ok(()) => true,
            Err(e) => {
                warn!(image_id = record.id, error = %e, "cache write failed, continuing");
                false
            }
        }
    }
}
