//! Image upload, lookup, listing and in-place transformation

use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use chrono::Utc;
use tracing::{debug, error, info};

use super::leases::ImageLeases;
use super::resolver::CacheAsideResolver;
use super::worker_pool::TransformWorkerPool;
use crate::errors::{AppError, AppResult};
use crate::models::{ImageRecord, NewImageRecord, Pagination, RequestContext, Transformations};
use crate::repositories::ImageRepository;
use crate::storage::BlobStore;
use crate::transform::{ImageBuffer, TransformValidator};
use crate::utils::{RetryConfig, with_retry};

pub struct ImageService {
    blobs: Arc<dyn BlobStore>,
    repository: Arc<dyn ImageRepository>,
    resolver: Arc<CacheAsideResolver>,
    validator: TransformValidator,
    workers: TransformWorkerPool,
    leases: ImageLeases,
    signed_url_ttl: Duration,
    commit_retry: RetryConfig,
}

impl ImageService {
    pub fn new(
        blobs: Arc<dyn BlobStore>,
        repository: Arc<dyn ImageRepository>,
        resolver: Arc<CacheAsideResolver>,
        validator: TransformValidator,
        workers: TransformWorkerPool,
        signed_url_ttl: Duration,
    ) -> Self {
        Self {
            blobs,
            repository,
            resolver,
            validator,
            workers,
            leases: ImageLeases::new(),
            signed_url_ttl,
            commit_retry: RetryConfig::for_commit(),
        }
    }

    pub fn with_commit_retry(mut self, retry: RetryConfig) -> Self {
        self.commit_retry = retry;
        self
    }

    /// Store the bytes and create a record owned by the requester
    pub async fn upload(
        &self,
        ctx: &RequestContext,
        filename: &str,
        bytes: Bytes,
    ) -> AppResult<ImageRecord> {
        let size = bytes.len();
        let stored = self.blobs.put(filename, bytes).await?;
        let record = self
            .repository
            .create(NewImageRecord {
                url: stored.url,
                filename: stored.key,
                owner_id: ctx.user_id,
            })
            .await?;

        info!(
            image_id = record.id,
            owner_id = record.owner_id,
            filename = %record.filename,
            bytes = size,
            "image uploaded"
        );
        Ok(record)
    }

    pub async fn get(&self, ctx: &RequestContext, image_id: i64) -> AppResult<ImageRecord> {
        let record = self.resolver.resolve(image_id).await?;
        ensure_owner(ctx, &record, "read")?;
        Ok(record)
    }

    pub async fn list(
        &self,
        ctx: &RequestContext,
        pagination: Pagination,
    ) -> AppResult<Vec<ImageRecord>> {
        Ok(self
            .repository
            .get_by_owner(ctx.user_id, pagination)
            .await?)
    }

    /// Apply `raw` to the stored image, overwriting it in place.
    ///
    /// The per-image lease is held from resolve to the final metadata write.
    /// The blob replace and the metadata update are not atomic; the update is
    /// retried, and a final failure leaves the new bytes under the old record.
    pub async fn transform(
        &self,
        ctx: &RequestContext,
        image_id: i64,
        raw: &Transformations,
    ) -> AppResult<ImageRecord> {
        let started = Instant::now();
        let spec = self.validator.validate(raw)?;

        let _lease = self.leases.acquire(image_id).await;
        let record = self.resolver.resolve(image_id).await?;
        ensure_owner(ctx, &record, "transform")?;

        let original = self.blobs.get(&record.filename).await?;
        let input = ImageBuffer::from_bytes(original.to_vec())?;
        let input_format = input.format();

        let output = self.workers.run(input, spec).await?;
        let output_format = output.format();

        self.blobs
            .replace(&record.filename, Bytes::from(output.into_bytes()))
            .await?;
        let url = self
            .blobs
            .signed_url(&record.filename, self.signed_url_ttl)
            .await?;

        let updated = ImageRecord {
            url,
            updated_at: Utc::now(),
            ..record
        };
        let committed = with_retry(
            &self.commit_retry,
            || self.repository.update(&updated),
            "update_image",
        )
        .await
        .map_err(|e| {
            error!(
                image_id,
                filename = %updated.filename,
                error = %e,
                "blob replaced but metadata update failed"
            );
            AppError::upstream("metadata_store", e)
        })?;

        self.resolver.record_written(&committed).await;

        info!(
            image_id,
            owner_id = ctx.user_id,
            input_format = %input_format,
            output_format = %output_format,
            duration_ms = started.elapsed().as_millis(),
            "image transformed"
        );
        Ok(committed)
    }
}

fn ensure_owner(ctx: &RequestContext, record: &ImageRecord, action: &str) -> AppResult<()> {
    if ctx.owns(record.owner_id) {
        return Ok(());
    }
    debug!(
        image_id = record.id,
        requester = ctx.user_id,
        action,
        "requester does not own image"
    );
    Err(AppError::forbidden(action, "image"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::LruCacheStore;
    use crate::config::CacheConfig;
    use crate::errors::{EngineError, RepositoryError, StorageError};
    use crate::models::{FormatTable, ImageFormat};
    use crate::repositories::MockImageRepository;
    use crate::storage::{InMemoryBlobStore, KeyPolicy, MockBlobStore, StoredBlob, UrlSigner};
    use crate::transform::codec::{self, test_images};
    use crate::transform::{
        GeometryFormatEngine, GeometryOp, RasterFilterEngine, TransformPipeline,
        VectorGeometryEngine,
    };
    use image::GenericImageView;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn record(id: i64, owner_id: i64, filename: &str) -> ImageRecord {
        let created = Utc::now() - chrono::Duration::minutes(5);
        ImageRecord {
            id,
            url: format!("http://localhost/blobs/{filename}?expires=1&signature=old"),
            filename: filename.to_string(),
            owner_id,
            created_at: created,
            updated_at: created,
        }
    }

    fn memory_blobs() -> Arc<InMemoryBlobStore> {
        let formats = Arc::new(FormatTable::default());
        Arc::new(InMemoryBlobStore::new(
            KeyPolicy::new("uploaded_", formats),
            UrlSigner::new("http://localhost:8080", "secret").unwrap(),
            Duration::from_secs(6 * 3600),
        ))
    }

    fn service(
        blobs: Arc<dyn BlobStore>,
        repository: Arc<dyn ImageRepository>,
        cache: CacheConfig,
    ) -> ImageService {
        let pipeline = TransformPipeline::new(
            Arc::new(VectorGeometryEngine::default()),
            Arc::new(RasterFilterEngine::default()),
        );
        service_with_pipeline(blobs, repository, cache, pipeline)
    }

    fn service_with_pipeline(
        blobs: Arc<dyn BlobStore>,
        repository: Arc<dyn ImageRepository>,
        cache: CacheConfig,
        pipeline: TransformPipeline,
    ) -> ImageService {
        let resolver = Arc::new(CacheAsideResolver::new(
            repository.clone(),
            Arc::new(LruCacheStore::new(16)),
            cache,
        ));
        ImageService::new(
            blobs,
            repository,
            resolver,
            TransformValidator::new(Arc::new(FormatTable::default()), 75),
            TransformWorkerPool::new(pipeline, 2),
            Duration::from_secs(6 * 3600),
        )
        .with_commit_retry(RetryConfig {
            max_attempts: 3,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            backoff_multiplier: 2.0,
            jitter: false,
        })
    }

    fn cache_enabled(refresh_on_write: bool) -> CacheConfig {
        CacheConfig {
            enabled: true,
            refresh_on_write,
            ..CacheConfig::default()
        }
    }

    #[tokio::test]
    async fn test_upload_prefixes_key_and_sets_owner() {
        let mut repo = MockImageRepository::new();
        repo.expect_create()
            .withf(|new| {
                new.filename == "uploaded_cat.jpg" && new.owner_id == 7 && !new.url.is_empty()
            })
            .times(1)
            .returning(|new| {
                let mut created = record(1, new.owner_id, &new.filename);
                created.url = new.url;
                Ok(created)
            });

        let blobs = memory_blobs();
        let service = service(blobs.clone(), Arc::new(repo), CacheConfig::default());
        let jpeg = test_images::buffer(8, 8, ImageFormat::Jpeg).into_bytes();

        let created = service
            .upload(&RequestContext::new(7), "cat.jpg", Bytes::from(jpeg))
            .await
            .unwrap();

        assert_eq!(created.filename, "uploaded_cat.jpg");
        assert_eq!(created.owner_id, 7);
        assert!(created.url.contains("/blobs/uploaded_cat.jpg?expires="));
        assert!(blobs.get("uploaded_cat.jpg").await.is_ok());
    }

    #[tokio::test]
    async fn test_same_filename_from_another_owner_conflicts() {
        let mut repo = MockImageRepository::new();
        repo.expect_create()
            .times(1)
            .returning(|new| Ok(record(1, new.owner_id, &new.filename)));

        let blobs = memory_blobs();
        let service = service(blobs.clone(), Arc::new(repo), CacheConfig::default());
        let first = test_images::buffer(8, 8, ImageFormat::Jpeg).into_bytes();
        let second = test_images::buffer(4, 4, ImageFormat::Jpeg).into_bytes();

        service
            .upload(&RequestContext::new(1), "cat.jpg", Bytes::from(first.clone()))
            .await
            .unwrap();
        let err = service
            .upload(&RequestContext::new(2), "cat.jpg", Bytes::from(second))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Conflict { .. }));
        assert_eq!(blobs.get("uploaded_cat.jpg").await.unwrap(), Bytes::from(first));
        assert_eq!(blobs.len().await, 1);
    }

    #[tokio::test]
    async fn test_upload_with_unknown_extension_creates_nothing() {
        let mut repo = MockImageRepository::new();
        repo.expect_create().times(0);
        let blobs = memory_blobs();
        let service = service(blobs.clone(), Arc::new(repo), CacheConfig::default());

        let err = service
            .upload(&RequestContext::new(1), "cat.gif", Bytes::from_static(b"GIF89a"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::UnsupportedFormat { .. }));
        assert!(blobs.is_empty().await);
    }

    #[tokio::test]
    async fn test_transform_by_non_owner_is_forbidden_without_mutation() {
        let mut repo = MockImageRepository::new();
        repo.expect_get_by_id()
            .returning(|id| Ok(record(id, 1, "uploaded_cat.jpg")));
        repo.expect_update().times(0);

        let mut blobs = MockBlobStore::new();
        blobs.expect_get().times(0);
        blobs.expect_replace().times(0);
        blobs.expect_put().times(0);
        blobs.expect_signed_url().times(0);

        let service = service(Arc::new(blobs), Arc::new(repo), CacheConfig::default());
        let raw = Transformations {
            rotate: 90,
            ..Default::default()
        };

        let err = service
            .transform(&RequestContext::new(2), 5, &raw)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden { .. }));
    }

    #[tokio::test]
    async fn test_get_by_non_owner_is_forbidden() {
        let mut repo = MockImageRepository::new();
        repo.expect_get_by_id()
            .returning(|id| Ok(record(id, 1, "uploaded_cat.jpg")));
        let service = service(
            Arc::new(MockBlobStore::new()),
            Arc::new(repo),
            CacheConfig::default(),
        );

        assert!(service.get(&RequestContext::new(1), 5).await.is_ok());
        assert!(matches!(
            service.get(&RequestContext::new(2), 5).await,
            Err(AppError::Forbidden { .. })
        ));
    }

    #[tokio::test]
    async fn test_invalid_spec_fails_before_any_lookup() {
        let mut repo = MockImageRepository::new();
        repo.expect_get_by_id().times(0);
        let service = service(
            Arc::new(MockBlobStore::new()),
            Arc::new(repo),
            CacheConfig::default(),
        );
        let raw = Transformations {
            format: "gif".to_string(),
            ..Default::default()
        };

        let err = service
            .transform(&RequestContext::new(1), 5, &raw)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::UnsupportedFormat { .. }));
    }

    /// Upload a JPEG into `blobs` and return the record the mock repository will serve
    async fn seeded(blobs: &InMemoryBlobStore) -> ImageRecord {
        let jpeg = test_images::buffer(32, 16, ImageFormat::Jpeg).into_bytes();
        let stored: StoredBlob = blobs.put("cat.jpg", Bytes::from(jpeg)).await.unwrap();
        record(5, 1, &stored.key)
    }

    #[tokio::test]
    async fn test_transform_rewrites_blob_and_refreshes_cache() {
        let blobs = memory_blobs();
        let original = seeded(&blobs).await;

        let mut repo = MockImageRepository::new();
        let served = original.clone();
        repo.expect_get_by_id()
            .times(1)
            .returning(move |_| Ok(served.clone()));
        repo.expect_update()
            .times(1)
            .returning(|r| Ok(r.clone()));

        let service = service(blobs.clone(), Arc::new(repo), cache_enabled(true));
        let mut raw = Transformations {
            rotate: 90,
            format: "webp".to_string(),
            ..Default::default()
        };
        raw.filters.grayscale = true;

        let ctx = RequestContext::new(1);
        let updated = service.transform(&ctx, 5, &raw).await.unwrap();
        assert!(updated.updated_at > original.updated_at);
        assert_eq!(updated.filename, original.filename);
        assert_ne!(updated.url, original.url);

        let stored = blobs.get(&original.filename).await.unwrap();
        let buffer = ImageBuffer::from_bytes(stored.to_vec()).unwrap();
        assert_eq!(buffer.format(), ImageFormat::Webp);
        let decoded = codec::decode(&buffer).unwrap();
        assert_eq!(decoded.dimensions(), (16, 32));
        assert!(
            decoded
                .to_rgb8()
                .pixels()
                .all(|p| p.0[0] == p.0[1] && p.0[1] == p.0[2])
        );

        // served from the refreshed cache entry, no second metadata read
        let read_back = service.get(&ctx, 5).await.unwrap();
        assert_eq!(read_back, updated);
    }

    #[tokio::test]
    async fn test_without_refresh_reads_stay_stale_until_ttl() {
        let blobs = memory_blobs();
        let original = seeded(&blobs).await;

        let mut repo = MockImageRepository::new();
        let served = original.clone();
        repo.expect_get_by_id()
            .times(1)
            .returning(move |_| Ok(served.clone()));
        repo.expect_update().times(1).returning(|r| Ok(r.clone()));

        let service = service(blobs, Arc::new(repo), cache_enabled(false));
        let ctx = RequestContext::new(1);
        let updated = service
            .transform(&ctx, 5, &Transformations::default())
            .await
            .unwrap();

        let read_back = service.get(&ctx, 5).await.unwrap();
        assert_eq!(read_back, original);
        assert_ne!(read_back.updated_at, updated.updated_at);
    }

    #[tokio::test]
    async fn test_metadata_update_is_retried() {
        let blobs = memory_blobs();
        let original = seeded(&blobs).await;
        let attempts = Arc::new(AtomicU32::new(0));

        let mut repo = MockImageRepository::new();
        let served = original.clone();
        repo.expect_get_by_id()
            .returning(move |_| Ok(served.clone()));
        let counter = attempts.clone();
        repo.expect_update().times(2).returning(move |r| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(RepositoryError::Database(sea_orm::DbErr::Custom(
                    "database is locked".to_string(),
                )))
            } else {
                Ok(r.clone())
            }
        });

        let service = service(blobs, Arc::new(repo), CacheConfig::default());
        assert!(
            service
                .transform(&RequestContext::new(1), 5, &Transformations::default())
                .await
                .is_ok()
        );
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_metadata_commit_surfaces_upstream() {
        let blobs = memory_blobs();
        let original = seeded(&blobs).await;

        let mut repo = MockImageRepository::new();
        let served = original.clone();
        repo.expect_get_by_id()
            .returning(move |_| Ok(served.clone()));
        repo.expect_update().times(3).returning(|_| {
            Err(RepositoryError::Timeout {
                operation: "update".to_string(),
                timeout_ms: 5000,
            })
        });

        let service = service(blobs, Arc::new(repo), CacheConfig::default());
        let err = service
            .transform(&RequestContext::new(1), 5, &Transformations::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Upstream { ref service, .. } if service == "metadata_store"));
    }

    #[tokio::test]
    async fn test_missing_blob_is_not_found() {
        let mut repo = MockImageRepository::new();
        repo.expect_get_by_id()
            .returning(|id| Ok(record(id, 1, "uploaded_gone.png")));
        repo.expect_update().times(0);
        let mut blobs = MockBlobStore::new();
        blobs.expect_get().returning(|key| {
            Err(StorageError::ObjectNotFound {
                key: key.to_string(),
            })
        });
        blobs.expect_replace().times(0);

        let service = service(Arc::new(blobs), Arc::new(repo), CacheConfig::default());
        let err = service
            .transform(&RequestContext::new(1), 5, &Transformations::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound { ref resource, .. } if resource == "blob"));
    }

    #[tokio::test]
    async fn test_list_is_scoped_to_requester() {
        let mut repo = MockImageRepository::new();
        repo.expect_get_by_owner()
            .withf(|owner, page| *owner == 3 && page.page == 2 && page.limit == 5)
            .times(1)
            .returning(|owner, _| Ok(vec![record(11, owner, "uploaded_a.png")]));
        let service = service(
            Arc::new(MockBlobStore::new()),
            Arc::new(repo),
            CacheConfig::default(),
        );

        let page = service
            .list(&RequestContext::new(3), Pagination { page: 2, limit: 5 })
            .await
            .unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].owner_id, 3);
    }

    /// Geometry engine that passes buffers through and records how many
    /// calls were in flight at once
    #[derive(Default)]
    struct OverlapTracker {
        in_flight: AtomicU32,
        peak: AtomicU32,
        calls: AtomicU32,
    }

    impl GeometryFormatEngine for OverlapTracker {
        fn apply(&self, buffer: ImageBuffer, _op: &GeometryOp) -> Result<ImageBuffer, EngineError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(50));
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(buffer)
        }
    }

    #[tokio::test]
    async fn test_concurrent_transforms_of_one_image_run_one_at_a_time() {
        let blobs = memory_blobs();
        let original = seeded(&blobs).await;

        let mut repo = MockImageRepository::new();
        let served = original.clone();
        repo.expect_get_by_id()
            .times(2)
            .returning(move |_| Ok(served.clone()));
        repo.expect_update().times(2).returning(|r| Ok(r.clone()));

        let tracker = Arc::new(OverlapTracker::default());
        let pipeline = TransformPipeline::new(tracker.clone(), Arc::new(RasterFilterEngine::default()));
        let service = service_with_pipeline(blobs, Arc::new(repo), CacheConfig::default(), pipeline);

        let ctx = RequestContext::new(1);
        let raw = Transformations::default();
        let (a, b) = tokio::join!(
            service.transform(&ctx, 5, &raw),
            service.transform(&ctx, 5, &raw)
        );

        assert!(a.is_ok() && b.is_ok());
        assert_eq!(tracker.calls.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.peak.load(Ordering::SeqCst), 1);
    }
}
