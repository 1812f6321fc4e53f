//! Metadata Store contract
//!
//! Implementations enforce their own per-call timeout, independent of the
//! caller's request deadline.

use async_trait::async_trait;

use crate::errors::RepositoryResult;
use crate::models::{ImageRecord, NewImageRecord, Pagination};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ImageRepository: Send + Sync {
    /// Insert a record, assigning id and timestamps
    async fn create(&self, record: NewImageRecord) -> RepositoryResult<ImageRecord>;

    /// Fetch one record
    ///
    /// # Returns
    ///
    /// * `Ok(ImageRecord)` - Record found
    /// * `Err(RepositoryError::RecordNotFound)` - No such id
    /// * `Err(RepositoryError)` - Timeout or database error
    async fn get_by_id(&self, id: i64) -> RepositoryResult<ImageRecord>;

    /// One page of an owner's records, oldest first
    async fn get_by_owner(
        &self,
        owner_id: i64,
        pagination: Pagination,
    ) -> RepositoryResult<Vec<ImageRecord>>;

    /// Persist `url`, `filename` and `updated_at` of an existing record
    async fn update(&self, record: &ImageRecord) -> RepositoryResult<ImageRecord>;

    async fn delete(&self, id: i64) -> RepositoryResult<()>;
}
