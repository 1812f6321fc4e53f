//! SeaORM-based image repository (the Metadata Store)

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::entities::{images, prelude::Images};
use crate::errors::{RepositoryError, RepositoryResult};
use crate::models::{ImageRecord, NewImageRecord, Pagination};
use crate::repositories::ImageRepository;

pub struct ImageSeaOrmRepository {
    connection: Arc<DatabaseConnection>,
    query_timeout: Duration,
}

impl ImageSeaOrmRepository {
    pub fn new(connection: Arc<DatabaseConnection>, query_timeout: Duration) -> Self {
        Self {
            connection,
            query_timeout,
        }
    }

    /// Bound a query by the per-call timeout
    async fn timed<T, F>(&self, operation: &str, query: F) -> RepositoryResult<T>
    where
        F: Future<Output = Result<T, sea_orm::DbErr>>,
    {
        match tokio::time::timeout(self.query_timeout, query).await {
            Ok(result) => result.map_err(RepositoryError::from),
            Err(_) => Err(RepositoryError::Timeout {
                operation: operation.to_string(),
                timeout_ms: self.query_timeout.as_millis(),
            }),
        }
    }

    fn not_found(id: i64) -> RepositoryError {
        RepositoryError::RecordNotFound {
            table: "images".to_string(),
            field: "id".to_string(),
            value: id.to_string(),
        }
    }

    fn model_to_domain(model: images::Model) -> ImageRecord {
        ImageRecord {
            id: model.id,
            url: model.url,
            filename: model.filename,
            owner_id: model.owner_id,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[async_trait]
impl ImageRepository for ImageSeaOrmRepository {
    async fn create(&self, record: NewImageRecord) -> RepositoryResult<ImageRecord> {
        let now = Utc::now();
        let active_model = images::ActiveModel {
            url: Set(record.url),
            filename: Set(record.filename),
            owner_id: Set(record.owner_id),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let model = self
            .timed("create", active_model.insert(&*self.connection))
            .await?;
        debug!(image_id = model.id, owner_id = model.owner_id, "image record created");
        Ok(Self::model_to_domain(model))
    }

    async fn get_by_id(&self, id: i64) -> RepositoryResult<ImageRecord> {
        self.timed("get_by_id", Images::find_by_id(id).one(&*self.connection))
            .await?
            .map(Self::model_to_domain)
            .ok_or_else(|| Self::not_found(id))
    }

    async fn get_by_owner(
        &self,
        owner_id: i64,
        pagination: Pagination,
    ) -> RepositoryResult<Vec<ImageRecord>> {
        let models = self
            .timed(
                "get_by_owner",
                Images::find()
                    .filter(images::Column::OwnerId.eq(owner_id))
                    .order_by_asc(images::Column::CreatedAt)
                    .order_by_asc(images::Column::Id)
                    .offset(pagination.offset())
                    .limit(pagination.limit)
                    .all(&*self.connection),
            )
            .await?;
        Ok(models.into_iter().map(Self::model_to_domain).collect())
    }

    async fn update(&self, record: &ImageRecord) -> RepositoryResult<ImageRecord> {
        let existing = self
            .timed("update", Images::find_by_id(record.id).one(&*self.connection))
            .await?
            .ok_or_else(|| Self::not_found(record.id))?;

        let mut active_model = existing.into_active_model();
        active_model.url = Set(record.url.clone());
        active_model.filename = Set(record.filename.clone());
        active_model.updated_at = Set(record.updated_at);

        let model = self
            .timed("update", active_model.update(&*self.connection))
            .await?;
        Ok(Self::model_to_domain(model))
    }

    async fn delete(&self, id: i64) -> RepositoryResult<()> {
        let result = self
            .timed("delete", Images::delete_by_id(id).exec(&*self.connection))
            .await?;
        if result.rows_affected == 0 {
            return Err(Self::not_found(id));
        }
        Ok(())
    }
}
