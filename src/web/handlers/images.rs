//! Image HTTP handlers
//!
//! Thin adapters: extract identity and input, call [`ImageService`], wrap the
//! result in the standard envelope.
//!
//! [`ImageService`]: crate::services::ImageService

use axum::{
    Json,
    extract::{Multipart, Path, State, rejection::JsonRejection},
    response::Response,
};
use bytes::Bytes;
use tracing::debug;

use crate::errors::{AppError, AppResult};
use crate::models::TransformRequest;
use crate::web::{
    AppState,
    extractors::{Identity, StrictPagination},
    responses::{created, handle_error, handle_result},
};

/// Multipart field carrying the image
pub const UPLOAD_FIELD: &str = "image";

/// POST /api/v1/images
pub async fn upload_image(
    State(state): State<AppState>,
    Identity(ctx): Identity,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let (filename, bytes) = read_upload(multipart).await?;
    debug!(request_id = %ctx.request_id, filename = %filename, bytes = bytes.len(), "upload received");
    let record = state.image_service.upload(&ctx, &filename, bytes).await?;
    Ok(created(record))
}

/// GET /api/v1/images?page=&limit=
pub async fn list_images(
    State(state): State<AppState>,
    Identity(ctx): Identity,
    StrictPagination(pagination): StrictPagination,
) -> Response {
    handle_result(state.image_service.list(&ctx, pagination).await)
}

/// GET /api/v1/images/{id}
pub async fn get_image(
    State(state): State<AppState>,
    Identity(ctx): Identity,
    Path(id): Path<i64>,
) -> Response {
    handle_result(state.image_service.get(&ctx, id).await)
}

/// POST /api/v1/images/{id}/transform
pub async fn transform_image(
    State(state): State<AppState>,
    Identity(ctx): Identity,
    Path(id): Path<i64>,
    body: Result<Json<TransformRequest>, JsonRejection>,
) -> Response {
    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => {
            return handle_error(AppError::validation(format!(
                "invalid transform body: {}",
                rejection.body_text()
            )));
        }
    };
    handle_result(
        state
            .image_service
            .transform(&ctx, id, &request.transformations)
            .await,
    )
}

async fn read_upload(mut multipart: Multipart) -> AppResult<(String, Bytes)> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::validation(format!("invalid multipart body: {}", e.body_text())))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let filename = field
            .file_name()
            .map(str::to_string)
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| AppError::validation("upload is missing a filename"))?;
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::validation(format!("could not read upload: {}", e.body_text())))?;
        if bytes.is_empty() {
            return Err(AppError::validation("upload is empty"));
        }
        return Ok((filename, bytes));
    }
    Err(AppError::validation(format!(
        "multipart field '{UPLOAD_FIELD}' is required"
    )))
}
