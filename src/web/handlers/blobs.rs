//! Signed blob download

use axum::{
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::errors::AppError;
use crate::models::ImageFormat;
use crate::web::{AppState, responses::handle_error};

#[derive(Debug, Deserialize)]
pub struct SignedQuery {
    pub expires: Option<i64>,
    pub signature: Option<String>,
}

/// GET /blobs/{key}?expires=&signature=
///
/// A missing, tampered or expired signature is 403; an unknown key is 404.
pub async fn serve_blob(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(query): Query<SignedQuery>,
) -> Response {
    let (Some(expires), Some(signature)) = (query.expires, query.signature.as_deref()) else {
        return handle_error(AppError::forbidden("read", "blob"));
    };

    if let Err(e) = state.blobs.verify(&key, expires, signature) {
        return handle_error(e.into());
    }

    match state.blobs.get(&key).await {
        Ok(bytes) => {
            let content_type = ImageFormat::detect(&bytes)
                .map(|format| format.mime_type())
                .unwrap_or("application/octet-stream");
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, content_type),
                    (header::CACHE_CONTROL, "private, no-cache"),
                ],
                bytes,
            )
                .into_response()
        }
        Err(e) => handle_error(e.into()),
    }
}
