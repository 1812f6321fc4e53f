//! HTTP response envelope and error mapping
//!
//! Every JSON body uses [`ApiResponse`]. Store and internal failures are logged
//! with full context here and reach the client only as a generic message.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::errors::{AppError, AppResult};

/// Standard API response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl<T> ApiResponse<T>
where
    T: Serialize,
{
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn error(message: String) -> ApiResponse<()> {
        ApiResponse {
            success: false,
            data: None,
            error: Some(message),
            timestamp: chrono::Utc::now(),
        }
    }
}

/// Status code and client-facing message for an error
pub fn status_and_message(error: &AppError) -> (StatusCode, String) {
    match error {
        AppError::Validation { message } => (StatusCode::BAD_REQUEST, message.clone()),
        AppError::UnsupportedFormat { format } => (
            StatusCode::BAD_REQUEST,
            format!("Unsupported image format: {format}"),
        ),
        AppError::NotFound { .. } => (StatusCode::NOT_FOUND, "Image not found".to_string()),
        AppError::Forbidden { .. } => (StatusCode::FORBIDDEN, "Forbidden".to_string()),
        AppError::Conflict { .. } => (
            StatusCode::CONFLICT,
            "An image with this filename already exists".to_string(),
        ),
        AppError::Engine(e) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            format!("Image could not be processed at the {} stage", e.stage),
        ),
        AppError::ConversionMismatch { .. } | AppError::Internal { .. } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error".to_string(),
        ),
        AppError::Upstream { .. } => (
            StatusCode::BAD_GATEWAY,
            "Upstream service unavailable".to_string(),
        ),
    }
}

/// Convert AppError to appropriate HTTP response
pub fn handle_error(error: AppError) -> Response {
    let (status, message) = status_and_message(&error);
    if status.is_server_error() {
        error!(status = status.as_u16(), error = %error, "request failed");
    } else {
        debug!(status = status.as_u16(), error = %error, "request rejected");
    }
    (status, Json(ApiResponse::<()>::error(message))).into_response()
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        handle_error(self)
    }
}

pub fn handle_result<T: Serialize>(result: AppResult<T>) -> Response {
    match result {
        Ok(data) => ok(data),
        Err(error) => handle_error(error),
    }
}

pub fn ok<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(ApiResponse::success(data))).into_response()
}

pub fn created<T: Serialize>(data: T) -> Response {
    (StatusCode::CREATED, Json(ApiResponse::success(data))).into_response()
}

pub fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(ApiResponse::<()>::error(message.to_string())),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::EngineError;
    use rstest::rstest;

    #[rstest]
    #[case(AppError::validation("bad"), StatusCode::BAD_REQUEST)]
    #[case(AppError::unsupported_format("gif"), StatusCode::BAD_REQUEST)]
    #[case(AppError::not_found("images", 5), StatusCode::NOT_FOUND)]
    #[case(AppError::forbidden("transform", "image"), StatusCode::FORBIDDEN)]
    #[case(AppError::conflict("blob", "uploaded_cat.jpg"), StatusCode::CONFLICT)]
    #[case(AppError::Engine(EngineError::new("resize", "boom")), StatusCode::UNPROCESSABLE_ENTITY)]
    #[case(
        AppError::ConversionMismatch { expected: "webp".into(), actual: "png".into() },
        StatusCode::INTERNAL_SERVER_ERROR
    )]
    #[case(AppError::upstream("blob_store", "disk full"), StatusCode::BAD_GATEWAY)]
    #[case(AppError::internal("oops"), StatusCode::INTERNAL_SERVER_ERROR)]
    fn test_status_mapping(#[case] error: AppError, #[case] status: StatusCode) {
        assert_eq!(status_and_message(&error).0, status);
    }

    #[test]
    fn test_server_errors_do_not_leak_details() {
        let (_, message) = status_and_message(&AppError::upstream(
            "metadata_store",
            "password authentication failed for user admin",
        ));
        assert!(!message.contains("admin"));

        let (_, message) = status_and_message(&AppError::not_found("images", 42));
        assert!(!message.contains("42"));
    }

    #[test]
    fn test_error_envelope_shape() {
        let value = serde_json::to_value(ApiResponse::<()>::error("nope".to_string())).unwrap();
        assert_eq!(value["success"], false);
        assert_eq!(value["error"], "nope");
        assert!(value.get("data").is_none());
        assert!(value.get("timestamp").is_some());
    }
}
