//! Health check handler

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::database::Database;
use crate::web::{AppState, responses::ApiResponse};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub database: String,
}

/// Liveness plus Metadata Store connectivity; 503 while the database is unreachable
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let connected = check_database_health(&state.database).await;
    let response = HealthResponse {
        status: if connected { "healthy" } else { "unhealthy" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: if connected { "connected" } else { "disconnected" }.to_string(),
    };
    let status = if connected {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(ApiResponse::success(response)))
}

async fn check_database_health(database: &Database) -> bool {
    match database.connection.ping().await {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "Database health check failed");
            false
        }
    }
}
