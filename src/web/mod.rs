//! Web layer module
//!
//! HTTP interface for the image service. Handlers stay thin and delegate to
//! [`ImageService`]; every JSON body uses the [`ApiResponse`] envelope.
//!
//! # Routes
//!
//! - `GET  /health`
//! - `POST /api/v1/images` (multipart, field `image`)
//! - `GET  /api/v1/images?page=&limit=`
//! - `GET  /api/v1/images/{id}`
//! - `POST /api/v1/images/{id}/transform`
//! - `GET  /blobs/{key}?expires=&signature=`
//!
//! Caller identity comes from a header set by the authentication layer in
//! front of this service (see [`extractors::Identity`]).

use anyhow::Result;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer};
use tracing::info;

use crate::{
    cache::CacheStore,
    config::Config,
    database::{Database, repositories::ImageSeaOrmRepository},
    models::FormatTable,
    services::{CacheAsideResolver, ImageService, TransformWorkerPool},
    storage::BlobStore,
    transform::{RasterFilterEngine, TransformPipeline, TransformValidator, VectorGeometryEngine},
};

pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod responses;

pub use responses::{ApiResponse, handle_error, handle_result};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub database: Database,
    pub image_service: Arc<ImageService>,
    pub blobs: Arc<dyn BlobStore>,
}

impl AppState {
    /// Wire the service graph over the given stores
    pub fn assemble(
        config: Arc<Config>,
        database: Database,
        blobs: Arc<dyn BlobStore>,
        cache: Arc<dyn CacheStore>,
        formats: Arc<FormatTable>,
    ) -> Self {
        let transform = &config.transform;
        let repository = Arc::new(ImageSeaOrmRepository::new(
            database.connection(),
            config.database.query_timeout,
        ));
        let resolver = Arc::new(CacheAsideResolver::new(
            repository.clone(),
            cache,
            config.cache.clone(),
        ));
        let pipeline = TransformPipeline::new(
            Arc::new(VectorGeometryEngine::new(transform.default_quality)),
            Arc::new(RasterFilterEngine::new(
                transform.sepia_percentage,
                transform.default_quality,
            )),
        );
        let workers = TransformWorkerPool::new(pipeline, transform.worker_permits());
        let image_service = ImageService::new(
            blobs.clone(),
            repository,
            resolver,
            TransformValidator::new(formats, transform.default_quality)
                .with_limits(transform.limits()),
            workers,
            config.storage.signed_url_ttl,
        );

        info!(
            workers = transform.worker_permits(),
            cache_enabled = config.cache.enabled,
            "Image service initialized"
        );

        Self {
            config,
            database,
            image_service: Arc::new(image_service),
            blobs,
        }
    }
}

/// Web server configuration and setup
pub struct WebServer {
    app: Router,
    addr: SocketAddr,
}

impl WebServer {
    pub fn new(state: AppState) -> Result<Self> {
        let addr: SocketAddr =
            format!("{}:{}", state.config.web.host, state.config.web.port).parse()?;
        let app = create_router(state);
        Ok(Self { app, addr })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub async fn serve(self) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(&self.addr).await?;
        info!("Web server listening on {}", self.addr);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        info!("Web server stopped");
        Ok(())
    }
}

/// Build the router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    let max_upload = state.config.web.max_upload_size;
    let deadline = state.config.web.request_timeout;

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .nest("/api/v1", api_v1_routes())
        .route("/blobs/{key}", get(handlers::blobs::serve_blob))
        // Middleware (applied in reverse order)
        .layer(DefaultBodyLimit::max(max_upload))
        .layer(RequestBodyLimitLayer::new(max_upload))
        .layer(axum::middleware::from_fn_with_state(
            deadline,
            middleware::timeout_middleware,
        ))
        .layer(CorsLayer::permissive())
        .layer(axum::middleware::from_fn(
            middleware::request_logging_middleware,
        ))
        .with_state(state)
}

fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/images",
            get(handlers::images::list_images).post(handlers::images::upload_image),
        )
        .route("/images/{id}", get(handlers::images::get_image))
        .route(
            "/images/{id}/transform",
            post(handlers::images::transform_image),
        )
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down gracefully"),
                    _ = tokio::signal::ctrl_c() => info!("Received SIGINT (Ctrl+C), shutting down gracefully"),
                }
                return;
            }
            Err(e) => tracing::warn!("Failed to install SIGTERM handler: {}", e),
        }
    }

    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Received Ctrl+C, shutting down gracefully");
    }
}
