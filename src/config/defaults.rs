/// Configuration default values
///
/// This module contains all the default values for configuration options,
/// making them easily changeable in one central location.
use std::time::Duration;

// Database defaults
pub const DEFAULT_DATABASE_URL: &str = "sqlite://./data/images.db";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(5);

// Web server defaults
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_MAX_UPLOAD_SIZE: usize = 10 * 1024 * 1024; // 10MB
pub const DEFAULT_IDENTITY_HEADER: &str = "x-user-id";

// Blob storage defaults
pub const DEFAULT_BLOB_PATH: &str = "./data/blobs";
pub const DEFAULT_KEY_PREFIX: &str = "uploaded_";
pub const DEFAULT_SIGNING_SECRET: &str = "change-me";
pub const DEFAULT_SIGNED_URL_TTL: Duration = Duration::from_secs(6 * 3600);

// Cache defaults
pub const DEFAULT_CACHE_ENABLED: bool = false;
pub const DEFAULT_CACHE_CAPACITY: usize = 10_000;
pub const DEFAULT_CACHE_REFRESH_ON_WRITE: bool = true;

// Transform defaults
pub const DEFAULT_QUALITY: i32 = 75;
pub const DEFAULT_SEPIA_PERCENTAGE: f32 = 50.0;
pub const DEFAULT_MAX_DIMENSION: u32 = 4096;
pub const DEFAULT_MAX_BLUR_SIGMA: f32 = 50.0;
