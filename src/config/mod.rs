use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

use crate::models::TransformLimits;

pub mod defaults;
pub mod duration_serde;

use defaults::*;
use duration_serde::duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub web: WebConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub transform: TransformConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub url: String,
    pub max_connections: Option<u32>,
    /// Per-call Metadata Store timeout, independent of the request deadline
    #[serde(default = "default_query_timeout", with = "duration")]
    pub query_timeout: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Public base URL, used when building signed blob URLs
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Overall request deadline
    #[serde(default = "default_request_timeout", with = "duration")]
    pub request_timeout: Duration,
    /// Maximum accepted upload body in bytes
    #[serde(default = "default_max_upload_size")]
    pub max_upload_size: usize,
    /// Header carrying the authenticated user id, set by the auth layer in front of us
    #[serde(default = "default_identity_header")]
    pub identity_header: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_blob_path")]
    pub blob_path: PathBuf,
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
    #[serde(default = "default_signing_secret")]
    pub signing_secret: String,
    #[serde(default = "default_signed_url_ttl", with = "duration")]
    pub signed_url_ttl: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,
    /// Overwrite the cached record after a transform commits
    #[serde(default = "default_cache_refresh_on_write")]
    pub refresh_on_write: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformConfig {
    #[serde(default = "default_quality")]
    pub default_quality: i32,
    /// Upper bound on concurrent pipeline executions; defaults to available parallelism
    pub max_concurrent: Option<usize>,
    #[serde(default = "default_sepia_percentage")]
    pub sepia_percentage: f32,
    /// Largest resize/crop width or height a request may ask for
    #[serde(default = "default_max_dimension")]
    pub max_dimension: u32,
    #[serde(default = "default_max_blur_sigma")]
    pub max_blur_sigma: f32,
}

impl TransformConfig {
    pub fn worker_permits(&self) -> usize {
        self.max_concurrent
            .filter(|n| *n > 0)
            .unwrap_or_else(|| {
                std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(1)
            })
    }

    pub fn limits(&self) -> TransformLimits {
        TransformLimits {
            max_dimension: self.max_dimension,
            max_blur_sigma: self.max_blur_sigma,
        }
    }
}

// Database defaults
fn default_database_url() -> String {
    DEFAULT_DATABASE_URL.to_string()
}

fn default_query_timeout() -> Duration {
    DEFAULT_QUERY_TIMEOUT
}

// Web defaults
fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_request_timeout() -> Duration {
    DEFAULT_REQUEST_TIMEOUT
}

fn default_max_upload_size() -> usize {
    DEFAULT_MAX_UPLOAD_SIZE
}

fn default_identity_header() -> String {
    DEFAULT_IDENTITY_HEADER.to_string()
}

// Storage defaults
fn default_blob_path() -> PathBuf {
    PathBuf::from(DEFAULT_BLOB_PATH)
}

fn default_key_prefix() -> String {
    DEFAULT_KEY_PREFIX.to_string()
}

fn default_signing_secret() -> String {
    DEFAULT_SIGNING_SECRET.to_string()
}

fn default_signed_url_ttl() -> Duration {
    DEFAULT_SIGNED_URL_TTL
}

// Cache defaults
fn default_cache_enabled() -> bool {
    DEFAULT_CACHE_ENABLED
}

fn default_cache_capacity() -> usize {
    DEFAULT_CACHE_CAPACITY
}

fn default_cache_refresh_on_write() -> bool {
    DEFAULT_CACHE_REFRESH_ON_WRITE
}

// Transform defaults
fn default_quality() -> i32 {
    DEFAULT_QUALITY
}

fn default_sepia_percentage() -> f32 {
    DEFAULT_SEPIA_PERCENTAGE
}

fn default_max_dimension() -> u32 {
    DEFAULT_MAX_DIMENSION
}

fn default_max_blur_sigma() -> f32 {
    DEFAULT_MAX_BLUR_SIGMA
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            capacity: default_cache_capacity(),
            refresh_on_write: default_cache_refresh_on_write(),
        }
    }
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            default_quality: default_quality(),
            max_concurrent: None,
            sepia_percentage: default_sepia_percentage(),
            max_dimension: default_max_dimension(),
            max_blur_sigma: default_max_blur_sigma(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: default_database_url(),
                max_connections: Some(DEFAULT_MAX_CONNECTIONS),
                query_timeout: default_query_timeout(),
            },
            web: WebConfig {
                host: default_host(),
                port: default_port(),
                base_url: default_base_url(),
                request_timeout: default_request_timeout(),
                max_upload_size: default_max_upload_size(),
                identity_header: default_identity_header(),
            },
            storage: StorageConfig {
                blob_path: default_blob_path(),
                key_prefix: default_key_prefix(),
                signing_secret: default_signing_secret(),
                signed_url_ttl: default_signed_url_ttl(),
            },
            cache: CacheConfig::default(),
            transform: TransformConfig::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_file =
            std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".to_string());
        Self::load_from_file(&config_file)
    }

    pub fn load_from_file(config_file: &str) -> Result<Self> {
        if std::path::Path::new(&config_file).exists() {
            let contents = std::fs::read_to_string(config_file)?;
            Ok(toml::from_str(&contents)?)
        } else {
            let default_config = Self::default();
            let contents = toml::to_string_pretty(&default_config)?;
            std::fs::write(config_file, contents)?;
            info!("Created default config file: {}", config_file);
            Ok(default_config)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [database]
            url = "postgres://localhost/images"

            [web]
            port = 9000

            [storage]
            signing_secret = "s3cret"
            "#,
        )
        .unwrap();

        assert_eq!(config.database.url, "postgres://localhost/images");
        assert_eq!(config.database.query_timeout, Duration::from_secs(5));
        assert_eq!(config.web.port, 9000);
        assert_eq!(config.web.request_timeout, Duration::from_secs(60));
        assert_eq!(config.storage.key_prefix, "uploaded_");
        assert_eq!(config.storage.signed_url_ttl, Duration::from_secs(21600));
        assert!(!config.cache.enabled);
        assert_eq!(config.transform.default_quality, 75);
        assert_eq!(config.transform.limits(), TransformLimits::default());
    }

    #[test]
    fn test_default_config_round_trips_through_toml() {
        let rendered = toml::to_string_pretty(&Config::default()).unwrap();
        let parsed: Config = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed.cache.capacity, DEFAULT_CACHE_CAPACITY);
        assert_eq!(parsed.web.identity_header, "x-user-id");
    }

    #[test]
    fn test_worker_permits_falls_back_to_parallelism() {
        let mut transform = TransformConfig::default();
        assert!(transform.worker_permits() >= 1);

        transform.max_concurrent = Some(3);
        assert_eq!(transform.worker_permits(), 3);

        transform.max_concurrent = Some(0);
        assert!(transform.worker_permits() >= 1);
    }

    #[test]
    fn test_load_from_file_writes_defaults_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let path_str = path.to_str().unwrap();

        let config = Config::load_from_file(path_str).unwrap();
        assert!(path.exists());
        assert_eq!(config.web.port, DEFAULT_PORT);

        let reloaded = Config::load_from_file(path_str).unwrap();
        assert_eq!(reloaded.storage.blob_path, config.storage.blob_path);
    }
}
