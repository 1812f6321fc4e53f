//! Error type definitions for the image transform service
//!
//! This module defines all error types used throughout the application.
//! Boundary errors (repository, blob storage, cache, engines) convert into
//! [`AppError`] so services can use `?` across layers.

use thiserror::Error;

/// Top-level application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Malformed or out-of-range request
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// Requested or detected image format is outside the supported set
    #[error("Unsupported image format: {format}")]
    UnsupportedFormat { format: String },

    /// Format conversion produced something other than what was asked for
    #[error("Conversion mismatch: expected {expected}, engine produced {actual}")]
    ConversionMismatch { expected: String, actual: String },

    /// An image engine failed while executing a pipeline stage
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// Resource not found errors
    #[error("Not found: {resource} with id {id}")]
    NotFound { resource: String, id: String },

    /// Resource already exists and must not be replaced
    #[error("Conflict: {resource} {id} already exists")]
    Conflict { resource: String, id: String },

    /// Requester does not own the resource
    #[error("Forbidden: {action} on {resource}")]
    Forbidden { action: String, resource: String },

    /// Blob, Metadata or Cache Store failure
    #[error("Upstream error: {service} - {message}")]
    Upstream { service: String, message: String },

    /// Generic internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Metadata Store (SeaORM) errors
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// Database errors from SeaORM
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Call exceeded the per-query timeout
    #[error("Query timed out after {timeout_ms}ms: {operation}")]
    Timeout { operation: String, timeout_ms: u128 },

    /// Record not found
    #[error("Record not found: {table} with {field} = {value}")]
    RecordNotFound {
        table: String,
        field: String,
        value: String,
    },
}

/// Blob Store errors
#[derive(Error, Debug)]
pub enum StorageError {
    /// Filename extension does not map to a supported image type
    #[error("Unsupported or bad image format: {extension}")]
    UnsupportedFormat { extension: String },

    /// Stored key is not usable as an object name
    #[error("Invalid object key: {key}")]
    InvalidKey { key: String },

    /// An object is already stored under the key
    #[error("Object already exists: {key}")]
    AlreadyExists { key: String },

    /// No object stored under the key
    #[error("Object not found: {key}")]
    ObjectNotFound { key: String },

    /// Signed URL failed verification
    #[error("Invalid signed url for {key}: {reason}")]
    InvalidSignature { key: String, reason: String },

    /// Configured public base URL cannot carry a blob path
    #[error("Invalid base url: {url}")]
    InvalidBaseUrl { url: String },

    /// Backing storage I/O failure
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Cache Store errors
#[derive(Error, Debug)]
pub enum CacheError {
    /// The cache backend could not be reached or failed the operation
    #[error("Cache backend unavailable: {message}")]
    Unavailable { message: String },

    /// Cached payload could not be (de)serialized
    #[error("Cache serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Image engine failure tagged with the pipeline stage that produced it
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{stage} stage failed: {message}")]
pub struct EngineError {
    pub stage: String,
    pub message: String,
}

impl EngineError {
    pub fn new<S: Into<String>, M: ToString>(stage: S, message: M) -> Self {
        Self {
            stage: stage.into(),
            message: message.to_string(),
        }
    }
}

/// Convenience methods for creating common error types
impl AppError {
    /// Create a validation error with a custom message
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn unsupported_format<S: Into<String>>(format: S) -> Self {
        Self::UnsupportedFormat {
            format: format.into(),
        }
    }

    pub fn not_found<R: Into<String>, I: ToString>(resource: R, id: I) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id: id.to_string(),
        }
    }

    pub fn conflict<R: Into<String>, I: ToString>(resource: R, id: I) -> Self {
        Self::Conflict {
            resource: resource.into(),
            id: id.to_string(),
        }
    }

    pub fn forbidden<A: Into<String>, R: Into<String>>(action: A, resource: R) -> Self {
        Self::Forbidden {
            action: action.into(),
            resource: resource.into(),
        }
    }

    /// Create an upstream (store) error
    pub fn upstream<S: Into<String>, M: ToString>(service: S, message: M) -> Self {
        Self::Upstream {
            service: service.into(),
            message: message.to_string(),
        }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether the error is the caller's fault (4xx-equivalent)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Validation { .. }
                | Self::UnsupportedFormat { .. }
                | Self::NotFound { .. }
                | Self::Conflict { .. }
                | Self::Forbidden { .. }
                | Self::Engine(_)
        )
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::RecordNotFound { table, value, .. } => Self::NotFound {
                resource: table,
                id: value,
            },
            other => Self::upstream("metadata_store", other),
        }
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::UnsupportedFormat { extension } => Self::UnsupportedFormat {
                format: extension,
            },
            StorageError::InvalidKey { key } => Self::validation(format!("invalid filename: {key}")),
            StorageError::ObjectNotFound { key } => Self::not_found("blob", key),
            StorageError::AlreadyExists { key } => Self::conflict("blob", key),
            StorageError::InvalidSignature { .. } => Self::forbidden("read", "blob"),
            other => Self::upstream("blob_store", other),
        }
    }
}

impl From<CacheError> for AppError {
    fn from(err: CacheError) -> Self {
        Self::upstream("cache_store", err)
    }
}
