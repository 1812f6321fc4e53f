//! Centralized error handling for the image transform service
//!
//! Every layer has its own error enum; they all funnel into [`AppError`],
//! which is the taxonomy the web layer maps onto HTTP status codes.
//!
//! # Error Categories
//!
//! - **Validation / UnsupportedFormat**: malformed transformation requests
//! - **ConversionMismatch / Engine**: an image engine misbehaved or rejected input
//! - **NotFound / Forbidden**: resource lookups and ownership checks
//! - **Upstream**: Blob, Metadata or Cache Store failures
//! - **Internal**: anything unclassified
//!
//! # Usage
//!
//! ```rust
//! use image_transform_service::errors::{AppError, AppResult};
//!
//! fn example_function(quality: i32) -> AppResult<i32> {
//!     if quality > 1000 {
//!         return Err(AppError::validation("quality is absurd"));
//!     }
//!     Ok(quality)
//! }
//! ```

pub mod types;

pub use types::*;

/// Convenience type alias for Results using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Convenience type alias for Repository Results
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Convenience type alias for Blob Store Results
pub type StorageResult<T> = Result<T, StorageError>;

/// Convenience type alias for Cache Store Results
pub type CacheResult<T> = Result<T, CacheError>;
