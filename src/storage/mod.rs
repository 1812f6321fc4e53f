//! Blob Store: durable bytes for uploaded and transformed images
//!
//! Objects are addressed by a stored key derived from the upload filename.
//! `replace` overwrites in place; there is no versioning.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::errors::{StorageError, StorageResult};
use crate::models::FormatTable;

pub mod local;
pub mod memory;
pub mod signing;

pub use local::LocalBlobStore;
pub use memory::InMemoryBlobStore;
pub use signing::UrlSigner;

/// Result of a successful `put`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    pub key: String,
    pub url: String,
    pub content_type: &'static str,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store a new object under a key derived from `original_filename`.
    /// Fails with `AlreadyExists` rather than overwrite an existing key.
    async fn put(&self, original_filename: &str, bytes: Bytes) -> StorageResult<StoredBlob>;

    async fn get(&self, key: &str) -> StorageResult<Bytes>;

    /// Overwrite an existing object
    async fn replace(&self, key: &str, bytes: Bytes) -> StorageResult<()>;

    async fn signed_url(&self, key: &str, ttl: Duration) -> StorageResult<String>;

    /// Check a signature produced by `signed_url`
    fn verify(&self, key: &str, expires: i64, signature: &str) -> StorageResult<()>;
}

/// Key derivation shared by the store implementations
#[derive(Debug, Clone)]
pub struct KeyPolicy {
    prefix: String,
    formats: Arc<FormatTable>,
}

impl KeyPolicy {
    pub fn new(prefix: impl Into<String>, formats: Arc<FormatTable>) -> Self {
        Self {
            prefix: prefix.into(),
            formats,
        }
    }

    /// Fixed prefix plus the original filename. Fails on unknown extensions
    /// before anything is written.
    pub fn derive(&self, original_filename: &str) -> StorageResult<(String, &'static str)> {
        validate_key(original_filename)?;
        let content_type = self.formats.mime_for_filename(original_filename).ok_or_else(|| {
            StorageError::UnsupportedFormat {
                extension: original_filename
                    .rsplit_once('.')
                    .map(|(_, ext)| ext.to_ascii_lowercase())
                    .unwrap_or_default(),
            }
        })?;
        Ok((format!("{}{}", self.prefix, original_filename), content_type))
    }
}

/// Keys are single path components
pub fn validate_key(key: &str) -> StorageResult<()> {
    let invalid = key.is_empty()
        || key.starts_with('.')
        || key.contains(['/', '\\', '\0'])
        || key.contains("..");
    if invalid {
        return Err(StorageError::InvalidKey {
            key: key.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn policy() -> KeyPolicy {
        KeyPolicy::new("uploaded_", Arc::new(FormatTable::default()))
    }

    #[rstest]
    #[case("cat.jpg", "uploaded_cat.jpg", "image/jpeg")]
    #[case("scan.TIF", "uploaded_scan.TIF", "image/tiff")]
    #[case("logo.png", "uploaded_logo.png", "image/png")]
    fn test_derive_key(#[case] filename: &str, #[case] key: &str, #[case] mime: &str) {
        assert_eq!(policy().derive(filename).unwrap(), (key.to_string(), mime));
    }

    #[rstest]
    #[case("cat.gif", "gif")]
    #[case("README", "")]
    fn test_unknown_extension(#[case] filename: &str, #[case] extension: &str) {
        assert!(matches!(
            policy().derive(filename),
            Err(StorageError::UnsupportedFormat { extension: ref e }) if e == extension
        ));
    }

    #[rstest]
    #[case("")]
    #[case("../etc/passwd.png")]
    #[case("dir/cat.png")]
    #[case("dir\\cat.png")]
    #[case(".hidden.png")]
    fn test_invalid_keys(#[case] key: &str) {
        assert!(matches!(validate_key(key), Err(StorageError::InvalidKey { .. })));
    }
}
