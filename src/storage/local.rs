use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::{debug, info};

use super::{BlobStore, KeyPolicy, StoredBlob, UrlSigner, validate_key};
use crate::errors::{StorageError, StorageResult};

/// Blob Store on the local filesystem, one file per key
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
    keys: KeyPolicy,
    signer: UrlSigner,
    upload_url_ttl: Duration,
}

impl LocalBlobStore {
    pub async fn new(
        root: impl Into<PathBuf>,
        keys: KeyPolicy,
        signer: UrlSigner,
        upload_url_ttl: Duration,
    ) -> StorageResult<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        info!(path = %root.display(), "blob store ready");
        Ok(Self {
            root,
            keys,
            signer,
            upload_url_ttl,
        })
    }

    fn path_for(&self, key: &str) -> StorageResult<PathBuf> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }

    /// Write through a temp file so readers never see a half-written object
    async fn write_atomic(&self, path: &Path, bytes: &[u8]) -> StorageResult<()> {
        let tmp = path.with_extension(format!("tmp-{}", uuid::Uuid::new_v4()));
        tokio::fs::write(&tmp, bytes).await?;
        if let Err(e) = tokio::fs::rename(&tmp, path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }

    /// Publish a fully written temp file under `path` only if nothing is there yet
    async fn write_new(&self, key: &str, path: &Path, bytes: &[u8]) -> StorageResult<()> {
        let tmp = path.with_extension(format!("tmp-{}", uuid::Uuid::new_v4()));
        tokio::fs::write(&tmp, bytes).await?;
        let linked = tokio::fs::hard_link(&tmp, path).await;
        let _ = tokio::fs::remove_file(&tmp).await;
        match linked {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Err(StorageError::AlreadyExists {
                key: key.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }
}

fn not_found(key: &str, err: std::io::Error) -> StorageError {
    if err.kind() == ErrorKind::NotFound {
        StorageError::ObjectNotFound {
            key: key.to_string(),
        }
    } else {
        StorageError::Io(err)
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(&self, original_filename: &str, bytes: Bytes) -> StorageResult<StoredBlob> {
        let (key, content_type) = self.keys.derive(original_filename)?;
        let path = self.path_for(&key)?;
        self.write_new(&key, &path, &bytes).await?;
        let url = self.signer.sign(&key, self.upload_url_ttl)?;
        debug!(key = %key, bytes = bytes.len(), content_type, "stored blob");
        Ok(StoredBlob {
            key,
            url,
            content_type,
        })
    }

    async fn get(&self, key: &str) -> StorageResult<Bytes> {
        let path = self.path_for(key)?;
        let data = tokio::fs::read(&path).await.map_err(|e| not_found(key, e))?;
        Ok(Bytes::from(data))
    }

    async fn replace(&self, key: &str, bytes: Bytes) -> StorageResult<()> {
        let path = self.path_for(key)?;
        tokio::fs::metadata(&path)
            .await
            .map_err(|e| not_found(key, e))?;
        self.write_atomic(&path, &bytes).await?;
        debug!(key = %key, bytes = bytes.len(), "replaced blob");
        Ok(())
    }

    async fn signed_url(&self, key: &str, ttl: Duration) -> StorageResult<String> {
        validate_key(key)?;
        self.signer.sign(key, ttl)
    }

    fn verify(&self, key: &str, expires: i64, signature: &str) -> StorageResult<()> {
        validate_key(key)?;
        self.signer.verify(key, expires, signature)
    }
}
