use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;

use super::{BlobStore, KeyPolicy, StoredBlob, UrlSigner, validate_key};
use crate::errors::{StorageError, StorageResult};

/// Process-local Blob Store, used for tests and ephemeral deployments
#[derive(Debug)]
pub struct InMemoryBlobStore {
    objects: RwLock<HashMap<String, Bytes>>,
    keys: KeyPolicy,
    signer: UrlSigner,
    upload_url_ttl: Duration,
}

impl InMemoryBlobStore {
    pub fn new(keys: KeyPolicy, signer: UrlSigner, upload_url_ttl: Duration) -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
            keys,
            signer,
            upload_url_ttl,
        }
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn put(&self, original_filename: &str, bytes: Bytes) -> StorageResult<StoredBlob> {
        let (key, content_type) = self.keys.derive(original_filename)?;
        match self.objects.write().await.entry(key.clone()) {
            Entry::Occupied(_) => return Err(StorageError::AlreadyExists { key }),
            Entry::Vacant(slot) => {
                slot.insert(bytes);
            }
        }
        let url = self.signer.sign(&key, self.upload_url_ttl)?;
        Ok(StoredBlob {
            key,
            url,
            content_type,
        })
    }

    async fn get(&self, key: &str) -> StorageResult<Bytes> {
        self.objects
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::ObjectNotFound {
                key: key.to_string(),
            })
    }

    async fn replace(&self, key: &str, bytes: Bytes) -> StorageResult<()> {
        match self.objects.write().await.get_mut(key) {
            Some(slot) => {
                *slot = bytes;
                Ok(())
            }
            None => Err(StorageError::ObjectNotFound {
                key: key.to_string(),
            }),
        }
    }

    async fn signed_url(&self, key: &str, ttl: Duration) -> StorageResult<String> {
        validate_key(key)?;
        self.signer.sign(key, ttl)
    }

    fn verify(&self, key: &str, expires: i64, signature: &str) -> StorageResult<()> {
        self.signer.verify(key, expires, signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FormatTable;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_replace_requires_existing_object() {
        let store = InMemoryBlobStore::new(
            KeyPolicy::new("uploaded_", Arc::new(FormatTable::default())),
            UrlSigner::new("http://localhost", "s").unwrap(),
            Duration::from_secs(60),
        );

        assert!(store.replace("uploaded_a.png", Bytes::new()).await.is_err());
        let stored = store.put("a.png", Bytes::from_static(b"1")).await.unwrap();
        store.replace(&stored.key, Bytes::from_static(b"2")).await.unwrap();
        assert_eq!(store.get(&stored.key).await.unwrap(), Bytes::from_static(b"2"));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_put_rejects_taken_key() {
        let store = InMemoryBlobStore::new(
            KeyPolicy::new("uploaded_", Arc::new(FormatTable::default())),
            UrlSigner::new("http://localhost", "s").unwrap(),
            Duration::from_secs(60),
        );

        store.put("a.png", Bytes::from_static(b"1")).await.unwrap();
        assert!(matches!(
            store.put("a.png", Bytes::from_static(b"2")).await,
            Err(StorageError::AlreadyExists { .. })
        ));
        assert_eq!(store.get("uploaded_a.png").await.unwrap(), Bytes::from_static(b"1"));
    }
}
