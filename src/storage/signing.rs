//! Time-limited signed blob URLs
//!
//! `{base_url}/blobs/{key}?expires={unix}&signature={hex}` where the signature
//! is SHA-256 over the secret, the key and the expiry.

use std::time::Duration;

use chrono::Utc;
use sha2::{Digest, Sha256};
use url::Url;

use crate::errors::{StorageError, StorageResult};

#[derive(Debug, Clone)]
pub struct UrlSigner {
    base_url: Url,
    secret: String,
}

impl UrlSigner {
    pub fn new(base_url: &str, secret: impl Into<String>) -> StorageResult<Self> {
        let parsed = Url::parse(base_url).map_err(|_| StorageError::InvalidBaseUrl {
            url: base_url.to_string(),
        })?;
        if parsed.cannot_be_a_base() {
            return Err(StorageError::InvalidBaseUrl {
                url: base_url.to_string(),
            });
        }
        Ok(Self {
            base_url: parsed,
            secret: secret.into(),
        })
    }

    fn signature(&self, key: &str, expires: i64) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.secret.as_bytes());
        hasher.update(b"\n");
        hasher.update(key.as_bytes());
        hasher.update(b"\n");
        hasher.update(expires.to_string().as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Signed URL for `key` valid for `ttl` from now
    pub fn sign(&self, key: &str, ttl: Duration) -> StorageResult<String> {
        let expires = Utc::now().timestamp() + i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX / 2);
        self.sign_until(key, expires)
    }

    pub fn sign_until(&self, key: &str, expires: i64) -> StorageResult<String> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| StorageError::InvalidBaseUrl {
                url: self.base_url.to_string(),
            })?
            .pop_if_empty()
            .push("blobs")
            .push(key);
        url.query_pairs_mut()
            .append_pair("expires", &expires.to_string())
            .append_pair("signature", &self.signature(key, expires));
        Ok(url.into())
    }

    pub fn verify(&self, key: &str, expires: i64, signature: &str) -> StorageResult<()> {
        self.verify_at(key, expires, signature, Utc::now().timestamp())
    }

    pub fn verify_at(&self, key: &str, expires: i64, signature: &str, now: i64) -> StorageResult<()> {
        let expected = self.signature(key, expires);
        let matches = expected.len() == signature.len()
            && expected
                .bytes()
                .zip(signature.bytes())
                .fold(0u8, |acc, (a, b)| acc | (a ^ b))
                == 0;
        if !matches {
            return Err(StorageError::InvalidSignature {
                key: key.to_string(),
                reason: "signature mismatch".to_string(),
            });
        }
        if now > expires {
            return Err(StorageError::InvalidSignature {
                key: key.to_string(),
                reason: "expired".to_string(),
            });
        }
        Ok(())
    }
}
