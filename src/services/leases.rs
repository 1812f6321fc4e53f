//! Per-image leases
//!
//! An in-process keyed mutex: holding the guard for an image id excludes any
//! other holder for the same id. Single-process deployments only.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

pub type ImageLease = OwnedMutexGuard<()>;

#[derive(Debug, Default)]
pub struct ImageLeases {
    locks: Mutex<HashMap<i64, Weak<AsyncMutex<()>>>>,
}

impl ImageLeases {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `image_id`; released when the guard drops
    pub async fn acquire(&self, image_id: i64) -> ImageLease {
        self.lock_for(image_id).lock_owned().await
    }

    fn lock_for(&self, image_id: i64) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(existing) = locks.get(&image_id).and_then(Weak::upgrade) {
            return existing;
        }
        locks.retain(|_, weak| weak.strong_count() > 0);
        let lock = Arc::new(AsyncMutex::new(()));
        locks.insert(image_id, Arc::downgrade(&lock));
        lock
    }

    /// Ids with a live lease or waiter
    pub fn active(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .values()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_same_id_is_exclusive() {
        let leases = ImageLeases::new();
        let held = leases.acquire(5).await;

        assert!(
            timeout(Duration::from_millis(50), leases.acquire(5))
                .await
                .is_err()
        );

        drop(held);
        assert!(
            timeout(Duration::from_millis(50), leases.acquire(5))
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_different_ids_do_not_block() {
        let leases = ImageLeases::new();
        let _a = leases.acquire(1).await;
        assert!(
            timeout(Duration::from_millis(50), leases.acquire(2))
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_released_leases_are_forgotten() {
        let leases = ImageLeases::new();
        {
            let _a = leases.acquire(1).await;
            let _b = leases.acquire(2).await;
            assert_eq!(leases.active(), 2);
        }
        assert_eq!(leases.active(), 0);
    }
}
