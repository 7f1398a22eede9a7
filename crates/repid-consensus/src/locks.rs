// crates/repid-consensus/src/locks.rs
//
// Per-entity async locks serializing the aggregation read-modify-write.
//
// Submissions for different targets never contend. The map only holds an
// entry while someone references it; idle entries are pruned once the map
// grows past `PRUNE_THRESHOLD`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use repid_core::{EntityKey, RepIdError};

const PRUNE_THRESHOLD: usize = 1_024;

#[derive(Debug, Default)]
pub struct EntityLocks {
    locks: Mutex<HashMap<EntityKey, Arc<AsyncMutex<()>>>>,
}

impl EntityLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait up to `timeout` for exclusive access to `entity`.
    ///
    /// Expiry maps to `RepIdError::Concurrency`, which callers treat as retryable.
    pub async fn acquire(
        &self,
        entity: &EntityKey,
        timeout: Duration,
    ) -> Result<OwnedMutexGuard<()>, RepIdError> {
        let lock = {
            let mut map = self
                .locks
                .lock()
                .map_err(|e| RepIdError::Storage(format!("entity lock map poisoned: {}", e)))?;
            if map.len() > PRUNE_THRESHOLD {
                map.retain(|_, l| Arc::strong_count(l) > 1);
            }
            map.entry(*entity).or_default().clone()
        };

        match tokio::time::timeout(timeout, lock.lock_owned()).await {
            Ok(guard) => Ok(guard),
            Err(_) => {
                tracing::warn!(
                    entity = %entity,
                    timeout_ms = timeout.as_millis() as u64,
                    "Timed out waiting for aggregation lock"
                );
                Err(RepIdError::Concurrency(format!(
                    "aggregation lock for {} not acquired within {} ms",
                    entity,
                    timeout.as_millis()
                )))
            }
        }
    }

    /// Number of tracked entities.
    pub fn len(&self) -> usize {
        self.locks.lock().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use repid_core::EntityType;

    fn key(id: i64) -> EntityKey {
        EntityKey::new(EntityType::Agent, id)
    }

    #[tokio::test]
    async fn second_holder_times_out() {
        let locks = EntityLocks::new();
        let _held = locks.acquire(&key(1), Duration::from_millis(50)).await.unwrap();
        let err = locks
            .acquire(&key(1), Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(matches!(err, RepIdError::Concurrency(_)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn different_entities_do_not_contend() {
        let locks = EntityLocks::new();
        let _a = locks.acquire(&key(1), Duration::from_millis(50)).await.unwrap();
        let _b = locks.acquire(&key(2), Duration::from_millis(50)).await.unwrap();
        assert_eq!(locks.len(), 2);
    }

    #[tokio::test]
    async fn released_lock_can_be_reacquired() {
        let locks = EntityLocks::new();
        {
            let _g = locks.acquire(&key(1), Duration::from_millis(50)).await.unwrap();
        }
        assert!(locks.acquire(&key(1), Duration::from_millis(50)).await.is_ok());
    }
}
