//! Per-(club, formula version) recompute serialization.

use crate::domain::{ClubId, FormulaVersionId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use tokio::sync::{Mutex, OwnedMutexGuard};

type LockKey = (ClubId, FormulaVersionId);
type Registry = Arc<StdMutex<HashMap<LockKey, Arc<Mutex<()>>>>>;

/// Registry of async mutexes, one per `(club, formula version)`.
///
/// Two recomputes that would delete and insert events for the same version
/// must not interleave; runs on different keys proceed in parallel. An entry
/// lives only while a run holds or waits for it.
#[derive(Debug, Clone, Default)]
pub struct RecomputeLocks {
    inner: Registry,
}

/// Exclusive access to one key. Releasing it prunes the registry entry when
/// nobody else is waiting.
#[derive(Debug)]
pub struct RecomputeGuard {
    key: LockKey,
    registry: Registry,
    guard: Option<OwnedMutexGuard<()>>,
}

impl RecomputeLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `(club_id, formula_version_id)`.
    ///
    /// The lock is held until the returned guard is dropped.
    pub async fn acquire(
        &self,
        club_id: &ClubId,
        formula_version_id: FormulaVersionId,
    ) -> RecomputeGuard {
        let key = (club_id.clone(), formula_version_id);
        let lock = {
            let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            map.entry(key.clone()).or_default().clone()
        };
        let guard = lock.lock_owned().await;
        RecomputeGuard {
            key,
            registry: self.inner.clone(),
            guard: Some(guard),
        }
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Drop for RecomputeGuard {
    fn drop(&mut self) {
        // Release first so the registry's Arc is the only one left when idle.
        self.guard.take();
        let mut map = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        if map
            .get(&self.key)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            map.remove(&self.key);
        }
    }
}
