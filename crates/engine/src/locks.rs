//! Keyed async locks.
//!
//! Serializes work on the same key (an account id or a request id) while
//! letting different keys run in parallel. Every acquisition is bounded by a
//! timeout so a stuck holder surfaces as `EngineError::Timeout` instead of a
//! hang.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::{EngineError, ResultEngine};

/// Idle slots are pruned once the table grows past this many keys.
const PRUNE_THRESHOLD: usize = 1024;

#[derive(Debug, Default)]
pub(crate) struct KeyedLocks {
    slots: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl KeyedLocks {
    fn slot(&self, key: &str) -> Arc<AsyncMutex<()>> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        if slots.len() >= PRUNE_THRESHOLD {
            // A count of one means nobody holds or waits on the slot.
            slots.retain(|_, slot| Arc::strong_count(slot) > 1);
        }
        slots
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    pub(crate) async fn lock(
        &self,
        key: &str,
        timeout: Duration,
    ) -> ResultEngine<OwnedMutexGuard<()>> {
        let slot = self.slot(key);
        tokio::time::timeout(timeout, slot.lock_owned())
            .await
            .map_err(|_| EngineError::Timeout(format!("waiting for lock on \"{key}\"")))
    }

    /// Locks several keys in ascending order. Duplicates are locked once.
    pub(crate) async fn lock_all(
        &self,
        keys: &[&str],
        timeout: Duration,
    ) -> ResultEngine<Vec<OwnedMutexGuard<()>>> {
        let mut ordered = keys.to_vec();
        ordered.sort_unstable();
        ordered.dedup();

        let mut guards = Vec::with_capacity(ordered.len());
        for key in ordered {
            guards.push(self.lock(key, timeout).await?);
        }
        Ok(guards)
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
