//! # Advisory Lock Manager
//!
//! Per-key async locks serializing mutations on a single player or a
//! single phraseset. Keys are plain strings (`player:{id}`,
//! `phraseset:{id}`), mirroring how the original deployment keyed its
//! distributed locks; in-process this is a map of `tokio` mutexes.
//!
//! Acquisition has a bounded wait. A caller that cannot get the lock
//! within the configured timeout receives `GameError::LockTimeout` and is
//! expected to retry; nothing is mutated on that path.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::error::GameError;

/// Owned guard for an advisory lock; dropping it releases the lock.
pub type LockGuard = OwnedMutexGuard<()>;

pub struct LockManager {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    timeout: Duration,
}

impl LockManager {
    pub fn new(timeout: Duration) -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
            timeout,
        }
    }

    /// Acquires the named lock, waiting at most the configured timeout.
    ///
    /// # Arguments
    /// * `name` - Lock key; use the `player_key` / `phraseset_key` /
    ///   `prompt_key` helpers so every caller agrees on the spelling
    ///
    /// # Returns
    /// * `Ok(LockGuard)` - Held until dropped
    /// * `Err(LockTimeout)` - The wait expired; nothing was mutated and
    ///   the caller may retry
    pub async fn acquire(&self, name: &str) -> Result<LockGuard, GameError> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };

        match tokio::time::timeout(self.timeout, lock.lock_owned()).await {
            Ok(guard) => Ok(guard),
            Err(_) => {
                tracing::warn!("lock acquisition timed out: {}", name);
                Err(GameError::LockTimeout)
            }
        }
    }

    /// Lock key for all per-player critical sections.
    pub fn player_key(player_id: uuid::Uuid) -> String {
        format!("player:{player_id}")
    }

    /// Lock key for per-phraseset vote and finalization sections.
    pub fn phraseset_key(phraseset_id: uuid::Uuid) -> String {
        format!("phraseset:{phraseset_id}")
    }

    /// Lock key serializing phraseset construction for one prompt.
    pub fn prompt_key(prompt_round_id: uuid::Uuid) -> String {
        format!("prompt:{prompt_round_id}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn serializes_same_key() {
        let manager = LockManager::new(Duration::from_secs(1));
        let guard = manager.acquire("player:a").await.unwrap();
        // Second acquisition on the same key must wait and time out.
        let second = manager.acquire("player:a").await;
        assert!(matches!(second, Err(GameError::LockTimeout)));
        drop(guard);
        assert!(manager.acquire("player:a").await.is_ok());
    }

    #[tokio::test]
    async fn distinct_keys_do_not_contend() {
        let manager = LockManager::new(Duration::from_secs(1));
        let _a = manager.acquire("player:a").await.unwrap();
        let b = manager.acquire("player:b").await;
        assert!(b.is_ok());
    }
}
