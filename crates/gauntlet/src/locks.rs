//! Per-(user, boss) locking for outcome recording.
//!
//! Progress updates are read-modify-write against a single row.
//! Serializing them per (user, boss) pair keeps concurrent outcome
//! reports for the same player and boss from losing streak increments,
//! while unrelated pairs stay fully parallel.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

/// Map size at which stale entries are swept before inserting.
const SWEEP_THRESHOLD: usize = 1024;

/// Lazily-created mutexes keyed by (user, boss) pair.
#[derive(Default)]
pub struct KeyedLocks {
    locks: RwLock<HashMap<(String, String), Arc<Mutex<()>>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self {
            locks: RwLock::new(HashMap::new()),
        }
    }

    /// Get or create the lock for a (user, boss) pair.
    pub async fn acquire(&self, user_id: &str, boss_id: &str) -> Arc<Mutex<()>> {
        let key = (user_id.to_string(), boss_id.to_string());

        // Fast path: lock already exists
        {
            let locks = self.locks.read().await;
            if let Some(lock) = locks.get(&key) {
                return lock.clone();
            }
        }

        // Slow path: create the lock. Once the map outgrows the
        // threshold, drop entries nobody holds a clone of first.
        let mut locks = self.locks.write().await;
        if locks.len() > SWEEP_THRESHOLD {
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        }
        locks
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}
