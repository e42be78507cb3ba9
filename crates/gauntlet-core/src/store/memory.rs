//! In-memory store implementations for testing and single-process use.
//!
//! Uses `HashMap` behind `std::sync::RwLock` for thread safety. Guards
//! are held only for the duration of each map operation, never across an
//! await point.

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{BossProgress, SessionPatch, SessionState};

use super::{ProgressStore, SessionStore};

/// In-memory [`SessionStore`].
///
/// Session state is ephemeral by design, so this is also the production
/// backend for engines that keep sessions in-process.
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, SessionState>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, session_id: &str) -> Result<SessionState> {
        let mut sessions = self.sessions.write().unwrap();
        let state = sessions.entry(session_id.to_string()).or_default();
        Ok(state.clone())
    }

    async fn update(&self, session_id: &str, patch: SessionPatch) -> Result<SessionState> {
        let mut sessions = self.sessions.write().unwrap();
        let state = sessions.entry(session_id.to_string()).or_default();
        state.apply(patch);
        Ok(state.clone())
    }

    async fn clear(&self, session_id: &str) -> Result<()> {
        let mut sessions = self.sessions.write().unwrap();
        sessions.remove(session_id);
        Ok(())
    }
}

/// In-memory [`ProgressStore`] for tests.
///
/// Progress is meant to outlive the process; production engines use the
/// SQLite backend from the `gauntlet` crate instead.
pub struct MemoryProgressStore {
    records: RwLock<HashMap<(String, String), BossProgress>>,
}

impl MemoryProgressStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryProgressStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProgressStore for MemoryProgressStore {
    async fn load_or_default(&self, user_id: &str, boss_id: &str) -> Result<BossProgress> {
        let records = self.records.read().unwrap();
        Ok(records
            .get(&(user_id.to_string(), boss_id.to_string()))
            .cloned()
            .unwrap_or_else(|| BossProgress::new(user_id, boss_id)))
    }

    async fn save(&self, progress: &BossProgress) -> Result<()> {
        let mut records = self.records.write().unwrap();
        records.insert(
            (progress.user_id.clone(), progress.boss_id.clone()),
            progress.clone(),
        );
        Ok(())
    }

    async fn get(&self, user_id: &str, boss_id: &str) -> Result<Option<BossProgress>> {
        let records = self.records.read().unwrap();
        Ok(records
            .get(&(user_id.to_string(), boss_id.to_string()))
            .cloned())
    }
}
