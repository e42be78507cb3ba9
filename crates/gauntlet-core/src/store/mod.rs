//! Storage abstraction for Gauntlet.
//!
//! Two small traits cover everything the coordinators persist:
//! [`SessionStore`] for ephemeral per-session dialogue state and
//! [`ProgressStore`] for durable per-(user, boss) progress records.
//! Splitting them lets deployments mix backends, in practice an
//! in-memory session store over a SQLite progress store.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{BossProgress, SessionPatch, SessionState};

/// Ephemeral per-session state.
///
/// Sessions materialize on first touch: reading or patching an unknown
/// id yields a default [`SessionState`] rather than an error.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`get`](SessionStore::get) | Read (and materialize) a session |
/// | [`update`](SessionStore::update) | Apply a partial patch, returning the post-patch state |
/// | [`clear`](SessionStore::clear) | Drop a session entirely |
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Read a session, materializing a default one if absent.
    async fn get(&self, session_id: &str) -> Result<SessionState>;

    /// Apply a patch to a session and return the resulting state.
    ///
    /// Only populated patch fields are written; everything else keeps
    /// its current value.
    async fn update(&self, session_id: &str, patch: SessionPatch) -> Result<SessionState>;

    /// Remove a session. Removing an unknown id is not an error.
    async fn clear(&self, session_id: &str) -> Result<()>;
}

/// Durable per-(user, boss) progress.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`load_or_default`](ProgressStore::load_or_default) | Read a record, or a fresh default |
/// | [`save`](ProgressStore::save) | Upsert a record |
/// | [`get`](ProgressStore::get) | Read a record if one exists |
#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// Read the record for a (user, boss) pair, or a fresh default with
    /// zeroed counters if none exists yet.
    async fn load_or_default(&self, user_id: &str, boss_id: &str) -> Result<BossProgress>;

    /// Insert or update a record, keyed by its (user, boss) pair.
    async fn save(&self, progress: &BossProgress) -> Result<()>;

    /// Read the record for a (user, boss) pair, if one exists.
    async fn get(&self, user_id: &str, boss_id: &str) -> Result<Option<BossProgress>>;
}
