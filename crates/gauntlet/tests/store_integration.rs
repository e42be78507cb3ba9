//! Conformance tests for the store backends.
//!
//! The same checks run against the in-memory and SQLite progress stores
//! so both backends keep identical observable behavior.

use chrono::Utc;
use tempfile::TempDir;

use gauntlet::config::DbConfig;
use gauntlet::db;
use gauntlet::migrate;
use gauntlet::sqlite_store::SqliteProgressStore;
use gauntlet::store::memory::{MemoryProgressStore, MemorySessionStore};
use gauntlet::store::{ProgressStore, SessionStore};
use gauntlet::{Outcome, SessionPatch};

async fn check_progress_store(store: &dyn ProgressStore) {
    // Unknown pairs read as absent, or as fresh defaults
    assert!(store.get("user-1", "boss-a").await.unwrap().is_none());

    let fresh = store.load_or_default("user-1", "boss-a").await.unwrap();
    assert_eq!(fresh.user_id, "user-1");
    assert_eq!(fresh.boss_id, "boss-a");
    assert_eq!(fresh.fail_streak, 0);
    assert_eq!(fresh.highest_hint_level, 0);
    assert_eq!(fresh.last_result, None);
    assert_eq!(fresh.last_attempt_at, None);

    // load_or_default does not persist anything by itself
    assert!(store.get("user-1", "boss-a").await.unwrap().is_none());

    // Save and read back
    let at = Utc::now();
    let mut progress = fresh;
    progress.apply(Outcome::Fail, at);
    progress.highest_hint_level = 2;
    store.save(&progress).await.unwrap();

    let got = store.get("user-1", "boss-a").await.unwrap().unwrap();
    assert_eq!(got.fail_streak, 1);
    assert_eq!(got.highest_hint_level, 2);
    assert_eq!(got.last_result, Some(Outcome::Fail));
    // Attempt times may lose subsecond precision in storage
    assert_eq!(got.last_attempt_at.unwrap().timestamp(), at.timestamp());

    // Saving again updates the same record rather than adding one
    let mut updated = got;
    updated.apply(Outcome::Win, Utc::now());
    store.save(&updated).await.unwrap();

    let got = store.load_or_default("user-1", "boss-a").await.unwrap();
    assert_eq!(got.fail_streak, 0);
    assert_eq!(got.last_result, Some(Outcome::Win));
    assert_eq!(got.highest_hint_level, 2);

    // Other pairs are untouched
    assert!(store.get("user-1", "boss-b").await.unwrap().is_none());
    assert!(store.get("user-2", "boss-a").await.unwrap().is_none());
}

#[tokio::test]
async fn test_memory_progress_store_conformance() {
    let store = MemoryProgressStore::new();
    check_progress_store(&store).await;
}

#[tokio::test]
async fn test_sqlite_progress_store_conformance() {
    let tmp = TempDir::new().unwrap();
    let db = DbConfig {
        path: tmp.path().join("progress.sqlite"),
    };
    let pool = db::connect(&db).await.unwrap();
    migrate::run_migrations(&pool).await.unwrap();

    let store = SqliteProgressStore::new(pool);
    check_progress_store(&store).await;
}

#[tokio::test]
async fn test_sqlite_store_survives_reconnect() {
    let tmp = TempDir::new().unwrap();
    let db = DbConfig {
        path: tmp.path().join("progress.sqlite"),
    };

    {
        let pool = db::connect(&db).await.unwrap();
        migrate::run_migrations(&pool).await.unwrap();
        let store = SqliteProgressStore::new(pool);

        let mut progress = store.load_or_default("user-1", "boss-a").await.unwrap();
        progress.apply(Outcome::Fail, Utc::now());
        store.save(&progress).await.unwrap();
    }

    // Migrations are idempotent and data survives a new pool
    let pool = db::connect(&db).await.unwrap();
    migrate::run_migrations(&pool).await.unwrap();
    let store = SqliteProgressStore::new(pool);

    let got = store.get("user-1", "boss-a").await.unwrap().unwrap();
    assert_eq!(got.fail_streak, 1);
    assert_eq!(got.last_result, Some(Outcome::Fail));
}

#[tokio::test]
async fn test_memory_session_store() {
    let store = MemorySessionStore::new();

    // Reads materialize defaults
    let state = store.get("session-1").await.unwrap();
    assert!(!state.greeted);
    assert!(state.selected_track.is_none());

    // Patching an unknown id creates the session
    let patch: SessionPatch = serde_json::from_value(serde_json::json!({
        "greeted": true,
        "selected_track": "cloud"
    }))
    .unwrap();
    let state = store.update("session-2", patch).await.unwrap();
    assert!(state.greeted);

    // Partial patches keep other fields
    let patch: SessionPatch =
        serde_json::from_value(serde_json::json!({"judge_intro_done": true})).unwrap();
    let state = store.update("session-2", patch).await.unwrap();
    assert!(state.greeted);
    assert!(state.judge_intro_done);

    // Clear drops the session; the next read is a fresh default
    store.clear("session-2").await.unwrap();
    let state = store.get("session-2").await.unwrap();
    assert!(!state.greeted);

    // Clearing an unknown id is not an error
    store.clear("session-never").await.unwrap();
}
