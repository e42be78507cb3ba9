//! SQLite-backed [`ProgressStore`] implementation.
//!
//! One row per (user, boss) pair in the `boss_progress` table, upserted
//! whole on every save. Outcomes are stored as their wire strings and
//! attempt timestamps as epoch seconds.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use gauntlet_core::models::{BossProgress, Outcome};
use gauntlet_core::store::ProgressStore;

/// SQLite implementation of the [`ProgressStore`] trait.
///
/// Wraps a [`SqlitePool`] shared with the rest of the engine. Row-level
/// consistency comes from the caller serializing writes per (user, boss)
/// pair; this store does plain upserts.
pub struct SqliteProgressStore {
    pool: SqlitePool,
}

impl SqliteProgressStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProgressStore for SqliteProgressStore {
    async fn load_or_default(&self, user_id: &str, boss_id: &str) -> Result<BossProgress> {
        Ok(self
            .get(user_id, boss_id)
            .await?
            .unwrap_or_else(|| BossProgress::new(user_id, boss_id)))
    }

    async fn save(&self, progress: &BossProgress) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO boss_progress (user_id, boss_id, fail_streak, highest_hint_level,
                                       last_result, last_attempt_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(user_id, boss_id) DO UPDATE SET
                fail_streak = excluded.fail_streak,
                highest_hint_level = excluded.highest_hint_level,
                last_result = excluded.last_result,
                last_attempt_at = excluded.last_attempt_at
            "#,
        )
        .bind(&progress.user_id)
        .bind(&progress.boss_id)
        .bind(progress.fail_streak)
        .bind(progress.highest_hint_level)
        .bind(progress.last_result.map(|o| o.as_str()))
        .bind(progress.last_attempt_at.map(|dt| dt.timestamp()))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, user_id: &str, boss_id: &str) -> Result<Option<BossProgress>> {
        let row = sqlx::query(
            r#"
            SELECT fail_streak, highest_hint_level, last_result, last_attempt_at
            FROM boss_progress
            WHERE user_id = ? AND boss_id = ?
            "#,
        )
        .bind(user_id)
        .bind(boss_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| {
            let last_result: Option<String> = row.get("last_result");
            let last_attempt_at: Option<i64> = row.get("last_attempt_at");
            BossProgress {
                user_id: user_id.to_string(),
                boss_id: boss_id.to_string(),
                fail_streak: row.get("fail_streak"),
                highest_hint_level: row.get("highest_hint_level"),
                last_result: last_result.and_then(|s| s.parse::<Outcome>().ok()),
                last_attempt_at: last_attempt_at
                    .and_then(|ts| chrono::DateTime::from_timestamp(ts, 0)),
            }
        }))
    }
}
