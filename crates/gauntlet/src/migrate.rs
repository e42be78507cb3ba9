use anyhow::Result;
use sqlx::SqlitePool;

pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    // Create boss_progress table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS boss_progress (
            user_id TEXT NOT NULL,
            boss_id TEXT NOT NULL,
            fail_streak INTEGER NOT NULL DEFAULT 0,
            highest_hint_level INTEGER NOT NULL DEFAULT 0,
            last_result TEXT,
            last_attempt_at INTEGER,
            PRIMARY KEY (user_id, boss_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_boss_progress_user ON boss_progress(user_id)")
        .execute(pool)
        .await?;

    Ok(())
}
