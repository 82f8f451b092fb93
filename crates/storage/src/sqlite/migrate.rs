use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// Runs a single, consolidated migration for the current schema.
///
/// Creates the question bank, threshold configuration, per-user tier
/// progress, and the profile skill-tier projection.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    // Version 1: full schema.
    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS assessment_questions (
                    id TEXT PRIMARY KEY,
                    category TEXT NOT NULL,
                    sub_category TEXT NOT NULL,
                    tier_level INTEGER NOT NULL CHECK (tier_level BETWEEN 1 AND 4),
                    question_text TEXT NOT NULL,
                    media_url TEXT,
                    options TEXT NOT NULL,
                    is_production INTEGER NOT NULL DEFAULT 0
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_questions_lookup
                ON assessment_questions (category, sub_category, tier_level, is_production);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS assessment_thresholds (
                    category TEXT NOT NULL,
                    sub_category TEXT NOT NULL,
                    instrument TEXT NOT NULL,
                    pass_threshold INTEGER NOT NULL CHECK (pass_threshold BETWEEN 0 AND 100),
                    is_production INTEGER NOT NULL DEFAULT 1,
                    PRIMARY KEY (category, sub_category, instrument)
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS tier_progress (
                    user_id TEXT NOT NULL,
                    category TEXT NOT NULL,
                    sub_category TEXT NOT NULL,
                    instrument TEXT NOT NULL,
                    current_tier INTEGER NOT NULL,
                    highest_tier_reached INTEGER NOT NULL,
                    total_score INTEGER NOT NULL,
                    questions_answered INTEGER NOT NULL,
                    completed_at TEXT,
                    PRIMARY KEY (user_id, category, sub_category)
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS profiles (
                    user_id TEXT PRIMARY KEY,
                    skill_tiers TEXT NOT NULL DEFAULT '{}'
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)")
            .bind(1_i64)
            .bind(Utc::now().to_rfc3339())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
    }

    Ok(())
}
