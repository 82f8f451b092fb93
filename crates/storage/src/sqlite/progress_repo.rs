use assess_core::model::ProgressRecord;
use chrono::{DateTime, Utc};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{ser, u8_from_i64, u32_from_i64};
use crate::repository::{ProgressRepository, StorageError};

fn map_progress_row(row: &sqlx::sqlite::SqliteRow) -> Result<ProgressRecord, StorageError> {
    let completed_at: Option<String> = row.try_get("completed_at").map_err(ser)?;
    let completed_at = completed_at
        .map(|raw| {
            DateTime::parse_from_rfc3339(&raw)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(ser)
        })
        .transpose()?;

    Ok(ProgressRecord {
        user_id: row.try_get("user_id").map_err(ser)?,
        category: row.try_get("category").map_err(ser)?,
        sub_category: row.try_get("sub_category").map_err(ser)?,
        instrument: row.try_get("instrument").map_err(ser)?,
        current_tier: u8_from_i64(
            "current_tier",
            row.try_get::<i64, _>("current_tier").map_err(ser)?,
        )?,
        highest_tier_reached: u8_from_i64(
            "highest_tier_reached",
            row.try_get::<i64, _>("highest_tier_reached").map_err(ser)?,
        )?,
        total_score: u32_from_i64(
            "total_score",
            row.try_get::<i64, _>("total_score").map_err(ser)?,
        )?,
        questions_answered: u32_from_i64(
            "questions_answered",
            row.try_get::<i64, _>("questions_answered").map_err(ser)?,
        )?,
        completed_at,
    })
}

#[async_trait::async_trait]
impl ProgressRepository for SqliteRepository {
    async fn fetch_progress(&self, user_id: &str) -> Result<Vec<ProgressRecord>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT user_id, category, sub_category, instrument,
                       current_tier, highest_tier_reached,
                       total_score, questions_answered, completed_at
                FROM tier_progress
                WHERE user_id = ?1
                ORDER BY category, sub_category
            ",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        rows.iter().map(map_progress_row).collect()
    }

    async fn upsert_progress(&self, record: &ProgressRecord) -> Result<(), StorageError> {
        sqlx::query(
            r"
                INSERT INTO tier_progress (
                    user_id, category, sub_category, instrument,
                    current_tier, highest_tier_reached,
                    total_score, questions_answered, completed_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                ON CONFLICT (user_id, category, sub_category) DO UPDATE SET
                    instrument = excluded.instrument,
                    current_tier = excluded.current_tier,
                    highest_tier_reached = excluded.highest_tier_reached,
                    total_score = excluded.total_score,
                    questions_answered = excluded.questions_answered,
                    completed_at = excluded.completed_at
            ",
        )
        .bind(&record.user_id)
        .bind(&record.category)
        .bind(&record.sub_category)
        .bind(&record.instrument)
        .bind(i64::from(record.current_tier))
        .bind(i64::from(record.highest_tier_reached))
        .bind(i64::from(record.total_score))
        .bind(i64::from(record.questions_answered))
        .bind(record.completed_at.map(|dt| dt.to_rfc3339()))
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }
}
