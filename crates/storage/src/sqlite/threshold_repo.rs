use assess_core::model::{Category, PassThreshold};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{ser, u8_from_i64};
use crate::repository::{StorageError, ThresholdRepository};

impl SqliteRepository {
    /// Insert or replace a threshold row. Used by seeding and admin tooling.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the threshold cannot be stored.
    pub async fn upsert_threshold(
        &self,
        category: Category,
        sub_category: &str,
        instrument: &str,
        threshold: PassThreshold,
    ) -> Result<(), StorageError> {
        sqlx::query(
            r"
                INSERT INTO assessment_thresholds (
                    category, sub_category, instrument, pass_threshold, is_production
                )
                VALUES (?1, ?2, ?3, ?4, 1)
                ON CONFLICT (category, sub_category, instrument) DO UPDATE SET
                    pass_threshold = excluded.pass_threshold,
                    is_production = excluded.is_production
            ",
        )
        .bind(category.as_str())
        .bind(sub_category)
        .bind(instrument)
        .bind(i64::from(threshold.pass_percentage))
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }
}

#[async_trait::async_trait]
impl ThresholdRepository for SqliteRepository {
    async fn fetch_threshold(
        &self,
        category: Category,
        sub_category: &str,
        instrument: &str,
    ) -> Result<Option<PassThreshold>, StorageError> {
        let row = sqlx::query(
            r"
                SELECT pass_threshold
                FROM assessment_thresholds
                WHERE category = ?1
                  AND sub_category = ?2
                  AND instrument = ?3
                  AND is_production = 1
            ",
        )
        .bind(category.as_str())
        .bind(sub_category)
        .bind(instrument)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.map(|row| {
            let pct = u8_from_i64(
                "pass_threshold",
                row.try_get::<i64, _>("pass_threshold").map_err(ser)?,
            )?;
            Ok(PassThreshold::new(pct))
        })
        .transpose()
    }
}
